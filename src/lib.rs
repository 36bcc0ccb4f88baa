//! # fieldrecon
//!
//! A schema reconciliation engine: match the fields an API exposes against a
//! canonical data model and explain every decision.
//!
//! fieldrecon flattens both documents into primitive leaf fields, matches them
//! in two phases (exact and containment first, threshold-gated fuzzy scoring
//! second) and reports matched, extra and missing fields with an accuracy
//! score.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! cargo install fieldrecon
//! fieldrecon serve --port 8080 --data-dir ./data
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use fieldrecon::prelude::*;
//! use serde_json::json;
//!
//! # async fn run() -> Result<()> {
//! let reconciler = Reconciler::new(EngineConfig::default())?;
//! reconciler.init()?;
//!
//! let api = json!({"components": {"schemas": {"Person": {
//!     "type": "object",
//!     "properties": {"dob": {"type": "string", "format": "date"}}
//! }}}});
//! let model = json!({"properties": {"birthDate": {"type": "string", "format": "date"}}});
//!
//! let result = reconciler.compare(&api, &model, &CompareOptions::default()).await?;
//! println!("{}% accurate", result.accuracy_score);
//!
//! reconciler.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! fieldrecon is composed of several crates:
//!
//! - [`fieldrecon-core`](https://docs.rs/fieldrecon-core) - Field descriptors, normalizer, flatteners, TTL cache
//! - [`fieldrecon-similarity`](https://docs.rs/fieldrecon-similarity) - Scorer, matcher, result compiler, selector, pipeline
//! - [`fieldrecon-storage`](https://docs.rs/fieldrecon-storage) - Canonical model repository
//! - [`fieldrecon-api`](https://docs.rs/fieldrecon-api) - REST API

// Re-export core types
pub use fieldrecon_core::{
    flatten_api_document, flatten_model_document,
    FieldDescriptor, FieldSet, PrimitiveType, TypeHints,
    EngineConfig, CacheConfig, CacheStats,
    Error, Result,
};

// Re-export the matching pipeline
pub use fieldrecon_similarity::{
    SemanticScorer, MatchReason,
    MatchEngine, MatchKind, MatchOutcome, FieldMatch, AssignmentStrategy, GreedyAssignment,
    ComparisonResult, FieldRow, FieldStatus, ResultCompiler,
    CanonicalModel, ModelSelector, MatchLevel,
    HintProvider, TokenHint,
    Reconciler, CompareOptions, CandidateComparison, ModelSource,
};

// Re-export storage
pub use fieldrecon_storage::ModelRepository;

// Re-export API
pub use fieldrecon_api::{AppState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        FieldDescriptor, FieldSet, PrimitiveType,
        EngineConfig, Error, Result,
        MatchEngine, MatchKind, ComparisonResult, FieldStatus,
        CanonicalModel, Reconciler, CompareOptions, CandidateComparison, ModelSource,
        ModelRepository,
    };
}

/// Name normalization and string similarity
pub mod text {
    pub use fieldrecon_core::{
        core_tokens_of, jaccard, jaro_winkler, normalize_for_equality, reduce_to_core_tokens,
        split_tokens,
    };
}
