//! # fieldrecon Similarity
//!
//! The matching side of the fieldrecon schema reconciliation engine.
//!
//! This crate takes the leaf fields produced by `fieldrecon-core` and decides
//! which API field corresponds to which canonical-model field, with an
//! explainable score for every decision.
//!
//! ## Features
//!
//! - **Semantic Scorer**: name similarity, token overlap and small type/date/synonym nudges
//! - **Two-Phase Matching**: exact and containment matches first, then threshold-gated fuzzy matches
//! - **Result Compiler**: matched/extra/missing rows, accuracy and a stable row order
//! - **Candidate Selection**: cheap token screen when the model comes from a store
//! - **Memoization**: content-addressed TTL tiers in front of the whole pipeline
//!
//! ## Example
//!
//! ```rust
//! use fieldrecon_core::{flatten_api_document, flatten_model_document};
//! use fieldrecon_similarity::{MatchEngine, MatchKind, ResultCompiler};
//! use serde_json::json;
//!
//! let api = json!({"components": {"schemas": {"User": {
//!     "type": "object",
//!     "properties": {
//!         "user_id": {"type": "integer"},
//!         "birthDate": {"type": "string", "format": "date"}
//!     }
//! }}}});
//! let model = json!({"properties": {
//!     "UserId": {"type": "integer"},
//!     "date": {"type": "string", "format": "date"}
//! }});
//!
//! let api_fields = flatten_api_document(&api).unwrap();
//! let model_fields = flatten_model_document(&model, None).unwrap();
//! let outcome = MatchEngine::default().run(&api_fields, &model_fields);
//! assert_eq!(outcome.matches[0].kind, MatchKind::Exact);
//! assert_eq!(outcome.matches[1].kind, MatchKind::Containment);
//!
//! let report = ResultCompiler.compile("Users", &outcome, chrono::Utc::now());
//! assert_eq!(report.accuracy_score, 100.0);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Selector   │────>│   Memo      │────>│ Flatteners  │
//! │ (candidates)│     │  (tiers)    │     │  (core)     │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │  Compiler   │<────│  Matcher    │
//!                     │  (report)   │     │ (+ scorer)  │
//!                     └─────────────┘     └─────────────┘
//! ```

pub mod score;
pub mod matcher;
pub mod report;
pub mod hints;
pub mod memo;
pub mod select;
pub mod pipeline;

// Re-export main types for convenience
pub use score::{MatchReason, ScoreWeights, SemanticScorer};
pub use matcher::{
    AssignmentStrategy, Claims, FieldMatch, GreedyAssignment, MatchEngine, MatchKind,
    MatchOutcome, CONTAINMENT_SCORE, EXACT_SCORE,
};
pub use report::{accuracy_percent, ComparisonResult, FieldRow, FieldStatus, MatchRecord, ResultCompiler};
pub use hints::{apply_hints, HintError, HintProvider, NoopHintProvider, StaticHintProvider, TokenHint};
pub use memo::MemoLayer;
pub use select::{CandidateScore, CanonicalModel, MatchLevel, ModelSelector, Selection, MAPPING_KEY};
pub use pipeline::{CandidateComparison, CompareOptions, ModelSource, Reconciler, UNNAMED_API};
