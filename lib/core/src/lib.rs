//! # fieldrecon Core
//!
//! Core library for the fieldrecon schema reconciliation engine.
//!
//! This crate provides the building blocks the matcher works on:
//!
//! - [`FieldDescriptor`] / [`FieldSet`] - primitive leaf fields in document order
//! - [`normalize`] - field-name tokenization, core-token reduction, type inference
//! - [`distance`] - Jaro-Winkler and token Jaccard similarity
//! - [`flatten`] - API-document and canonical-model flatteners
//! - [`TtlCache`] / [`CacheSweeper`] - content-addressed memoization with expiry
//!
//! ## Example
//!
//! ```rust
//! use fieldrecon_core::{flatten_api_document, flatten_model_document, PrimitiveType};
//! use serde_json::json;
//!
//! let api = json!({
//!     "components": {"schemas": {"Customer": {
//!         "type": "object",
//!         "properties": {"birthDate": {"type": "string", "format": "date"}}
//!     }}}
//! });
//! let fields = flatten_api_document(&api).unwrap();
//! let birth = fields.get("Customer.birthDate").unwrap();
//! assert_eq!(birth.field_type, PrimitiveType::Date);
//! assert_eq!(birth.core_tokens, vec!["birth", "date"]);
//!
//! let model = flatten_model_document(&json!(["person.dob"]), None).unwrap();
//! assert_eq!(model.len(), 1);
//! ```

pub mod error;
pub mod field;
pub mod normalize;
pub mod distance;
pub mod flatten;
pub mod config;
pub mod cache;
pub mod background;

pub use error::{Error, Result};
pub use field::{FieldDescriptor, FieldSet, PrimitiveType};
pub use normalize::{
    core_tokens_of, infer_primitive_type, normalize_for_equality, reduce_to_core_tokens,
    split_tokens,
};
pub use distance::{is_token_subset, jaccard, jaro, jaro_winkler};
pub use flatten::{flatten_api_document, flatten_model_document, TypeHints};
pub use config::{CacheConfig, EngineConfig, DEFAULT_FUZZY_THRESHOLD, DEFAULT_SYSTEM_CODE};
pub use cache::{content_key, digest_key, CacheStats, TtlCache};
pub use background::{CacheSweeper, SweepJob};
