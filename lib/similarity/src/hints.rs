//! Token hint providers
//!
//! A hint provider proposes extra token correspondences (`tel -> phone`,
//! `fio -> first, last, name`) that augment the normalizer's built-in synonym
//! table. Hints only ever add core tokens; a provider that fails or returns
//! nothing leaves the comparison exactly as it would have been without it.

use async_trait::async_trait;
use fieldrecon_core::{split_tokens, FieldDescriptor, FieldSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One proposed correspondence: fields carrying `token` also carry `related`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHint {
    pub token: String,
    pub related: Vec<String>,
}

impl TokenHint {
    pub fn new<I, S>(token: impl Into<String>, related: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            token: token.into(),
            related: related.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Error, Debug)]
pub enum HintError {
    #[error("hint provider unavailable: {0}")]
    Unavailable(String),

    #[error("invalid hint response: {0}")]
    InvalidResponse(String),
}

/// External source of token correspondences
#[async_trait]
pub trait HintProvider: Send + Sync {
    async fn propose_hints(
        &self,
        api: &[FieldDescriptor],
        model: &[FieldDescriptor],
    ) -> Result<Vec<TokenHint>, HintError>;

    fn name(&self) -> &str;
}

/// Provider that never proposes anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHintProvider;

#[async_trait]
impl HintProvider for NoopHintProvider {
    async fn propose_hints(
        &self,
        _api: &[FieldDescriptor],
        _model: &[FieldDescriptor],
    ) -> Result<Vec<TokenHint>, HintError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Provider backed by a fixed table, e.g. loaded from a config file
#[derive(Debug, Clone, Default)]
pub struct StaticHintProvider {
    hints: Vec<TokenHint>,
}

impl StaticHintProvider {
    pub fn new(hints: Vec<TokenHint>) -> Self {
        Self { hints }
    }
}

#[async_trait]
impl HintProvider for StaticHintProvider {
    async fn propose_hints(
        &self,
        api: &[FieldDescriptor],
        model: &[FieldDescriptor],
    ) -> Result<Vec<TokenHint>, HintError> {
        // Only hints relevant to the fields at hand
        let relevant = self
            .hints
            .iter()
            .filter(|hint| {
                api.iter()
                    .chain(model.iter())
                    .any(|f| carries_token(f, &hint.token))
            })
            .cloned()
            .collect();
        Ok(relevant)
    }

    fn name(&self) -> &str {
        "static"
    }
}

fn carries_token(field: &FieldDescriptor, token: &str) -> bool {
    field.core_tokens.iter().any(|t| t == token)
        || split_tokens(&field.leaf).iter().any(|t| t == token)
}

/// Extend the core tokens of every field carrying a hinted token
pub fn apply_hints(fields: &FieldSet, hints: &[TokenHint]) -> FieldSet {
    if hints.is_empty() {
        return fields.clone();
    }

    fields
        .iter()
        .map(|field| {
            let mut field = field.clone();
            for hint in hints {
                let token = hint.token.to_lowercase();
                if carries_token(&field, &token) {
                    field.extend_tokens(hint.related.iter().map(|t| t.to_lowercase()));
                }
            }
            field
        })
        .collect()
}
