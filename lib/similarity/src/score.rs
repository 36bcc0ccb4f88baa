//! Semantic scorer
//!
//! Scores one API field against one model field. The score is a weighted
//! blend of name similarity and core-token overlap, nudged by small type,
//! date and synonym adjustments, and clamped to [0.0, 1.0]. Every component
//! is kept in a [`MatchReason`] so the decision can be explained later.

use fieldrecon_core::{jaccard, jaro_winkler, FieldDescriptor};
use serde::{Deserialize, Serialize};

/// Tokens marking a field as temporal
const DATE_TOKENS: &[&str] = &["date", "datetime", "time", "timestamp"];

/// Weights and adjustments of the scoring formula
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeights {
    /// Weight of Jaro-Winkler similarity between leaf names
    pub name: f64,
    /// Weight of core-token Jaccard similarity
    pub tokens: f64,
    /// Added when the two types are compatible
    pub type_bonus: f64,
    /// Added when the two types are incompatible (negative)
    pub type_penalty: f64,
    /// Added when both sides look temporal
    pub date_bias: f64,
    /// Added on partial (neither empty nor total) token overlap
    pub synonym_bonus: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            name: 0.58,
            tokens: 0.32,
            type_bonus: 0.08,
            type_penalty: -0.25,
            date_bias: 0.07,
            synonym_bonus: 0.03,
        }
    }
}

/// Audit trail for one evaluated pairing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchReason {
    pub api_field: String,
    pub model_field: String,
    pub jw_name: f64,
    pub token_jaccard: f64,
    pub type_bonus: f64,
    pub date_bias: f64,
    pub synonym_bonus: f64,
    pub final_score: f64,
    pub type_compatible: bool,
    pub notes: Vec<String>,
}

impl MatchReason {
    /// Pin the final score of a pairing committed without fuzzy scoring
    pub fn committed_as(mut self, score: f64, note: impl Into<String>) -> Self {
        self.final_score = score;
        self.notes.insert(0, note.into());
        self
    }

    /// Human-readable restatement of the score components
    pub fn rationale(&self) -> String {
        let mut text = format!(
            "score {:.3} (name {:.3}, tokens {:.3}, type {:+.2}, date {:+.2}, synonym {:+.2})",
            self.final_score,
            self.jw_name,
            self.token_jaccard,
            self.type_bonus,
            self.date_bias,
            self.synonym_bonus,
        );
        if !self.notes.is_empty() {
            text.push_str("; ");
            text.push_str(&self.notes.join("; "));
        }
        text
    }
}

#[inline]
pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Whether a field looks like a date by type, format or tokens
pub fn is_date_like(field: &FieldDescriptor) -> bool {
    field.field_type.is_temporal()
        || matches!(field.format.as_deref(), Some("date") | Some("date-time"))
        || field
            .core_tokens
            .iter()
            .any(|t| DATE_TOKENS.contains(&t.as_str()))
}

/// Multi-factor field-pair scorer
#[derive(Debug, Clone, Default)]
pub struct SemanticScorer {
    weights: ScoreWeights,
}

impl SemanticScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Blend the components into a clamped final score
    pub fn combine(
        &self,
        jw_name: f64,
        token_jaccard: f64,
        type_bonus: f64,
        date_bias: f64,
        synonym_bonus: f64,
    ) -> f64 {
        clamp01(
            self.weights.name * jw_name
                + self.weights.tokens * token_jaccard
                + type_bonus
                + date_bias
                + synonym_bonus,
        )
    }

    pub fn score_pair(&self, api: &FieldDescriptor, model: &FieldDescriptor) -> MatchReason {
        let mut notes = Vec::new();

        let jw_name = jaro_winkler(&api.leaf.to_lowercase(), &model.leaf.to_lowercase());
        let token_jaccard = jaccard(&api.core_tokens, &model.core_tokens);

        let type_compatible = api.field_type.is_compatible_with(model.field_type);
        let type_bonus = if type_compatible {
            if api.field_type != model.field_type {
                notes.push(format!(
                    "types compatible ({} ~ {})",
                    api.field_type, model.field_type
                ));
            }
            self.weights.type_bonus
        } else {
            notes.push(format!(
                "type mismatch ({} vs {})",
                api.field_type, model.field_type
            ));
            self.weights.type_penalty
        };

        let date_bias = if is_date_like(api) && is_date_like(model) {
            notes.push("both fields are date-like".to_string());
            self.weights.date_bias
        } else {
            0.0
        };

        let synonym_bonus = if token_jaccard > 0.0 && token_jaccard < 1.0 {
            notes.push("partial core-token overlap".to_string());
            self.weights.synonym_bonus
        } else {
            0.0
        };

        let final_score = self.combine(jw_name, token_jaccard, type_bonus, date_bias, synonym_bonus);

        MatchReason {
            api_field: api.path.clone(),
            model_field: model.path.clone(),
            jw_name,
            token_jaccard,
            type_bonus,
            date_bias,
            synonym_bonus,
            final_score,
            type_compatible,
            notes,
        }
    }
}
