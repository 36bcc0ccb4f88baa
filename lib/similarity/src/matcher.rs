//! Two-phase field matching
//!
//! Phase one is deterministic: exact matches on the normalized leaf name,
//! then unambiguous core-token containment. Phase two scores every remaining
//! pair and commits the best candidate per API field when it clears the fuzzy
//! threshold with compatible types.
//!
//! Every committed match removes both fields from further consideration, so
//! the result is a 1:1 assignment built greedily in emission order.

use crate::score::{MatchReason, SemanticScorer};
use fieldrecon_core::config::validate_threshold;
use fieldrecon_core::{is_token_subset, FieldDescriptor, FieldSet, Result, DEFAULT_FUZZY_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Score committed for an exact normalized-name match
pub const EXACT_SCORE: f64 = 1.0;
/// Score committed for a containment match
pub const CONTAINMENT_SCORE: f64 = 0.97;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Containment,
    Fuzzy,
}

/// A committed pairing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldMatch {
    pub api: FieldDescriptor,
    pub model: FieldDescriptor,
    pub score: f64,
    pub reason: MatchReason,
    pub kind: MatchKind,
}

/// Claimed flags for both sides of one run
#[derive(Debug, Clone)]
pub struct Claims {
    api: Vec<bool>,
    model: Vec<bool>,
}

impl Claims {
    pub fn new(api_len: usize, model_len: usize) -> Self {
        Self {
            api: vec![false; api_len],
            model: vec![false; model_len],
        }
    }

    #[inline]
    pub fn api_claimed(&self, i: usize) -> bool {
        self.api[i]
    }

    #[inline]
    pub fn model_claimed(&self, j: usize) -> bool {
        self.model[j]
    }

    pub fn claim(&mut self, i: usize, j: usize) {
        debug_assert!(!self.api[i] && !self.model[j], "field claimed twice");
        self.api[i] = true;
        self.model[j] = true;
    }
}

/// Output of a matching run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MatchOutcome {
    pub matches: Vec<FieldMatch>,
    /// API fields left unclaimed
    pub extra: Vec<FieldDescriptor>,
    /// Model fields left unclaimed
    pub missing: Vec<FieldDescriptor>,
    /// Best rejected phase-two candidate per unclaimed API field
    pub near_misses: Vec<MatchReason>,
}

/// Phase-two assignment policy
///
/// Implementations must only claim unclaimed fields and must claim each field
/// at most once.
pub trait AssignmentStrategy: Send + Sync {
    fn assign(
        &self,
        api: &[FieldDescriptor],
        model: &[FieldDescriptor],
        claims: &mut Claims,
        scorer: &SemanticScorer,
        threshold: f64,
    ) -> (Vec<FieldMatch>, Vec<MatchReason>);

    fn name(&self) -> &'static str;
}

/// First-seen maximum per API field, in API emission order
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyAssignment;

impl AssignmentStrategy for GreedyAssignment {
    fn assign(
        &self,
        api: &[FieldDescriptor],
        model: &[FieldDescriptor],
        claims: &mut Claims,
        scorer: &SemanticScorer,
        threshold: f64,
    ) -> (Vec<FieldMatch>, Vec<MatchReason>) {
        let mut matches = Vec::new();
        let mut near_misses = Vec::new();

        for (i, api_field) in api.iter().enumerate() {
            if claims.api_claimed(i) {
                continue;
            }

            let mut best: Option<(usize, MatchReason)> = None;
            for (j, model_field) in model.iter().enumerate() {
                if claims.model_claimed(j) {
                    continue;
                }
                let reason = scorer.score_pair(api_field, model_field);
                let better = match &best {
                    Some((_, current)) => reason.final_score > current.final_score,
                    None => true,
                };
                if better {
                    best = Some((j, reason));
                }
            }

            let Some((j, reason)) = best else {
                continue;
            };
            if reason.final_score >= threshold && reason.type_compatible {
                claims.claim(i, j);
                matches.push(FieldMatch {
                    api: api_field.clone(),
                    model: model[j].clone(),
                    score: reason.final_score,
                    reason,
                    kind: MatchKind::Fuzzy,
                });
            } else {
                near_misses.push(reason);
            }
        }

        (matches, near_misses)
    }

    fn name(&self) -> &'static str {
        "greedy"
    }
}

/// Two-phase matching engine
#[derive(Clone)]
pub struct MatchEngine {
    scorer: SemanticScorer,
    threshold: f64,
    strategy: Arc<dyn AssignmentStrategy>,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self {
            scorer: SemanticScorer::default(),
            threshold: DEFAULT_FUZZY_THRESHOLD,
            strategy: Arc::new(GreedyAssignment),
        }
    }
}

impl MatchEngine {
    /// Create an engine with the given fuzzy threshold (must lie in [0, 1])
    pub fn new(threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            threshold,
            ..Self::default()
        })
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn AssignmentStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_scorer(mut self, scorer: SemanticScorer) -> Self {
        self.scorer = scorer;
        self
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn scorer(&self) -> &SemanticScorer {
        &self.scorer
    }

    /// Match API fields against model fields
    pub fn run(&self, api: &FieldSet, model: &FieldSet) -> MatchOutcome {
        let api = api.as_slice();
        let model = model.as_slice();
        let mut claims = Claims::new(api.len(), model.len());

        let mut matches = self.exact_phase(api, model, &mut claims);
        let exact = matches.len();
        matches.extend(self.containment_phase(api, model, &mut claims));
        let containment = matches.len() - exact;

        let (fuzzy, near_misses) =
            self.strategy
                .assign(api, model, &mut claims, &self.scorer, self.threshold);
        let fuzzy_count = fuzzy.len();
        matches.extend(fuzzy);

        let extra: Vec<FieldDescriptor> = api
            .iter()
            .enumerate()
            .filter(|(i, _)| !claims.api_claimed(*i))
            .map(|(_, f)| f.clone())
            .collect();
        let missing: Vec<FieldDescriptor> = model
            .iter()
            .enumerate()
            .filter(|(j, _)| !claims.model_claimed(*j))
            .map(|(_, f)| f.clone())
            .collect();

        tracing::debug!(
            api_fields = api.len(),
            model_fields = model.len(),
            exact,
            containment,
            fuzzy = fuzzy_count,
            extra = extra.len(),
            missing = missing.len(),
            strategy = self.strategy.name(),
            "matching run complete"
        );

        MatchOutcome {
            matches,
            extra,
            missing,
            near_misses,
        }
    }

    /// First unclaimed model field with an equal normalized name, per API field
    fn exact_phase(
        &self,
        api: &[FieldDescriptor],
        model: &[FieldDescriptor],
        claims: &mut Claims,
    ) -> Vec<FieldMatch> {
        let mut matches = Vec::new();
        for (i, api_field) in api.iter().enumerate() {
            let found = model
                .iter()
                .enumerate()
                .find(|(j, m)| !claims.model_claimed(*j) && m.norm == api_field.norm)
                .map(|(j, _)| j);
            if let Some(j) = found {
                claims.claim(i, j);
                let reason = self
                    .scorer
                    .score_pair(api_field, &model[j])
                    .committed_as(EXACT_SCORE, "exact match on normalized name");
                matches.push(FieldMatch {
                    api: api_field.clone(),
                    model: model[j].clone(),
                    score: EXACT_SCORE,
                    reason,
                    kind: MatchKind::Exact,
                });
            }
        }
        matches
    }

    /// Commit a model field whose core tokens are all contained in the API
    /// field's tokens, but only when exactly one such field exists
    fn containment_phase(
        &self,
        api: &[FieldDescriptor],
        model: &[FieldDescriptor],
        claims: &mut Claims,
    ) -> Vec<FieldMatch> {
        let mut matches = Vec::new();
        for (i, api_field) in api.iter().enumerate() {
            if claims.api_claimed(i) || api_field.core_tokens.is_empty() {
                continue;
            }

            let mut candidates = model.iter().enumerate().filter(|(j, m)| {
                !claims.model_claimed(*j)
                    && !m.core_tokens.is_empty()
                    && api_field.field_type.is_compatible_with(m.field_type)
                    && is_token_subset(&m.core_tokens, &api_field.core_tokens)
            });

            let (Some((j, _)), None) = (candidates.next(), candidates.next()) else {
                continue;
            };

            claims.claim(i, j);
            let reason = self
                .scorer
                .score_pair(api_field, &model[j])
                .committed_as(CONTAINMENT_SCORE, "model tokens contained in API tokens");
            matches.push(FieldMatch {
                api: api_field.clone(),
                model: model[j].clone(),
                score: CONTAINMENT_SCORE,
                reason,
                kind: MatchKind::Containment,
            });
        }
        matches
    }
}
