//! Reconciliation pipeline
//!
//! [`Reconciler`] wires the pieces together: memoized flattening, optional
//! hint augmentation, the two-phase matcher, the result compiler and, when
//! the model has to be chosen from a store, the candidate selector.
//!
//! The only suspension points are the model-store listing and the hint
//! provider call, each awaited once per comparison.

use crate::hints::{apply_hints, HintProvider, NoopHintProvider, TokenHint};
use crate::matcher::{AssignmentStrategy, GreedyAssignment, MatchEngine};
use crate::memo::MemoLayer;
use crate::report::{ComparisonResult, ResultCompiler};
use crate::select::{CandidateScore, CanonicalModel, MatchLevel, ModelSelector};
use async_trait::async_trait;
use chrono::Utc;
use fieldrecon_core::config::validate_threshold;
use fieldrecon_core::{content_key, CacheStats, EngineConfig, FieldSet, Result, TypeHints};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Name reported when neither the caller nor the document names the API
pub const UNNAMED_API: &str = "Unnamed API";

/// Per-request options. Unset values fall back to the engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompareOptions {
    pub fuzzy_threshold: Option<f64>,
    pub ai_hints: bool,
    pub system_code: Option<String>,
    pub api_name: Option<String>,
    /// Types for flat path-list models
    pub type_hints: Option<TypeHints>,
}

/// The document store, as seen by the pipeline
#[async_trait]
pub trait ModelSource: Send + Sync {
    async fn list_models(&self) -> Result<Vec<CanonicalModel>>;
}

#[async_trait]
impl ModelSource for Vec<CanonicalModel> {
    async fn list_models(&self) -> Result<Vec<CanonicalModel>> {
        Ok(self.clone())
    }
}

/// Best result across candidate models, with the selection trail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateComparison {
    pub total_candidates: usize,
    pub candidates_considered: usize,
    pub match_level: MatchLevel,
    pub chosen_model: Option<String>,
    pub candidates: Vec<CandidateScore>,
    pub result: ComparisonResult,
}

pub struct Reconciler {
    config: EngineConfig,
    memo: MemoLayer,
    hints: Arc<dyn HintProvider>,
    strategy: Arc<dyn AssignmentStrategy>,
}

impl Reconciler {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            memo: MemoLayer::new(config.cache.clone()),
            config,
            hints: Arc::new(NoopHintProvider),
            strategy: Arc::new(GreedyAssignment),
        })
    }

    pub fn with_hint_provider(mut self, provider: Arc<dyn HintProvider>) -> Self {
        self.hints = provider;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn AssignmentStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Start background cache maintenance
    pub fn init(&self) -> Result<()> {
        self.memo.init()?;
        tracing::info!(
            fuzzy_threshold = self.config.fuzzy_threshold,
            hint_provider = self.hints.name(),
            strategy = self.strategy.name(),
            "reconciler initialized"
        );
        Ok(())
    }

    pub fn shutdown(&self) {
        self.memo.shutdown();
        tracing::info!("reconciler shut down");
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn memo(&self) -> &MemoLayer {
        &self.memo
    }

    pub fn cache_stats(&self) -> Vec<CacheStats> {
        self.memo.stats()
    }

    /// Parse raw JSON through the parsed-content tier
    pub fn parse_document(&self, bytes: &[u8]) -> Result<Arc<Value>> {
        self.memo.parse_document(bytes)
    }

    fn threshold(&self, options: &CompareOptions) -> Result<f64> {
        let threshold = options.fuzzy_threshold.unwrap_or(self.config.fuzzy_threshold);
        validate_threshold(threshold)?;
        Ok(threshold)
    }

    fn api_name(options: &CompareOptions, api_doc: &Value) -> String {
        options
            .api_name
            .clone()
            .or_else(|| {
                api_doc
                    .pointer("/info/title")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| UNNAMED_API.to_string())
    }

    /// Reconcile an API document against one canonical model
    pub async fn compare(
        &self,
        api_doc: &Value,
        model_doc: &Value,
        options: &CompareOptions,
    ) -> Result<Arc<ComparisonResult>> {
        let threshold = self.threshold(options)?;
        let key = content_key(&(
            api_doc,
            model_doc,
            options,
            threshold,
            self.strategy.name(),
            options.ai_hints.then(|| self.hints.name()),
        ))?;
        if let Some(cached) = self.memo.comparison(&key) {
            tracing::debug!(key = %key, "comparison served from cache");
            return Ok(cached);
        }

        let mut api_fields = self.memo.flatten_api(api_doc)?;
        let mut model_fields = self.memo.flatten_model(model_doc, options.type_hints.as_ref())?;

        if options.ai_hints {
            let hints = self.resolve_hints(&api_fields, &model_fields).await;
            if !hints.is_empty() {
                api_fields = Arc::new(apply_hints(&api_fields, &hints));
                model_fields = Arc::new(apply_hints(&model_fields, &hints));
            }
        }

        let engine = MatchEngine::new(threshold)?.with_strategy(self.strategy.clone());
        let outcome = engine.run(&api_fields, &model_fields);
        let result = ResultCompiler.compile(Self::api_name(options, api_doc), &outcome, Utc::now());

        tracing::debug!(
            key = %key,
            matched = result.matched_fields,
            extra = result.extra_fields,
            missing = result.missing_fields,
            accuracy = result.accuracy_score,
            "comparison complete"
        );
        Ok(self.memo.store_comparison(key, result))
    }

    /// Ask the hint provider once per field-set pair. Failures degrade to no hints.
    async fn resolve_hints(&self, api: &FieldSet, model: &FieldSet) -> Arc<Vec<TokenHint>> {
        let key = match content_key(&(self.hints.name(), api, model)) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "hint cache key unavailable");
                return Arc::new(Vec::new());
            }
        };
        if let Some(cached) = self.memo.hints(&key) {
            return cached;
        }

        match self.hints.propose_hints(api.as_slice(), model.as_slice()).await {
            Ok(hints) => {
                tracing::debug!(provider = self.hints.name(), hints = hints.len(), "hints received");
                self.memo.store_hints(key, hints)
            }
            Err(e) => {
                tracing::warn!(provider = self.hints.name(), error = %e, "hint provider failed; continuing without hints");
                Arc::new(Vec::new())
            }
        }
    }

    /// Screen `models`, reconcile against every kept candidate and keep the
    /// most accurate result
    pub async fn compare_candidates(
        &self,
        api_doc: &Value,
        models: &[CanonicalModel],
        options: &CompareOptions,
    ) -> Result<CandidateComparison> {
        self.threshold(options)?;
        let api_fields = self.memo.flatten_api(api_doc)?;

        let system_code = options
            .system_code
            .clone()
            .unwrap_or_else(|| self.config.system_code.clone());
        let selection = ModelSelector::new(system_code).select(api_doc, &api_fields, models);
        let mut scores = selection.scores;

        let mut best: Option<(usize, Arc<ComparisonResult>)> = None;
        for &i in &selection.chosen {
            let model = &models[i];
            let mut model_options = options.clone();
            if model.type_hints.is_some() {
                model_options.type_hints = model.type_hints.clone();
            }

            let result = match self.compare(api_doc, &model.document, &model_options).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(model = %model.id, error = %e, "skipping candidate model");
                    continue;
                }
            };
            scores[i].accuracy = Some(result.accuracy_score);

            let better = match &best {
                Some((_, current)) => result.accuracy_score > current.accuracy_score,
                None => true,
            };
            if better {
                best = Some((i, result));
            }
        }

        let (chosen_model, result) = match best {
            Some((i, result)) => (Some(models[i].id.clone()), (*result).clone()),
            None => (
                None,
                ComparisonResult::empty(Self::api_name(options, api_doc), Utc::now()),
            ),
        };

        tracing::info!(
            total = models.len(),
            considered = selection.chosen.len(),
            level = ?selection.level,
            chosen = chosen_model.as_deref().unwrap_or("none"),
            accuracy = result.accuracy_score,
            "candidate comparison complete"
        );

        Ok(CandidateComparison {
            total_candidates: models.len(),
            candidates_considered: selection.chosen.len(),
            match_level: selection.level,
            chosen_model,
            candidates: scores,
            result,
        })
    }

    /// Fetch candidates from `source`, then [`Self::compare_candidates`]
    pub async fn compare_with_source(
        &self,
        api_doc: &Value,
        source: &dyn ModelSource,
        options: &CompareOptions,
    ) -> Result<CandidateComparison> {
        let models = source.list_models().await?;
        self.compare_candidates(api_doc, &models, options).await
    }
}
