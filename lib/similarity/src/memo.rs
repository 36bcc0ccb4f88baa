//! Memoization layer
//!
//! Four content-addressed tiers sit in front of the pipeline: parsed
//! documents, flattened field sets, hint sets and full comparison results.
//! Each tier has its own time-to-live. Values are shared through `Arc`, so a
//! hit never copies a document or a report.
//!
//! Every tier is an optimization only. Dropping all of them (or racing two
//! identical requests) changes latency, never output.

use crate::hints::TokenHint;
use crate::report::ComparisonResult;
use fieldrecon_core::{
    content_key, digest_key, flatten_api_document, flatten_model_document, CacheConfig,
    CacheStats, CacheSweeper, Error, FieldSet, Result, SweepJob, TtlCache, TypeHints,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

pub struct MemoLayer {
    config: CacheConfig,
    parsed: Arc<TtlCache<Arc<Value>>>,
    flattened: Arc<TtlCache<Arc<FieldSet>>>,
    hints: Arc<TtlCache<Arc<Vec<TokenHint>>>>,
    comparisons: Arc<TtlCache<Arc<ComparisonResult>>>,
    sweeper: Mutex<Option<CacheSweeper>>,
}

impl MemoLayer {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = config.capacity;
        Self {
            parsed: Arc::new(TtlCache::new("parsed", config.parsed_ttl(), capacity)),
            flattened: Arc::new(TtlCache::new("flattened", config.flattened_ttl(), capacity)),
            hints: Arc::new(TtlCache::new("hints", config.hints_ttl(), capacity)),
            comparisons: Arc::new(TtlCache::new("comparisons", config.comparison_ttl(), capacity)),
            sweeper: Mutex::new(None),
            config,
        }
    }

    /// Start the background sweep. Calling it again is a no-op.
    pub fn init(&self) -> Result<()> {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_none() {
            *sweeper = Some(CacheSweeper::start(self.config.sweep_interval(), self.jobs())?);
        }
        Ok(())
    }

    /// Stop the background sweep, keeping cached entries
    pub fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.shutdown();
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    fn jobs(&self) -> Vec<Arc<dyn SweepJob>> {
        vec![
            self.parsed.clone() as Arc<dyn SweepJob>,
            self.flattened.clone() as Arc<dyn SweepJob>,
            self.hints.clone() as Arc<dyn SweepJob>,
            self.comparisons.clone() as Arc<dyn SweepJob>,
        ]
    }

    /// Parse raw JSON bytes, keyed by their digest
    pub fn parse_document(&self, bytes: &[u8]) -> Result<Arc<Value>> {
        let key = digest_key(bytes);
        self.parsed.get_or_try_insert_with(&key, || {
            serde_json::from_slice::<Value>(bytes)
                .map(Arc::new)
                .map_err(|e| Error::InvalidDocument(e.to_string()))
        })
    }

    pub fn flatten_api(&self, doc: &Value) -> Result<Arc<FieldSet>> {
        let key = content_key(&("api", doc))?;
        self.flattened
            .get_or_try_insert_with(&key, || flatten_api_document(doc).map(Arc::new))
    }

    pub fn flatten_model(&self, doc: &Value, type_hints: Option<&TypeHints>) -> Result<Arc<FieldSet>> {
        let key = content_key(&("model", doc, type_hints))?;
        self.flattened
            .get_or_try_insert_with(&key, || flatten_model_document(doc, type_hints).map(Arc::new))
    }

    pub fn hints(&self, key: &str) -> Option<Arc<Vec<TokenHint>>> {
        self.hints.get(key)
    }

    pub fn store_hints(&self, key: String, hints: Vec<TokenHint>) -> Arc<Vec<TokenHint>> {
        let hints = Arc::new(hints);
        self.hints.insert(key, hints.clone());
        hints
    }

    pub fn comparison(&self, key: &str) -> Option<Arc<ComparisonResult>> {
        self.comparisons.get(key)
    }

    pub fn store_comparison(&self, key: String, result: ComparisonResult) -> Arc<ComparisonResult> {
        let result = Arc::new(result);
        self.comparisons.insert(key, result.clone());
        result
    }

    pub fn stats(&self) -> Vec<CacheStats> {
        vec![
            self.parsed.stats(),
            self.flattened.stats(),
            self.hints.stats(),
            self.comparisons.stats(),
        ]
    }

    /// Purge expired entries from every tier now
    pub fn purge_expired(&self) -> usize {
        fieldrecon_core::background::run_sweep(&self.jobs())
    }

    pub fn clear(&self) {
        self.parsed.clear();
        self.flattened.clear();
        self.hints.clear();
        self.comparisons.clear();
    }
}

impl Default for MemoLayer {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl Drop for MemoLayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
