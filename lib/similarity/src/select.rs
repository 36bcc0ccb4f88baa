//! Candidate-model selection
//!
//! A cheap token-overlap screen run before the matcher when the canonical
//! model has to be picked from a store. Each candidate is classified by how
//! many tokens it shares with the API document; the strongest non-empty level
//! wins, falling back to title/description substrings and finally to every
//! stored model.

use fieldrecon_core::{core_tokens_of, flatten_model_document, jaccard, FieldSet, TypeHints};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Vendor extension carrying per-system field-name mappings
pub const MAPPING_KEY: &str = "x-field-mapping";

const HIGH_HITS: usize = 5;
const HIGH_JACCARD: f64 = 0.20;
const MEDIUM_HITS: usize = 3;
const MEDIUM_JACCARD: f64 = 0.14;

/// A stored canonical data model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalModel {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub document: Value,
    /// Types for flat path-list documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hints: Option<TypeHints>,
}

impl CanonicalModel {
    /// Build a model, taking title and description from the document itself
    pub fn from_document(id: impl Into<String>, document: Value) -> Self {
        let title = document
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let description = document
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            id: id.into(),
            title,
            description,
            document,
            type_hints: None,
        }
    }

    pub fn with_type_hints(mut self, type_hints: TypeHints) -> Self {
        self.type_hints = Some(type_hints);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchLevel {
    High,
    Medium,
    Substring,
    Fallback,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateScore {
    pub id: String,
    pub title: String,
    pub hits: usize,
    pub jaccard: f64,
    pub level: MatchLevel,
    /// Filled in once the matcher has run against this candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// Outcome of the screen: the stage that decided and the kept candidates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Selection {
    pub level: MatchLevel,
    pub scores: Vec<CandidateScore>,
    /// Indexes into the candidate list, in store order
    pub chosen: Vec<usize>,
}

pub fn classify(hits: usize, jaccard: f64) -> MatchLevel {
    if hits >= HIGH_HITS || jaccard >= HIGH_JACCARD {
        MatchLevel::High
    } else if hits >= MEDIUM_HITS || jaccard >= MEDIUM_JACCARD {
        MatchLevel::Medium
    } else {
        MatchLevel::None
    }
}

fn extend_bag(bag: &mut Vec<String>, tokens: impl IntoIterator<Item = String>) {
    for token in tokens {
        if !bag.contains(&token) {
            bag.push(token);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    system_code: String,
}

impl ModelSelector {
    pub fn new(system_code: impl Into<String>) -> Self {
        Self {
            system_code: system_code.into(),
        }
    }

    pub fn system_code(&self) -> &str {
        &self.system_code
    }

    /// Title, tags, schema-section names and every leaf's core tokens
    pub fn api_token_bag(&self, doc: &Value, fields: &FieldSet) -> Vec<String> {
        let mut bag = Vec::new();

        if let Some(title) = doc.pointer("/info/title").and_then(Value::as_str) {
            extend_bag(&mut bag, core_tokens_of(title));
        }
        if let Some(tags) = doc.get("tags").and_then(Value::as_array) {
            for tag in tags {
                for key in ["name", "description"] {
                    if let Some(text) = tag.get(key).and_then(Value::as_str) {
                        extend_bag(&mut bag, core_tokens_of(text));
                    }
                }
            }
        }
        for section in [
            doc.pointer("/components/schemas"),
            doc.get("definitions"),
            doc.get("$defs"),
            doc.get("schemas"),
        ]
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        {
            for name in section.keys() {
                extend_bag(&mut bag, core_tokens_of(name));
            }
        }
        for field in fields {
            extend_bag(&mut bag, field.core_tokens.iter().cloned());
        }

        bag
    }

    /// Tokens of the model's mapped names for this system, or of its own
    /// leaves when it carries no mapping
    pub fn model_token_bag(&self, model: &CanonicalModel) -> Vec<String> {
        let mut bag = Vec::new();

        let mapped = model
            .document
            .get(MAPPING_KEY)
            .and_then(|m| m.get(&self.system_code));
        if let Some(mapped) = mapped {
            let mut names = Vec::new();
            collect_mapped_names(mapped, &mut names);
            for name in names {
                for part in name.split(',') {
                    extend_bag(&mut bag, core_tokens_of(part));
                }
            }
            return bag;
        }

        match flatten_model_document(&model.document, model.type_hints.as_ref()) {
            Ok(fields) => {
                for field in &fields {
                    extend_bag(&mut bag, field.core_tokens.iter().cloned());
                }
            }
            Err(e) => {
                tracing::debug!(model = %model.id, error = %e, "model not flattenable for selection");
            }
        }
        bag
    }

    pub fn score(&self, api_bag: &[String], model: &CanonicalModel) -> CandidateScore {
        let model_bag = self.model_token_bag(model);
        let hits = api_bag.iter().filter(|t| model_bag.contains(*t)).count();
        let jaccard = jaccard(api_bag, &model_bag);
        CandidateScore {
            id: model.id.clone(),
            title: model.title.clone(),
            hits,
            jaccard,
            level: classify(hits, jaccard),
            accuracy: None,
        }
    }

    /// Screen `models` against an API document
    pub fn select(&self, api_doc: &Value, api_fields: &FieldSet, models: &[CanonicalModel]) -> Selection {
        if models.is_empty() {
            return Selection {
                level: MatchLevel::None,
                scores: Vec::new(),
                chosen: Vec::new(),
            };
        }

        let api_bag = self.api_token_bag(api_doc, api_fields);
        let scores: Vec<CandidateScore> = models.iter().map(|m| self.score(&api_bag, m)).collect();

        let at_level = |level: MatchLevel| -> Vec<usize> {
            scores
                .iter()
                .enumerate()
                .filter(|(_, s)| s.level == level)
                .map(|(i, _)| i)
                .collect()
        };

        let (level, chosen) = {
            let high = at_level(MatchLevel::High);
            if !high.is_empty() {
                (MatchLevel::High, high)
            } else {
                let medium = at_level(MatchLevel::Medium);
                if !medium.is_empty() {
                    (MatchLevel::Medium, medium)
                } else {
                    let substring = substring_candidates(api_doc, models);
                    if !substring.is_empty() {
                        (MatchLevel::Substring, substring)
                    } else {
                        (MatchLevel::Fallback, (0..models.len()).collect())
                    }
                }
            }
        };

        tracing::info!(
            candidates = models.len(),
            kept = chosen.len(),
            level = ?level,
            system_code = %self.system_code,
            "candidate models selected"
        );

        Selection {
            level,
            scores,
            chosen,
        }
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(fieldrecon_core::DEFAULT_SYSTEM_CODE)
    }
}

fn collect_mapped_names(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_mapped_names(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_mapped_names(v, out)),
        _ => {}
    }
}

fn substring_candidates(api_doc: &Value, models: &[CanonicalModel]) -> Vec<usize> {
    let haystack = api_doc.to_string().to_lowercase();
    models
        .iter()
        .enumerate()
        .filter(|(_, m)| {
            let title = m.title.trim().to_lowercase();
            let description = m
                .description
                .as_deref()
                .map(|d| d.trim().to_lowercase())
                .unwrap_or_default();
            (!title.is_empty() && haystack.contains(&title))
                || (!description.is_empty() && haystack.contains(&description))
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldrecon_core::flatten_api_document;
    use serde_json::json;

    fn api_doc() -> Value {
        json!({
            "info": {"title": "Customer Registry"},
            "tags": [{"name": "customers", "description": "Customer records"}],
            "components": {"schemas": {"Customer": {
                "type": "object",
                "properties": {
                    "firstName": {"type": "string"},
                    "lastName": {"type": "string"},
                    "birthDate": {"type": "string", "format": "date"},
                    "email": {"type": "string"},
                    "phone": {"type": "string"}
                }
            }}}
        })
    }

    fn select(models: &[CanonicalModel]) -> Selection {
        let doc = api_doc();
        let fields = flatten_api_document(&doc).unwrap();
        ModelSelector::default().select(&doc, &fields, models)
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(5, 0.0), MatchLevel::High);
        assert_eq!(classify(0, 0.20), MatchLevel::High);
        assert_eq!(classify(3, 0.0), MatchLevel::Medium);
        assert_eq!(classify(0, 0.14), MatchLevel::Medium);
        assert_eq!(classify(2, 0.13), MatchLevel::None);
    }

    #[test]
    fn test_mapping_annotation_drives_model_bag() {
        let model = CanonicalModel::from_document(
            "m1",
            json!({
                "title": "Person",
                "x-field-mapping": {
                    "default": ["first_name,last_name", "birth_date"],
                    "crm": "contact_email"
                },
                "properties": {"unrelated": {"type": "string"}}
            }),
        );
        let bag = ModelSelector::default().model_token_bag(&model);
        assert_eq!(bag, vec!["first", "last", "birth", "date"]);

        let crm = ModelSelector::new("crm").model_token_bag(&model);
        assert_eq!(crm, vec!["contact", "email"]);
    }

    #[test]
    fn test_model_without_mapping_uses_leaves() {
        let model = CanonicalModel::from_document(
            "m1",
            json!({"properties": {"email": {"type": "string"}, "phone_number": {"type": "string"}}}),
        );
        let bag = ModelSelector::default().model_token_bag(&model);
        assert_eq!(bag, vec!["email", "phone", "number"]);
    }

    #[test]
    fn test_high_candidates_win() {
        let person = CanonicalModel::from_document(
            "person",
            json!({"properties": {
                "first_name": {"type": "string"},
                "last_name": {"type": "string"},
                "birth_date": {"type": "string", "format": "date"},
                "email": {"type": "string"},
                "phone": {"type": "string"}
            }}),
        );
        let invoice = CanonicalModel::from_document(
            "invoice",
            json!({"properties": {"amount": {"type": "number"}, "currency": {"type": "string"}}}),
        );
        let selection = select(&[invoice, person]);
        assert_eq!(selection.level, MatchLevel::High);
        assert_eq!(selection.chosen, vec![1]);
        assert_eq!(selection.scores[0].level, MatchLevel::None);
    }

    #[test]
    fn test_substring_fallback() {
        let model = CanonicalModel::from_document(
            "registry",
            json!({"title": "Customer Registry", "properties": {"amount": {"type": "number"}}}),
        );
        let other = CanonicalModel::from_document(
            "other",
            json!({"title": "Ledger", "properties": {"amount": {"type": "number"}}}),
        );
        let selection = select(&[model, other]);
        assert_eq!(selection.level, MatchLevel::Substring);
        assert_eq!(selection.chosen, vec![0]);
    }

    #[test]
    fn test_last_resort_keeps_everything() {
        let a = CanonicalModel::from_document("a", json!({"properties": {"amount": {"type": "number"}}}));
        let b = CanonicalModel::from_document("b", json!(["ledger.currency"]));
        let selection = select(&[a, b]);
        assert_eq!(selection.level, MatchLevel::Fallback);
        assert_eq!(selection.chosen, vec![0, 1]);
    }

    #[test]
    fn test_empty_store() {
        let selection = select(&[]);
        assert_eq!(selection.level, MatchLevel::None);
        assert!(selection.chosen.is_empty());
    }
}
