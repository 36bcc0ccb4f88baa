//! Result compiler
//!
//! Turns a [`MatchOutcome`] into the reported [`ComparisonResult`]: one row per
//! matched pair, unclaimed API field (`extra`) and unclaimed model field
//! (`missing`), the accuracy metric and a fixed row order.

use crate::matcher::{FieldMatch, MatchKind, MatchOutcome};
use crate::score::MatchReason;
use chrono::{DateTime, Utc};
use fieldrecon_core::{FieldDescriptor, PrimitiveType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Matched,
    Extra,
    Missing,
}

/// One reported field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldRow {
    pub field_name: String,
    pub status: FieldStatus,
    /// Type declared by the canonical model
    pub expected_type: Option<PrimitiveType>,
    /// Type declared by the API document
    pub actual_type: Option<PrimitiveType>,
    pub expected_format: Option<String>,
    pub actual_format: Option<String>,
    pub issue: Option<String>,
    pub suggestion: Option<String>,
    pub confidence: f64,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_to: Option<String>,
}

/// One committed match as reported
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchRecord {
    pub api_field: String,
    pub model_field: String,
    pub score: f64,
    pub kind: MatchKind,
    pub reason: MatchReason,
}

/// Final reconciliation report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub api_name: String,
    pub validation_date: DateTime<Utc>,
    pub total_fields_compared: usize,
    pub matched_fields: usize,
    pub unmatched_fields: usize,
    pub extra_fields: usize,
    pub missing_fields: usize,
    /// Percentage in [0, 100], two decimals
    pub accuracy_score: f64,
    pub fields: Vec<FieldRow>,
    pub matches: Vec<MatchRecord>,
    pub summary_recommendation: String,
}

impl ComparisonResult {
    /// A successful comparison of nothing against nothing
    pub fn empty(api_name: impl Into<String>, validated_at: DateTime<Utc>) -> Self {
        ResultCompiler.compile(api_name, &MatchOutcome::default(), validated_at)
    }

    pub fn is_empty(&self) -> bool {
        self.total_fields_compared == 0
    }
}

/// Accuracy as a two-decimal percentage; an empty comparison is fully accurate
pub fn accuracy_percent(matched: usize, extra: usize, missing: usize) -> f64 {
    let total = matched + extra + missing;
    if total == 0 {
        return 100.0;
    }
    round_to(matched as f64 / total as f64 * 100.0, 2)
}

#[inline]
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultCompiler;

impl ResultCompiler {
    pub fn compile(
        &self,
        api_name: impl Into<String>,
        outcome: &MatchOutcome,
        validated_at: DateTime<Utc>,
    ) -> ComparisonResult {
        let mut fields = Vec::with_capacity(
            outcome.matches.len() + outcome.extra.len() + outcome.missing.len(),
        );
        fields.extend(outcome.matches.iter().map(matched_row));
        fields.extend(outcome.extra.iter().map(|f| extra_row(f, outcome)));
        fields.extend(outcome.missing.iter().map(missing_row));
        sort_rows(&mut fields);

        let mut matches: Vec<MatchRecord> = outcome
            .matches
            .iter()
            .map(|m| MatchRecord {
                api_field: m.api.path.clone(),
                model_field: m.model.path.clone(),
                score: round_to(m.score, 3),
                kind: m.kind,
                reason: m.reason.clone(),
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.api_field.cmp(&b.api_field))
        });

        let matched = outcome.matches.len();
        let extra = outcome.extra.len();
        let missing = outcome.missing.len();
        let accuracy = accuracy_percent(matched, extra, missing);

        ComparisonResult {
            api_name: api_name.into(),
            validation_date: validated_at,
            total_fields_compared: matched + extra + missing,
            matched_fields: matched,
            unmatched_fields: extra + missing,
            extra_fields: extra,
            missing_fields: missing,
            accuracy_score: accuracy,
            fields,
            matches,
            summary_recommendation: summary_recommendation(accuracy, extra, missing),
        }
    }
}

/// Matched first by descending confidence, then extra, then missing;
/// names break every tie
pub fn sort_rows(rows: &mut [FieldRow]) {
    rows.sort_by(|a, b| {
        a.status.cmp(&b.status).then_with(|| {
            let by_confidence = if a.status == FieldStatus::Matched {
                b.confidence.total_cmp(&a.confidence)
            } else {
                Ordering::Equal
            };
            by_confidence.then_with(|| a.field_name.cmp(&b.field_name))
        })
    });
}

fn matched_row(m: &FieldMatch) -> FieldRow {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    if !m.reason.type_compatible {
        issues.push("Type mismatch".to_string());
        suggestions.push(format!(
            "Convert `{}` from {} to {}",
            m.api.leaf, m.api.field_type, m.model.field_type
        ));
    }
    if let (Some(actual), Some(expected)) = (&m.api.format, &m.model.format) {
        if actual != expected {
            issues.push("Format mismatch".to_string());
            suggestions.push(format!("Use format `{}` instead of `{}`", expected, actual));
        }
    }
    if m.kind != MatchKind::Exact && m.api.leaf != m.model.leaf {
        issues.push("Name differs from model".to_string());
        suggestions.push(format!("Consider renaming `{}` to `{}`", m.api.leaf, m.model.leaf));
    }

    FieldRow {
        field_name: m.api.path.clone(),
        status: FieldStatus::Matched,
        expected_type: Some(m.model.field_type),
        actual_type: Some(m.api.field_type),
        expected_format: m.model.format.clone(),
        actual_format: m.api.format.clone(),
        issue: join(issues),
        suggestion: join(suggestions),
        confidence: round_to(m.score, 3),
        rationale: format!("{} match: {}", kind_label(m.kind), m.reason.rationale()),
        mapped_to: Some(m.model.path.clone()),
    }
}

fn extra_row(field: &FieldDescriptor, outcome: &MatchOutcome) -> FieldRow {
    let near_miss = outcome.near_misses.iter().find(|r| {
        r.api_field == field.path && outcome.missing.iter().any(|m| m.path == r.model_field)
    });

    let (suggestion, rationale) = match near_miss {
        Some(reason) => {
            let mut suggestion = format!(
                "Closest model field is `{}` ({:.3}, below threshold)",
                reason.model_field, reason.final_score
            );
            if !reason.type_compatible {
                suggestion.push_str("; types are incompatible");
            }
            (suggestion, format!("no match: {}", reason.rationale()))
        }
        None => (
            "Remove the field or add it to the canonical model".to_string(),
            "no candidate model field".to_string(),
        ),
    };

    FieldRow {
        field_name: field.path.clone(),
        status: FieldStatus::Extra,
        expected_type: None,
        actual_type: Some(field.field_type),
        expected_format: None,
        actual_format: field.format.clone(),
        issue: Some("Field not present in canonical model".to_string()),
        suggestion: Some(suggestion),
        confidence: 0.0,
        rationale,
        mapped_to: None,
    }
}

fn missing_row(field: &FieldDescriptor) -> FieldRow {
    FieldRow {
        field_name: field.path.clone(),
        status: FieldStatus::Missing,
        expected_type: Some(field.field_type),
        actual_type: None,
        expected_format: field.format.clone(),
        actual_format: None,
        issue: Some("Field missing from API".to_string()),
        suggestion: Some(format!("Expose `{}` as {}", field.leaf, field.field_type)),
        confidence: 0.0,
        rationale: "no API field matched".to_string(),
        mapped_to: None,
    }
}

fn kind_label(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Exact => "exact",
        MatchKind::Containment => "containment",
        MatchKind::Fuzzy => "fuzzy",
    }
}

fn join(parts: Vec<String>) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

fn summary_recommendation(accuracy: f64, extra: usize, missing: usize) -> String {
    let verdict = if accuracy >= 90.0 {
        "The API closely follows the canonical model."
    } else if accuracy >= 70.0 {
        "The API mostly follows the canonical model; review the flagged fields."
    } else {
        "The API diverges significantly from the canonical model."
    };

    let mut text = format!("Accuracy {:.2}%. {}", accuracy, verdict);
    if missing > 0 {
        text.push_str(&format!(" Add {} missing field(s).", missing));
    }
    if extra > 0 {
        text.push_str(&format!(" Review {} field(s) not in the model.", extra));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::SemanticScorer;

    fn fd(path: &str, ty: PrimitiveType) -> FieldDescriptor {
        FieldDescriptor::new(path, ty, None)
    }

    fn fm(api: &str, model: &str, score: f64, kind: MatchKind) -> FieldMatch {
        let api = fd(api, PrimitiveType::String);
        let model = fd(model, PrimitiveType::String);
        let reason = SemanticScorer::default()
            .score_pair(&api, &model)
            .committed_as(score, "test");
        FieldMatch {
            api,
            model,
            score,
            reason,
            kind,
        }
    }

    fn date() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn statuses(result: &ComparisonResult) -> Vec<(FieldStatus, &str)> {
        result
            .fields
            .iter()
            .map(|r| (r.status, r.field_name.as_str()))
            .collect()
    }

    #[test]
    fn test_empty_comparison_is_fully_accurate() {
        let result = ComparisonResult::empty("Empty", date());
        assert_eq!(result.accuracy_score, 100.0);
        assert_eq!(result.total_fields_compared, 0);
        assert!(result.fields.is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_accuracy_percent() {
        assert_eq!(accuracy_percent(0, 0, 0), 100.0);
        assert_eq!(accuracy_percent(1, 1, 1), 33.33);
        assert_eq!(accuracy_percent(2, 0, 1), 66.67);
        assert_eq!(accuracy_percent(0, 3, 0), 0.0);
    }

    #[test]
    fn test_counts_and_ordering() {
        let outcome = MatchOutcome {
            matches: vec![
                fm("zeta", "zeta", 0.8, MatchKind::Fuzzy),
                fm("alpha", "alpha", 1.0, MatchKind::Exact),
                fm("beta", "beta", 0.8, MatchKind::Fuzzy),
            ],
            extra: vec![fd("yy", PrimitiveType::String), fd("bb", PrimitiveType::String)],
            missing: vec![fd("mm", PrimitiveType::Integer), fd("aa", PrimitiveType::Boolean)],
            near_misses: Vec::new(),
        };
        let result = ResultCompiler.compile("Orders", &outcome, date());

        assert_eq!(result.matched_fields, 3);
        assert_eq!(result.extra_fields, 2);
        assert_eq!(result.missing_fields, 2);
        assert_eq!(result.unmatched_fields, 4);
        assert_eq!(result.total_fields_compared, 7);
        assert_eq!(result.accuracy_score, 42.86);
        assert_eq!(
            statuses(&result),
            vec![
                (FieldStatus::Matched, "alpha"),
                (FieldStatus::Matched, "beta"),
                (FieldStatus::Matched, "zeta"),
                (FieldStatus::Extra, "bb"),
                (FieldStatus::Extra, "yy"),
                (FieldStatus::Missing, "aa"),
                (FieldStatus::Missing, "mm"),
            ]
        );
        assert_eq!(result.matches[0].api_field, "alpha");
    }

    #[test]
    fn test_ordering_is_independent_of_input_order() {
        let forward = MatchOutcome {
            matches: vec![fm("a", "a", 1.0, MatchKind::Exact), fm("b", "c", 0.9, MatchKind::Fuzzy)],
            extra: vec![fd("x", PrimitiveType::String), fd("y", PrimitiveType::String)],
            missing: vec![fd("p", PrimitiveType::String), fd("q", PrimitiveType::String)],
            near_misses: Vec::new(),
        };
        let mut reversed = forward.clone();
        reversed.matches.reverse();
        reversed.extra.reverse();
        reversed.missing.reverse();

        let a = ResultCompiler.compile("X", &forward, date());
        let b = ResultCompiler.compile("X", &reversed, date());
        assert_eq!(a.fields, b.fields);
        assert_eq!(a.matches, b.matches);
    }

    #[test]
    fn test_matched_row_details() {
        let outcome = MatchOutcome {
            matches: vec![fm("User.birthDate", "person.date", 0.97, MatchKind::Containment)],
            ..MatchOutcome::default()
        };
        let result = ResultCompiler.compile("Users", &outcome, date());
        let row = &result.fields[0];
        assert_eq!(row.confidence, 0.97);
        assert_eq!(row.mapped_to.as_deref(), Some("person.date"));
        assert!(row.rationale.starts_with("containment match: score 0.970"));
        assert_eq!(row.issue.as_deref(), Some("Name differs from model"));
        assert!(row.suggestion.as_deref().unwrap().contains("`date`"));
    }

    #[test]
    fn test_type_mismatch_issue() {
        let api = fd("status", PrimitiveType::String);
        let model = fd("status", PrimitiveType::Integer);
        let reason = SemanticScorer::default()
            .score_pair(&api, &model)
            .committed_as(1.0, "exact");
        let outcome = MatchOutcome {
            matches: vec![FieldMatch {
                api,
                model,
                score: 1.0,
                reason,
                kind: MatchKind::Exact,
            }],
            ..MatchOutcome::default()
        };
        let row = &ResultCompiler.compile("S", &outcome, date()).fields[0];
        assert_eq!(row.issue.as_deref(), Some("Type mismatch"));
        assert_eq!(
            row.suggestion.as_deref(),
            Some("Convert `status` from string to integer")
        );
    }

    #[test]
    fn test_extra_row_names_near_miss() {
        let api = fd("Status", PrimitiveType::String);
        let model = fd("statusCode", PrimitiveType::Integer);
        let near = SemanticScorer::default().score_pair(&api, &model);
        let outcome = MatchOutcome {
            matches: Vec::new(),
            extra: vec![api],
            missing: vec![model],
            near_misses: vec![near],
        };
        let result = ResultCompiler.compile("S", &outcome, date());
        let extra = &result.fields[0];
        assert_eq!(extra.status, FieldStatus::Extra);
        let suggestion = extra.suggestion.as_deref().unwrap();
        assert!(suggestion.contains("`statusCode`"));
        assert!(suggestion.contains("incompatible"));
        assert_eq!(result.fields[1].status, FieldStatus::Missing);
        assert_eq!(result.fields[1].expected_type, Some(PrimitiveType::Integer));
    }

    #[test]
    fn test_result_serializes_with_report_keys() {
        let result = ComparisonResult::empty("Empty", date());
        let value = serde_json::to_value(&result).unwrap();
        for key in [
            "api_name",
            "validation_date",
            "total_fields_compared",
            "matched_fields",
            "unmatched_fields",
            "extra_fields",
            "missing_fields",
            "accuracy_score",
            "fields",
            "matches",
            "summary_recommendation",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
    }
}
