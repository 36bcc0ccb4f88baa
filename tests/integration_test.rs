// Integration tests for fieldrecon
use fieldrecon::prelude::*;
use fieldrecon::{flatten_api_document, flatten_model_document, MatchOutcome, ResultCompiler, SemanticScorer};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn api_with_schema(properties: Value) -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {"title": "Test API"},
        "components": {"schemas": {"Item": {"type": "object", "properties": properties}}}
    })
}

fn model_with(properties: Value) -> Value {
    json!({"type": "object", "properties": properties})
}

fn run(api: &Value, model: &Value) -> MatchOutcome {
    let api_fields = flatten_api_document(api).unwrap();
    let model_fields = flatten_model_document(model, None).unwrap();
    MatchEngine::default().run(&api_fields, &model_fields)
}

#[test]
fn test_exact_match_precedence() {
    let outcome = run(
        &api_with_schema(json!({"user_id": {"type": "integer"}})),
        &model_with(json!({"UserId": {"type": "integer"}})),
    );
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].kind, MatchKind::Exact);
    assert_eq!(outcome.matches[0].score, 1.0);
}

#[test]
fn test_containment_ambiguity_is_deferred() {
    let outcome = run(
        &api_with_schema(json!({"birthDate": {"type": "string", "format": "date"}})),
        &model_with(json!({
            "birth": {"type": "string"},
            "date": {"type": "string", "format": "date"}
        })),
    );
    assert!(outcome
        .matches
        .iter()
        .all(|m| m.kind != MatchKind::Containment));
}

#[test]
fn test_one_to_one_assignment() {
    let outcome = run(
        &api_with_schema(json!({
            "email": {"type": "string"},
            "emailAddress": {"type": "string"},
            "e_mail": {"type": "string"},
            "phone": {"type": "string"},
            "telephone": {"type": "string"}
        })),
        &model_with(json!({
            "email": {"type": "string"},
            "phone_number": {"type": "string"}
        })),
    );

    let mut models: Vec<&str> = outcome.matches.iter().map(|m| m.model.path.as_str()).collect();
    let mut apis: Vec<&str> = outcome.matches.iter().map(|m| m.api.path.as_str()).collect();
    let (m, a) = (models.len(), apis.len());
    models.sort();
    models.dedup();
    apis.sort();
    apis.dedup();
    assert_eq!(models.len(), m);
    assert_eq!(apis.len(), a);
    assert_eq!(outcome.matches.len() + outcome.extra.len(), 5);
}

#[test]
fn test_scorer_formula_stays_below_default_threshold() {
    let score = SemanticScorer::default().combine(0.90, 0.33, 0.08, 0.0, 0.03);
    assert_eq!((score * 1000.0).round() / 1000.0, 0.738);
    assert!(score < EngineConfig::default().fuzzy_threshold);
}

#[test]
fn test_empty_comparison_accuracy() {
    let result = ResultCompiler.compile("Empty", &MatchOutcome::default(), chrono_now());
    assert_eq!(result.accuracy_score, 100.0);
    assert!(!result.accuracy_score.is_nan());
}

#[test]
fn test_stable_ordering_across_runs() {
    let api = api_with_schema(json!({
        "zip": {"type": "string"},
        "email": {"type": "string"},
        "extraB": {"type": "boolean"},
        "extraA": {"type": "boolean"}
    }));
    let model = model_with(json!({
        "postal": {"type": "string"},
        "email": {"type": "string"},
        "missingB": {"type": "integer"},
        "missingA": {"type": "integer"}
    }));

    let first = ResultCompiler.compile("X", &run(&api, &model), chrono_now());
    let second = ResultCompiler.compile("X", &run(&api, &model), chrono_now());
    assert_eq!(first.fields, second.fields);

    let statuses: Vec<FieldStatus> = first.fields.iter().map(|r| r.status).collect();
    let mut sorted = statuses.clone();
    sorted.sort();
    assert_eq!(statuses, sorted);
    let extras: Vec<&str> = first
        .fields
        .iter()
        .filter(|r| r.status == FieldStatus::Extra)
        .map(|r| r.field_name.as_str())
        .collect();
    assert_eq!(extras, vec!["Item.extraA", "Item.extraB"]);
}

#[test]
fn test_flattening_is_pure() {
    let api = api_with_schema(json!({
        "a": {"type": "string"},
        "nested": {"type": "object", "properties": {"b": {"type": "integer"}}}
    }));
    assert_eq!(
        flatten_api_document(&api).unwrap(),
        flatten_api_document(&api).unwrap()
    );
}

#[test]
fn test_scenario_birth_date_containment() {
    let outcome = run(
        &api_with_schema(json!({"birthDate": {"type": "string", "format": "date"}})),
        &model_with(json!({"date": {"type": "string", "format": "date"}})),
    );
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].kind, MatchKind::Containment);
    assert_eq!(outcome.matches[0].score, 0.97);
}

#[test]
fn test_scenario_email_exact() {
    let outcome = run(
        &api_with_schema(json!({"email": {"type": "string"}})),
        &model_with(json!({"email": {"type": "string"}})),
    );
    assert_eq!(outcome.matches[0].kind, MatchKind::Exact);
    assert_eq!(outcome.matches[0].score, 1.0);
}

#[test]
fn test_scenario_incompatible_status_not_forced() {
    let api = api_with_schema(json!({"Status": {"type": "string"}}));
    let model = model_with(json!({"statusCode": {"type": "integer"}}));
    let result = ResultCompiler.compile("S", &run(&api, &model), chrono_now());

    assert_eq!(result.matched_fields, 0);
    assert_eq!(result.extra_fields, 1);
    assert_eq!(result.missing_fields, 1);
    assert_eq!(result.fields[0].status, FieldStatus::Extra);
    assert_eq!(result.fields[1].status, FieldStatus::Missing);
}

#[tokio::test]
async fn test_pipeline_with_repository() {
    let dir = TempDir::new().unwrap();
    let repository = ModelRepository::open(dir.path()).unwrap();
    repository
        .put(
            "person",
            json!({
                "title": "Person",
                "required": ["email"],
                "properties": {
                    "email": {"type": "string"},
                    "firstName": {"type": "string"},
                    "lastName": {"type": "string"},
                    "birthDate": {"type": "string", "format": "date"},
                    "phone": {"type": "string"}
                }
            }),
            None,
        )
        .unwrap();
    repository
        .put("ledger", json!(["ledger.amount", "ledger.currency"]), None)
        .unwrap();

    let api = json!({
        "info": {"title": "People"},
        "paths": {"/people": {"get": {"responses": {"200": {"content": {"application/json": {
            "schema": {"type": "object", "properties": {
                "email": {"type": "string"},
                "first_name": {"type": "string"},
                "last_name": {"type": "string"},
                "dob": {"type": "string", "format": "date"},
                "tel": {"type": "string"}
            }}
        }}}}}}}
    });

    let reconciler = Reconciler::new(EngineConfig::default()).unwrap();
    reconciler.init().unwrap();
    let comparison = reconciler
        .compare_with_source(&api, &repository, &CompareOptions::default())
        .await
        .unwrap();
    reconciler.shutdown();

    assert_eq!(comparison.chosen_model.as_deref(), Some("person"));
    let result = &comparison.result;
    assert_eq!(result.api_name, "People");
    assert_eq!(result.total_fields_compared, result.matched_fields + result.unmatched_fields);
    assert!(result.matched_fields >= 3);
}

#[tokio::test]
async fn test_path_list_model_with_type_hints() {
    let reconciler = Arc::new(Reconciler::new(EngineConfig::default()).unwrap());
    let api = api_with_schema(json!({
        "age": {"type": "integer"},
        "email": {"type": "string"}
    }));
    let model = json!(["person.age", "person.email"]);

    let mut hints = fieldrecon::TypeHints::new();
    hints.insert("person.age".to_string(), "integer".to_string());
    let options = CompareOptions {
        type_hints: Some(hints),
        ..CompareOptions::default()
    };

    let result = reconciler.compare(&api, &model, &options).await.unwrap();
    assert_eq!(result.matched_fields, 2);
    assert!(result
        .fields
        .iter()
        .all(|r| r.issue.is_none()));
}

fn chrono_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
