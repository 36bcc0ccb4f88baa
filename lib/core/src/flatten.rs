//! Schema flattening
//!
//! Walks an API document (OpenAPI/Swagger shaped) or a canonical data model
//! (JSON-Schema shaped, a reusable schema section, a plain object of type
//! hints, or a flat list of dotted paths) and emits every primitive leaf as a
//! [`FieldDescriptor`]. Containers are traversed, never recorded.
//!
//! Both flatteners are pure functions of their input: the same document always
//! yields the same [`FieldSet`], in the same order.

use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldSet, PrimitiveType};
use crate::normalize::infer_primitive_type;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Externally supplied type names for flat path-list models, keyed by path
pub type TypeHints = BTreeMap<String, String>;

const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const COMPOSITION_KEYWORDS: &[&str] = &["oneOf", "anyOf", "allOf"];

/// JSON-Schema keywords that describe fields rather than being fields
const METADATA_KEYWORDS: &[&str] = &[
    "$schema", "$id", "$comment", "$defs", "$anchor", "definitions",
    "title", "description", "enum", "const", "required", "examples", "example",
    "default", "format", "pattern", "minimum", "maximum", "exclusiveMinimum",
    "exclusiveMaximum", "multipleOf", "minLength", "maxLength", "minItems",
    "maxItems", "uniqueItems", "minProperties", "maxProperties",
    "additionalProperties", "patternProperties", "readOnly", "writeOnly",
    "deprecated", "nullable",
];

const SCHEMA_MARKERS: &[&str] = &["type", "properties", "items", "$ref", "oneOf", "anyOf", "allOf"];

#[inline]
fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn is_metadata_key(key: &str) -> bool {
    key.starts_with("x-") || METADATA_KEYWORDS.contains(&key)
}

/// Declared type of a schema node; `["string", "null"]` yields `string`
fn declared_type(node: &Map<String, Value>) -> Option<&str> {
    match node.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn format_of(node: &Map<String, Value>) -> Option<&str> {
    node.get("format").and_then(Value::as_str)
}

fn is_primitive_schema(node: &Map<String, Value>) -> bool {
    if node.contains_key("$ref") {
        return false;
    }
    match declared_type(node) {
        Some("string") | Some("integer") | Some("number") | Some("boolean") => true,
        Some(_) => false,
        None => {
            !node.contains_key("properties")
                && !node.contains_key("items")
                && matches!(format_of(node), Some("date") | Some("date-time"))
        }
    }
}

fn record_leaf(schema: &Map<String, Value>, path: &str, out: &mut FieldSet) {
    if path.is_empty() {
        return;
    }
    let format = format_of(schema);
    let field_type = infer_primitive_type(declared_type(schema), format);
    out.insert(FieldDescriptor::new(path, field_type, format.map(str::to_string)));
}

/// Walk one schema node, recording primitive leaves under `path`
fn walk_schema(node: &Value, path: &str, out: &mut FieldSet) {
    let Some(obj) = node.as_object() else {
        return;
    };
    // References are never resolved
    if obj.contains_key("$ref") {
        return;
    }

    let mut composed = false;
    for keyword in COMPOSITION_KEYWORDS {
        if let Some(Value::Array(members)) = obj.get(*keyword) {
            composed = true;
            for member in members.iter().filter_map(Value::as_object) {
                if is_primitive_schema(member) {
                    record_leaf(member, path, out);
                }
            }
        }
    }
    if composed {
        return;
    }

    if let Some(Value::Object(properties)) = obj.get("properties") {
        for (name, child) in properties {
            walk_schema(child, &join_path(path, name), out);
        }
        return;
    }

    match declared_type(obj) {
        Some("array") => {
            if let Some(items) = obj.get("items").and_then(Value::as_object) {
                if is_primitive_schema(items) {
                    record_leaf(items, path, out);
                }
            }
        }
        Some("object") => {}
        _ if is_primitive_schema(obj) => record_leaf(obj, path, out),
        _ => {}
    }
}

/// Reusable schema sections: `components.schemas`, `definitions`, `$defs`, `schemas`
fn named_schema_sections(root: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let sections = [
        root.get("components").and_then(|c| c.get("schemas")),
        root.get("definitions"),
        root.get("$defs"),
        root.get("schemas"),
    ];

    sections
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .flat_map(|section| section.iter().map(|(name, schema)| (name.as_str(), schema)))
        .collect()
}

fn walk_responses(operation: &Value, out: &mut FieldSet) {
    let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
        return;
    };
    for response in responses.values() {
        if let Some(content) = response.get("content").and_then(Value::as_object) {
            for media in content.values() {
                if let Some(schema) = media.get("schema") {
                    walk_schema(schema, "", out);
                }
            }
        }
        // Swagger 2 puts the body schema directly on the response
        if let Some(schema) = response.get("schema") {
            walk_schema(schema, "", out);
        }
    }
}

/// Flatten an API document into its leaf fields.
///
/// Response bodies are walked under `paths → operation → responses →
/// content → schema` with paths relative to the body root; reusable schema
/// sections are walked with the schema name as path prefix.
pub fn flatten_api_document(doc: &Value) -> Result<FieldSet> {
    let root = doc
        .as_object()
        .ok_or_else(|| Error::InvalidDocument("API document must be a JSON object".to_string()))?;

    let mut out = FieldSet::new();

    match root.get("paths") {
        None => {}
        Some(Value::Object(paths)) => {
            for item in paths.values().filter_map(Value::as_object) {
                for (method, operation) in item {
                    if HTTP_METHODS.contains(&method.to_ascii_lowercase().as_str()) {
                        walk_responses(operation, &mut out);
                    }
                }
            }
        }
        Some(_) => {
            return Err(Error::InvalidDocument(
                "'paths' must be an object keyed by route".to_string(),
            ))
        }
    }

    for (name, schema) in named_schema_sections(root) {
        walk_schema(schema, name, &mut out);
    }

    tracing::debug!(leaves = out.len(), "flattened API document");
    Ok(out)
}

fn looks_like_schema(node: &Map<String, Value>) -> bool {
    SCHEMA_MARKERS.iter().any(|k| node.contains_key(*k))
}

/// Plain objects of typed leaf hints: `{"email": "string", "age": 0, "address": {...}}`
fn walk_hints(node: &Map<String, Value>, path: &str, out: &mut FieldSet) {
    for (key, value) in node {
        if is_metadata_key(key) {
            continue;
        }
        let child = join_path(path, key);
        match value {
            Value::String(hint) => {
                let field_type = infer_primitive_type(Some(hint.as_str()), Some(hint.as_str()));
                let format = field_type.is_temporal().then(|| hint.clone());
                out.insert(FieldDescriptor::new(child, field_type, format));
            }
            Value::Bool(_) => {
                out.insert(FieldDescriptor::new(child, PrimitiveType::Boolean, None));
            }
            Value::Number(n) => {
                let field_type = if n.is_f64() {
                    PrimitiveType::Number
                } else {
                    PrimitiveType::Integer
                };
                out.insert(FieldDescriptor::new(child, field_type, None));
            }
            Value::Null => {
                out.insert(FieldDescriptor::new(child, PrimitiveType::Unknown, None));
            }
            Value::Object(inner) if looks_like_schema(inner) => walk_schema(value, &child, out),
            Value::Object(inner) => walk_hints(inner, &child, out),
            Value::Array(_) => {}
        }
    }
}

fn flatten_path_list(items: &[Value], type_hints: Option<&TypeHints>) -> Result<FieldSet> {
    let mut out = FieldSet::new();
    for (i, item) in items.iter().enumerate() {
        let path = item.as_str().map(str::trim).ok_or_else(|| {
            Error::InvalidDocument(format!("path list entry {} is not a string", i))
        })?;
        if path.is_empty() {
            continue;
        }
        let (field_type, format) = match type_hints.and_then(|h| h.get(path)) {
            Some(hint) => {
                let field_type = infer_primitive_type(Some(hint.as_str()), Some(hint.as_str()));
                (field_type, field_type.is_temporal().then(|| hint.clone()))
            }
            None => (PrimitiveType::String, None),
        };
        out.insert(FieldDescriptor::new(path, field_type, format));
    }
    Ok(out)
}

/// Flatten a canonical data model into its leaf fields.
///
/// Accepts a JSON-Schema object (`properties`), a document carrying reusable
/// schema sections, a plain object of typed leaf hints, or an array of dotted
/// path strings typed through `type_hints` (defaulting to `string`).
pub fn flatten_model_document(doc: &Value, type_hints: Option<&TypeHints>) -> Result<FieldSet> {
    let out = match doc {
        Value::Array(items) => flatten_path_list(items, type_hints)?,
        Value::Object(root) => {
            let mut out = FieldSet::new();
            if root.contains_key("properties") {
                walk_schema(doc, "", &mut out);
            } else {
                let sections = named_schema_sections(root);
                if sections.is_empty() {
                    walk_hints(root, "", &mut out);
                } else {
                    for (name, schema) in sections {
                        walk_schema(schema, name, &mut out);
                    }
                }
            }
            out
        }
        _ => {
            return Err(Error::InvalidDocument(
                "canonical model must be a JSON object or an array of paths".to_string(),
            ))
        }
    };

    tracing::debug!(leaves = out.len(), "flattened canonical model");
    Ok(out)
}
