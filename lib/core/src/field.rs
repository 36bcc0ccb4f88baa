//! Field descriptors
//!
//! A [`FieldDescriptor`] is one primitive leaf found in a document. Both
//! flatteners emit them into a [`FieldSet`], which keeps emission order
//! (document order) and indexes descriptors by path.

use crate::normalize::{normalize_for_equality, reduce_to_core_tokens, split_tokens};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive type of a leaf field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
    Date,
    Datetime,
    Unknown,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Date => "date",
            PrimitiveType::Datetime => "datetime",
            PrimitiveType::Unknown => "unknown",
        }
    }

    #[inline]
    pub fn is_temporal(&self) -> bool {
        matches!(self, PrimitiveType::Date | PrimitiveType::Datetime)
    }

    /// Whether two types may be paired.
    ///
    /// `unknown` never blocks a pairing, integers and numbers are
    /// interchangeable, and dates are commonly declared as plain strings.
    pub fn is_compatible_with(&self, other: PrimitiveType) -> bool {
        use PrimitiveType::*;
        match (*self, other) {
            (Unknown, _) | (_, Unknown) => true,
            (a, b) if a == b => true,
            (Integer, Number) | (Number, Integer) => true,
            (Date | Datetime, String) | (String, Date | Datetime) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One primitive leaf field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    /// Full dotted path as found in the source document
    pub path: String,
    /// Last path segment
    pub leaf: String,
    /// Case-folded, separator-stripped leaf used for exact matching
    pub norm: String,
    /// Reduced, synonym-expanded word tokens of the leaf
    pub core_tokens: Vec<String>,
    #[serde(rename = "type")]
    pub field_type: PrimitiveType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl FieldDescriptor {
    pub fn new(path: impl Into<String>, field_type: PrimitiveType, format: Option<String>) -> Self {
        let path = path.into();
        let leaf = path.rsplit('.').next().unwrap_or(path.as_str()).to_string();
        let norm = normalize_for_equality(&leaf);
        let core_tokens = reduce_to_core_tokens(&split_tokens(&leaf));
        Self {
            path,
            leaf,
            norm,
            core_tokens,
            field_type,
            format,
        }
    }

    /// Append extra core tokens, keeping the set de-duplicated
    pub fn extend_tokens<I: IntoIterator<Item = String>>(&mut self, tokens: I) {
        for token in tokens {
            if !self.core_tokens.contains(&token) {
                self.core_tokens.push(token);
            }
        }
    }
}

/// Ordered set of leaf descriptors keyed by path
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldSet {
    fields: Vec<FieldDescriptor>,
    #[serde(skip)]
    index: AHashMap<String, usize>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor. The first descriptor recorded at a path wins.
    pub fn insert(&mut self, field: FieldDescriptor) -> bool {
        if self.index.contains_key(&field.path) {
            return false;
        }
        self.index.insert(field.path.clone(), self.fields.len());
        self.fields.push(field);
        true
    }

    pub fn get(&self, path: &str) -> Option<&FieldDescriptor> {
        self.index.get(path).map(|&i| &self.fields[i])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn as_slice(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.path.as_str())
    }

    pub fn into_vec(self) -> Vec<FieldDescriptor> {
        self.fields
    }
}

impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl FromIterator<FieldDescriptor> for FieldSet {
    fn from_iter<T: IntoIterator<Item = FieldDescriptor>>(iter: T) -> Self {
        let mut set = FieldSet::new();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_path() {
        let field = FieldDescriptor::new("customer.birthDate", PrimitiveType::Date, Some("date".into()));
        assert_eq!(field.leaf, "birthDate");
        assert_eq!(field.norm, "birthdate");
        assert_eq!(field.core_tokens, vec!["birth", "date"]);
    }

    #[test]
    fn test_type_compatibility() {
        use PrimitiveType::*;
        assert!(Integer.is_compatible_with(Number));
        assert!(Date.is_compatible_with(String));
        assert!(String.is_compatible_with(Datetime));
        assert!(Unknown.is_compatible_with(Boolean));
        assert!(Boolean.is_compatible_with(Unknown));
        assert!(!String.is_compatible_with(Integer));
        assert!(!Boolean.is_compatible_with(Number));
        assert!(!Date.is_compatible_with(Integer));
    }

    #[test]
    fn test_field_set_first_path_wins() {
        let mut set = FieldSet::new();
        assert!(set.insert(FieldDescriptor::new("id", PrimitiveType::Integer, None)));
        assert!(!set.insert(FieldDescriptor::new("id", PrimitiveType::String, None)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("id").unwrap().field_type, PrimitiveType::Integer);
    }

    #[test]
    fn test_field_set_keeps_emission_order() {
        let set: FieldSet = ["zeta", "alpha", "mid"]
            .iter()
            .map(|p| FieldDescriptor::new(*p, PrimitiveType::String, None))
            .collect();
        assert_eq!(set.paths().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }
}
