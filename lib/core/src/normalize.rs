//! Field-name normalization and tokenization
//!
//! Turns a raw leaf name (`birthDate`, `en_last_name`, `SSN`) into two
//! comparison forms:
//!
//! - an equality form (`normalize_for_equality`) used for cheap exact matching
//! - a reduced core-token set (`reduce_to_core_tokens`) used for containment
//!   and fuzzy matching

use crate::field::PrimitiveType;

/// Language codes that may prefix a field name (`ru_name`, `en_title`)
pub const LANGUAGE_PREFIXES: &[&str] = &[
    "en", "ru", "kk", "kz", "uz", "ky", "tg", "de", "fr", "es", "it", "zh",
];

/// Words carrying no discriminating meaning in a field name
pub const GENERIC_WORDS: &[&str] = &[
    "id", "name", "type", "code", "value", "data", "info", "field", "of", "the",
];

/// Token expansions applied to surviving tokens
pub const SYNONYMS: &[(&str, &[&str])] = &[
    ("dob", &["date", "birth"]),
    ("birthday", &["birth", "date"]),
    ("birthdate", &["birth", "date"]),
    ("surname", &["last", "name"]),
    ("lastname", &["last", "name"]),
    ("familyname", &["last", "name"]),
    ("firstname", &["first", "name"]),
    ("forename", &["first", "name"]),
    ("givenname", &["first", "name"]),
    ("patronymic", &["middle", "name"]),
    ("ssn", &["social", "security", "number"]),
    ("tel", &["phone"]),
    ("telephone", &["phone"]),
    ("mobile", &["phone"]),
    ("mail", &["email"]),
    ("addr", &["address"]),
    ("zip", &["postal"]),
    ("zipcode", &["postal"]),
    ("postcode", &["postal"]),
    ("dt", &["date"]),
    ("ts", &["timestamp"]),
    ("qty", &["quantity"]),
    ("amt", &["amount"]),
    ("desc", &["description"]),
];

/// Split a field name into lowercase word tokens.
///
/// camelCase boundaries become separators, then any run of
/// non-alphanumeric characters splits tokens.
pub fn split_tokens(name: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(name.len() + 8);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if let Some(p) = prev {
            if c.is_uppercase() && (p.is_lowercase() || p.is_ascii_digit()) {
                spaced.push(' ');
            }
        }
        spaced.push(c);
        prev = Some(c);
    }

    spaced
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lower-case and strip whitespace, dots, underscores and hyphens
#[inline]
pub fn normalize_for_equality(leaf: &str) -> String {
    leaf.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '.' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn synonyms_for(token: &str) -> Option<&'static [&'static str]> {
    SYNONYMS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, expansion)| *expansion)
}

/// Reduce word tokens to their semantic core.
///
/// Drops a leading language prefix (only when more tokens follow), removes
/// generic words from any position, appends synonym expansions after each
/// surviving token, and de-duplicates keeping first-seen order.
pub fn reduce_to_core_tokens(tokens: &[String]) -> Vec<String> {
    let start = match tokens.first() {
        Some(first) if tokens.len() > 1 && LANGUAGE_PREFIXES.contains(&first.as_str()) => 1,
        _ => 0,
    };

    let mut core: Vec<String> = Vec::with_capacity(tokens.len() + 2);
    for token in &tokens[start..] {
        if GENERIC_WORDS.contains(&token.as_str()) {
            continue;
        }
        push_unique(&mut core, token);
        if let Some(expansion) = synonyms_for(token) {
            for extra in expansion {
                push_unique(&mut core, extra);
            }
        }
    }

    core
}

fn push_unique(core: &mut Vec<String>, token: &str) {
    if !core.iter().any(|t| t == token) {
        core.push(token.to_string());
    }
}

/// Tokenize free text (titles, tag descriptions, mapped names) into core tokens
pub fn core_tokens_of(text: &str) -> Vec<String> {
    reduce_to_core_tokens(&split_tokens(text))
}

/// Infer the primitive type of a leaf from its declared type and format.
///
/// A `date`/`date-time` format always wins over the declared type.
pub fn infer_primitive_type(declared_type: Option<&str>, format: Option<&str>) -> PrimitiveType {
    match format.map(str::to_ascii_lowercase).as_deref() {
        Some("date") => return PrimitiveType::Date,
        Some("date-time") | Some("datetime") => return PrimitiveType::Datetime,
        _ => {}
    }

    match declared_type.map(str::to_ascii_lowercase).as_deref() {
        Some("integer") => PrimitiveType::Integer,
        Some("number") => PrimitiveType::Number,
        Some("boolean") => PrimitiveType::Boolean,
        Some("string") => PrimitiveType::String,
        _ => PrimitiveType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_camel_case() {
        assert_eq!(split_tokens("birthDate"), toks(&["birth", "date"]));
        assert_eq!(split_tokens("dateOfBirth"), toks(&["date", "of", "birth"]));
        assert_eq!(split_tokens("user_id"), toks(&["user", "id"]));
        assert_eq!(split_tokens("address2Line"), toks(&["address2", "line"]));
    }

    #[test]
    fn test_split_separators_and_empty() {
        assert_eq!(split_tokens("en-first name"), toks(&["en", "first", "name"]));
        assert_eq!(split_tokens("__x__"), toks(&["x"]));
        assert!(split_tokens("").is_empty());
        assert!(split_tokens("._-").is_empty());
    }

    #[test]
    fn test_normalize_for_equality() {
        assert_eq!(normalize_for_equality("user_id"), "userid");
        assert_eq!(normalize_for_equality("UserId"), "userid");
        assert_eq!(normalize_for_equality("first-name.v 2"), "firstnamev2");
    }

    #[test]
    fn test_language_prefix_dropped_only_with_followers() {
        assert_eq!(reduce_to_core_tokens(&toks(&["ru", "title"])), toks(&["title"]));
        assert_eq!(reduce_to_core_tokens(&toks(&["en"])), toks(&["en"]));
    }

    #[test]
    fn test_generic_words_removed_anywhere() {
        assert_eq!(reduce_to_core_tokens(&toks(&["user", "id"])), toks(&["user"]));
        assert_eq!(reduce_to_core_tokens(&toks(&["type", "code"])), Vec::<String>::new());
        assert_eq!(
            reduce_to_core_tokens(&toks(&["account", "type", "status"])),
            toks(&["account", "status"])
        );
    }

    #[test]
    fn test_synonym_expansion() {
        assert_eq!(core_tokens_of("dob"), toks(&["dob", "date", "birth"]));
        assert_eq!(core_tokens_of("surname"), toks(&["surname", "last", "name"]));
        assert_eq!(
            core_tokens_of("ssn"),
            toks(&["ssn", "social", "security", "number"])
        );
    }

    #[test]
    fn test_birth_date_variants_converge() {
        let a = core_tokens_of("birthDate");
        let b = core_tokens_of("dob");
        let c = core_tokens_of("dateOfBirth");
        for t in ["birth", "date"] {
            assert!(a.iter().any(|x| x == t));
            assert!(b.iter().any(|x| x == t));
            assert!(c.iter().any(|x| x == t));
        }
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        assert_eq!(
            reduce_to_core_tokens(&toks(&["date", "birthday"])),
            toks(&["date", "birthday", "birth"])
        );
    }

    #[test]
    fn test_infer_primitive_type() {
        assert_eq!(infer_primitive_type(Some("string"), Some("date-time")), PrimitiveType::Datetime);
        assert_eq!(infer_primitive_type(Some("string"), Some("date")), PrimitiveType::Date);
        assert_eq!(infer_primitive_type(Some("integer"), Some("int64")), PrimitiveType::Integer);
        assert_eq!(infer_primitive_type(Some("number"), None), PrimitiveType::Number);
        assert_eq!(infer_primitive_type(Some("boolean"), None), PrimitiveType::Boolean);
        assert_eq!(infer_primitive_type(Some("object"), None), PrimitiveType::Unknown);
        assert_eq!(infer_primitive_type(None, None), PrimitiveType::Unknown);
    }
}
