//! String and token-set similarity functions
//!
//! All functions return a similarity score in range [0.0, 1.0] where 1.0 means identical.

use ahash::AHashSet;

/// Standard Winkler prefix scale
const WINKLER_SCALING: f64 = 0.1;
/// Longest common prefix rewarded by the Winkler boost
const WINKLER_MAX_PREFIX: usize = 4;

/// Jaro similarity between two strings
///
/// Characters match when equal and no further apart than
/// `floor(max(len) / 2) - 1` positions.
pub fn jaro(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if b_matched[j] || b[j] != *ca {
                continue;
            }
            a_matched[i] = true;
            b_matched[j] = true;
            matches += 1;
            break;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // Half the number of matched characters that appear out of order
    let mut transpositions = 0usize;
    let mut k = 0usize;
    for (i, ca) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[k] {
            k += 1;
        }
        if *ca != b[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let t = (transpositions / 2) as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t) / m) / 3.0
}

/// Jaro-Winkler similarity: Jaro boosted by a shared prefix of up to four characters
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let sim = jaro(a, b);
    if sim <= 0.0 || sim >= 1.0 {
        return sim;
    }

    let prefix = a
        .chars()
        .zip(b.chars())
        .take(WINKLER_MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();

    sim + prefix as f64 * WINKLER_SCALING * (1.0 - sim)
}

/// Jaccard similarity between two token collections
///
/// Duplicates are ignored. Two empty collections are identical (1.0).
pub fn jaccard<A, B>(a: &[A], b: &[B]) -> f64
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let set_a: AHashSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let set_b: AHashSet<&str> = b.iter().map(AsRef::as_ref).collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Whether every token of `inner` appears in `outer`
pub fn is_token_subset<A, B>(inner: &[A], outer: &[B]) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    inner
        .iter()
        .all(|t| outer.iter().any(|o| o.as_ref() == t.as_ref()))
}
