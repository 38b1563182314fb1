//! String and set similarity metrics.
//!
//! The primitives behind [`find_similar`](crate::Element::find_similar) and
//! the relocator's candidate scoring. All metrics are symmetric, bounded to
//! `[0, 1]`, and return `1.0` for equal inputs (including two empty
//! inputs), which is what makes relocation of an unchanged element score a
//! perfect `1.0`.

use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Jaccard similarity over `(name, value)` pairs.
///
/// Two empty maps are considered identical.
pub(crate) fn jaccard_pairs(a: &IndexMap<String, String>, b: &IndexMap<String, String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let set_a: BTreeSet<(&str, &str)> = a.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let set_b: BTreeSet<(&str, &str)> = b.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Levenshtein-based similarity normalized to `[0, 1]`.
pub(crate) fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Token-set ratio: whitespace tokens are deduplicated and compared by the
/// best of the intersection-anchored constructions.
///
/// Insensitive to token order and to repetition, which suits class lists
/// and short text fragments.
pub(crate) fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let common: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let base = common.join(" ");
    let combined_a = join_nonempty(&base, &only_a.join(" "));
    let combined_b = join_nonempty(&base, &only_b.join(" "));

    fuzzy_ratio(&base, &combined_a)
        .max(fuzzy_ratio(&base, &combined_b))
        .max(fuzzy_ratio(&combined_a, &combined_b))
}

fn join_nonempty(left: &str, right: &str) -> String {
    match (left.is_empty(), right.is_empty()) {
        (true, _) => right.to_string(),
        (_, true) => left.to_string(),
        (false, false) => format!("{left} {right}"),
    }
}

/// Ordered-sequence similarity via longest common subsequence:
/// `2 * lcs / (len_a + len_b)`. Two empty sequences are identical.
pub(crate) fn lcs_ratio(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = lcs_length(a, b);
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}

fn lcs_length(a: &[String], b: &[String]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for item_a in a {
        let mut prev_diag = 0;
        for (j, item_b) in b.iter().enumerate() {
            let prev_row = row[j + 1];
            row[j + 1] = if item_a == item_b {
                prev_diag + 1
            } else {
                row[j + 1].max(row[j])
            };
            prev_diag = prev_row;
        }
    }
    row[b.len()]
}

/// Composite attribute-set similarity: Jaccard on `(name, value)` pairs
/// averaged with a fuzzy ratio over the concatenated `name=value` forms.
pub(crate) fn attr_similarity(
    a: &IndexMap<String, String>,
    b: &IndexMap<String, String>,
) -> f64 {
    let jaccard = jaccard_pairs(a, b);
    let flat_a = flatten_attrs(a);
    let flat_b = flatten_attrs(b);
    let fuzzy = if flat_a.is_empty() && flat_b.is_empty() {
        1.0
    } else {
        fuzzy_ratio(&flat_a, &flat_b)
    };
    (jaccard + fuzzy) / 2.0
}

fn flatten_attrs(map: &IndexMap<String, String>) -> String {
    // Sorted by name so source-order differences do not skew the ratio.
    let mut pairs: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort_unstable();
    pairs.join(" ")
}
