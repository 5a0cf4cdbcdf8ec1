// text.rs — Tokenization and similarity heuristics.
//
// All "semantic" measurement in the engine reduces to deterministic token
// arithmetic: an overlap ratio for necessity scoring and Jaccard
// similarity for fuzzy cache lookup. Keeping both here means the
// auditors, the hypothesizer, and the path cache measure text the same
// way and cannot silently diverge.

use std::collections::HashSet;

/// Split text into lowercase alphanumeric tokens.
///
/// Splits on every non-alphanumeric character, so `read_file`,
/// `read-file`, and `Read File` all produce `["read", "file"]`. Used for
/// necessity scoring and marker detection, where snake_case tool names
/// must line up with natural-language intent words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Split text into lowercase whitespace-separated tokens.
///
/// Cache keys are compared word-for-word as the caller wrote them;
/// punctuation stays attached to its word.
pub fn whitespace_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Overlap score between a candidate and a reference token list:
/// `|candidate ∩ reference| / max(1, |reference|)` over distinct tokens,
/// clamped to [0, 1].
///
/// This is the necessity formula: how much of the reference (the task
/// intent) the candidate (tool name + arguments) actually touches.
pub fn overlap_score(candidate: &[String], reference: &[String]) -> f64 {
    let cand: HashSet<&str> = candidate.iter().map(String::as_str).collect();
    let refs: HashSet<&str> = reference.iter().map(String::as_str).collect();
    let shared = cand.intersection(&refs).count() as f64;
    let score = shared / refs.len().max(1) as f64;
    score.clamp(0.0, 1.0)
}

/// Jaccard similarity over whitespace tokens: `|A ∩ B| / |A ∪ B|`.
///
/// Returns 0.0 when both sides are empty — two empty queries are not
/// similar, they are absent.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let ta: HashSet<String> = whitespace_tokens(a).into_iter().collect();
    let tb: HashSet<String> = whitespace_tokens(b).into_iter().collect();
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    shared as f64 / union as f64
}

/// Normalize free text for use as an index key: lowercase, whitespace
/// collapsed to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_snake_case_and_spaces() {
        assert_eq!(tokenize("read_file"), vec!["read", "file"]);
        assert_eq!(tokenize("Read the Bill"), vec!["read", "the", "bill"]);
        assert_eq!(tokenize("fetch-user-record"), vec!["fetch", "user", "record"]);
    }

    #[test]
    fn tokenize_drops_empty_segments() {
        assert_eq!(tokenize("__a__b__"), vec!["a", "b"]);
        assert!(tokenize("***").is_empty());
    }

    #[test]
    fn whitespace_tokens_keep_punctuation_attached() {
        assert_eq!(
            whitespace_tokens("read bill.txt now"),
            vec!["read", "bill.txt", "now"]
        );
    }

    #[test]
    fn overlap_score_counts_distinct_shared_tokens() {
        let candidate = tokenize("read_file bill.txt");
        let reference = tokenize("read the bill file");
        // shared: {read, bill, file} out of 4 reference tokens
        let score = overlap_score(&candidate, &reference);
        assert!((score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn overlap_score_empty_reference_is_zero() {
        let candidate = tokenize("anything");
        assert_eq!(overlap_score(&candidate, &[]), 0.0);
    }

    #[test]
    fn jaccard_identical_strings_is_one() {
        assert_eq!(jaccard_similarity("fetch the bill", "fetch the bill"), 1.0);
    }

    #[test]
    fn jaccard_disjoint_strings_is_zero() {
        assert_eq!(jaccard_similarity("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn jaccard_partial_overlap() {
        // {fetch, the, bill} vs {fetch, the, invoice}: 2 shared, 4 union
        let sim = jaccard_similarity("fetch the bill", "fetch the invoice");
        assert!((sim - 0.5).abs() < 1e-9);
    }

    #[test]
    fn jaccard_both_empty_is_zero() {
        assert_eq!(jaccard_similarity("", "   "), 0.0);
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  Fetch   the\tBill "), "fetch the bill");
    }
}
