//! String-distance primitives used by the scoring engine.
//!
//! Two measures: a plain normalized edit-distance ratio for free text, and a
//! key-aware variant that rewards shared leading path segments in
//! `/`-delimited hierarchical keys. Both are stateless and deterministic.

/// Normalized edit-distance closeness in `[0.0, 1.0]` — 1.0 means identical.
///
/// Case-sensitive; callers that want case-insensitive comparison lowercase
/// first (see [`key_similarity`]).
pub fn text_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Key closeness in `[0.0, 1.0]`, case-insensitive.
///
/// Blends the edit-distance ratio with shared-leading-segment credit so that
/// `sec/auth-1` vs `sec/auth-2` outranks two keys with no common prefix.
pub fn key_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let base = strsim::normalized_levenshtein(&a, &b);

    let a_segs: Vec<&str> = a.split('/').collect();
    let b_segs: Vec<&str> = b.split('/').collect();
    let shared = a_segs
        .iter()
        .zip(b_segs.iter())
        .take_while(|(x, y)| x == y)
        .count();
    let seg_ratio = shared as f64 / a_segs.len().max(b_segs.len()) as f64;

    (0.6 * base + 0.4 * seg_ratio).clamp(0.0, 1.0)
}
