//! Query normalization applied before either predictor sees the query.

/// Canonicalize a raw query: trim, collapse whitespace runs to one space and
/// uppercase the first character (the generation model was trained on
/// sentence-cased prompts).
///
/// Total and idempotent; an empty or blank query yields `""`.
pub fn normalize(query: &str) -> String {
    let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
