//! Relevance scoring for term matches.
//!
//! A single TF-IDF variant scores each (document, field, term) contribution.
//! Prefix and fuzzy expansions are penalized through a match degradation
//! fraction that dampens the field boost.

/// Degradation applied to a prefix expansion of `query_len` characters that
/// matched a term of `term_len` characters.
///
/// Grows with the unmatched suffix: `0.3 * (term_len - query_len) / term_len`.
pub fn prefix_degradation(query_len: usize, term_len: usize) -> f64 {
    if term_len == 0 {
        return 0.0;
    }
    0.3 * term_len.saturating_sub(query_len) as f64 / term_len as f64
}

/// Degradation applied to a fuzzy match: edit distance over the length of
/// the matched term.
pub fn fuzzy_degradation(distance: usize, term_len: usize) -> f64 {
    if term_len == 0 {
        return 0.0;
    }
    distance as f64 / term_len as f64
}

/// Scores one term occurrence set within one field of one document.
///
/// ```text
/// boost / (1 + 0.333 * boost * degradation) * tf * ln(N / df) / relative_length
/// ```
///
/// where `N` is the number of indexed documents and `df` the number of
/// documents containing the term in this field. A term present in every
/// document contributes nothing.
pub fn tf_idf(
    term_frequency: u32,
    document_frequency: u32,
    document_count: usize,
    relative_field_length: f64,
    field_boost: f64,
    match_degradation: f64,
) -> f64 {
    if document_frequency == 0 || document_count == 0 {
        return 0.0;
    }
    let idf = (document_count as f64 / f64::from(document_frequency)).ln();
    field_boost / 0.333f64.mul_add(field_boost * match_degradation, 1.0)
        * f64::from(term_frequency)
        * idf
        / relative_field_length
}
