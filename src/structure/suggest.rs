//! Fuzzy "did you mean" hints for missing block headers.

use strsim::normalized_levenshtein;

const MIN_SIMILARITY: f64 = 0.7;
const MAX_SUGGESTIONS: usize = 3;

/// Return up to three lines of `doc` that look like one of `spellings`.
///
/// Only lines that open a brace are considered. Results are ordered by
/// descending similarity.
pub fn similar_headers(doc: &str, spellings: &[String]) -> Vec<String> {
    let mut scored: Vec<(f64, &str)> = doc
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with('{'))
        .filter_map(|line| {
            let best = spellings
                .iter()
                .map(|spelling| normalized_levenshtein(line, spelling))
                .fold(0.0_f64, f64::max);
            (best >= MIN_SIMILARITY).then_some((best, line))
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, line)| line.to_string())
        .collect()
}
