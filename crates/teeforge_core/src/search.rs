//! crates/teeforge_core/src/search.rs
//!
//! Relevance-ranked substring search over cached catalog lists (blueprints,
//! print providers). Pure and deterministic: a fixed candidate list and
//! query always produce the same ordering.

use std::cmp::Reverse;

/// Results are capped to the first 20 matches after ranking.
pub const MAX_RESULTS: usize = 20;

const SCORE_EXACT: u32 = 100;
const SCORE_PREFIX: u32 = 50;
const SCORE_SUBSTRING: u32 = 10;

/// Scores one candidate against a lowercased query: exact field match
/// scores 100, prefix 50, substring 10, summed across all fields.
fn score_fields(query_lower: &str, fields: &[&str]) -> u32 {
    let mut score = 0;
    for field in fields {
        let field_lower = field.to_lowercase();
        if field_lower == query_lower {
            score += SCORE_EXACT;
        } else if field_lower.starts_with(query_lower) {
            score += SCORE_PREFIX;
        } else if field_lower.contains(query_lower) {
            score += SCORE_SUBSTRING;
        }
    }
    score
}

/// Filters `items` to those with at least one field matching `query`
/// (case-insensitive substring), ranks by summed score descending with the
/// original order as tiebreak, and caps to [`MAX_RESULTS`].
///
/// A blank query returns the first [`MAX_RESULTS`] items unranked.
pub fn search<'a, T, F>(items: &'a [T], query: &str, fields: F) -> Vec<&'a T>
where
    F: Fn(&'a T) -> Vec<&'a str>,
{
    let query_lower = query.trim().to_lowercase();
    if query_lower.is_empty() {
        return items.iter().take(MAX_RESULTS).collect();
    }

    let mut scored: Vec<(&T, u32)> = items
        .iter()
        .filter_map(|item| {
            let score = score_fields(&query_lower, &fields(item));
            (score > 0).then_some((item, score))
        })
        .collect();

    // Stable sort keeps original order as the tiebreak.
    scored.sort_by_key(|(_, score)| Reverse(*score));
    scored
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(item, _)| item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles<'a>(items: &'a [&'a str], query: &str) -> Vec<&'a str> {
        search(items, query, |t| vec![*t])
            .into_iter()
            .copied()
            .collect()
    }

    #[test]
    fn prefix_matches_rank_before_plain_substrings_and_nonmatches_drop() {
        let candidates = ["Unisex Tee", "Unisex Hoodie", "Premium Tee"];
        let results = titles(&candidates, "unisex");
        assert_eq!(results, vec!["Unisex Tee", "Unisex Hoodie"]);
    }

    #[test]
    fn exact_match_outranks_prefix_match() {
        let candidates = ["Tee Deluxe", "Tee"];
        let results = titles(&candidates, "tee");
        assert_eq!(results, vec!["Tee", "Tee Deluxe"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let candidates = ["GILDAN 5000", "Bella+Canvas"];
        let results = titles(&candidates, "gildan");
        assert_eq!(results, vec!["GILDAN 5000"]);
    }

    #[test]
    fn scores_sum_across_fields() {
        // "Soft Tee": title substring (10) + brand prefix (50) = 60,
        // outranking "Classic Tee" with its lone title substring (10).
        let items = [("Soft Tee", "Tee Co"), ("Classic Tee", "Gildan")];
        let results = search(&items, "tee", |(title, brand)| vec![*title, *brand]);
        assert_eq!(results[0].0, "Soft Tee");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn results_are_capped_to_twenty() {
        let many: Vec<String> = (0..50).map(|i| format!("Shirt {i}")).collect();
        let results = search(&many, "shirt", |s| vec![s.as_str()]);
        assert_eq!(results.len(), MAX_RESULTS);
    }

    #[test]
    fn search_is_deterministic_for_fixed_inputs() {
        let candidates = ["Unisex Tee", "Heavy Cotton Tee", "Unisex Hoodie"];
        let first = titles(&candidates, "tee");
        let second = titles(&candidates, "tee");
        assert_eq!(first, second);
    }

    #[test]
    fn blank_query_returns_unranked_prefix_of_list() {
        let candidates = ["B", "A", "C"];
        let results = titles(&candidates, "   ");
        assert_eq!(results, vec!["B", "A", "C"]);
    }
}
