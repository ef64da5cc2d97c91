//! Cross-platform market matcher
//!
//! Maps each market from platform A to its best counterpart on platform
//! B. A cheap pre-filter (end-date proximity, keyword overlap, outcome
//! cardinality) cuts the pairwise set down before the fuzzy ranker runs;
//! the pre-filter is the performance lever, the ranker the accuracy one.

use scanner_core::{MarketMatch, MatchedBy, StandardMarket};
use std::collections::HashSet;
use strsim::normalized_damerau_levenshtein;
use tracing::debug;

/// English stop words stripped before keyword comparison.
const STOP_WORDS: &[&str] = &[
    "will", "the", "be", "in", "on", "at", "to", "a", "an", "is", "are", "was", "were", "for",
    "of", "by", "or",
];

/// Matching thresholds.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Minimum title similarity in [0, 1]; matches below are discarded
    pub threshold: f64,
    /// Maximum end-date distance when both markets carry one
    pub max_date_diff_days: i64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: 0.60,
            max_date_diff_days: 30,
        }
    }
}

/// Pre-filter + fuzzy best-match ranker.
#[derive(Debug, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Find, for each market in `list_a`, its best counterpart in
    /// `list_b`. Emits at most one match per element of A; elements of B
    /// may back multiple matches.
    pub fn find_matches(
        &self,
        list_a: &[StandardMarket],
        list_b: &[StandardMarket],
    ) -> Vec<MarketMatch> {
        let mut matches = Vec::new();

        for a in list_a {
            let candidates: Vec<&StandardMarket> = list_b
                .iter()
                .filter(|b| self.passes_prefilter(a, b))
                .collect();

            if candidates.is_empty() {
                continue;
            }

            if let Some((best, distance)) = self.rank(a, &candidates) {
                let score = ((1.0 - distance) * 100.0).round() as u8;
                matches.push(MarketMatch {
                    market_a: a.clone(),
                    market_b: best.clone(),
                    score,
                    matched_by: MatchedBy::Fuzzy,
                });
            }
        }

        debug!(
            "Matched {} of {} markets against {} candidates",
            matches.len(),
            list_a.len(),
            list_b.len()
        );
        matches
    }

    /// Cheap rejection: date proximity, shared keyword, equal outcome
    /// count. A missing end date on either side never rejects.
    fn passes_prefilter(&self, a: &StandardMarket, b: &StandardMarket) -> bool {
        if let (Some(end_a), Some(end_b)) = (a.end_date, b.end_date) {
            let diff_days = (end_a - end_b).num_days().abs();
            if diff_days > self.config.max_date_diff_days {
                return false;
            }
        }

        if a.outcomes.len() != b.outcomes.len() {
            return false;
        }

        let keywords_a = keywords(&a.title);
        if keywords_a.is_empty() {
            return false;
        }
        let keywords_b = keywords(&b.title);
        !keywords_a.is_disjoint(&keywords_b)
    }

    /// Rank `candidates` by normalized edit distance to `a`'s title,
    /// ascending. Returns the best candidate within the distance
    /// threshold; ties keep the earliest candidate (stable over input
    /// order).
    fn rank<'b>(
        &self,
        a: &StandardMarket,
        candidates: &[&'b StandardMarket],
    ) -> Option<(&'b StandardMarket, f64)> {
        let title_a = a.title.to_lowercase();
        let max_distance = 1.0 - self.config.threshold;

        let mut best: Option<(&StandardMarket, f64)> = None;
        for candidate in candidates {
            let similarity =
                normalized_damerau_levenshtein(&title_a, &candidate.title.to_lowercase());
            let distance = 1.0 - similarity;
            if distance > max_distance {
                continue;
            }
            // Strict less-than keeps the first of equally-distant candidates.
            if best.map(|(_, d)| distance < d).unwrap_or(true) {
                best = Some((candidate, distance));
            }
        }
        best
    }
}

/// Extract comparison keywords from a title: punctuation becomes
/// whitespace, tokens are lowercased, only tokens longer than two
/// characters survive, stop words are removed.
pub fn keywords(title: &str) -> HashSet<String> {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|token| token.len() > 2)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use scanner_core::{Outcome, Platform};

    fn market(platform: Platform, id: &str, title: &str) -> StandardMarket {
        StandardMarket {
            id: id.to_string(),
            platform,
            title: title.to_string(),
            url: format!("https://example.com/{id}"),
            outcomes: vec![
                Outcome::new("Yes", dec!(0.5)),
                Outcome::new("No", dec!(0.5)),
            ],
            end_date: None,
            liquidity: None,
            category: None,
        }
    }

    #[test]
    fn test_keywords_strip_punctuation_and_stop_words() {
        let words = keywords("Will the US be in a recession in 2025?");
        assert!(words.contains("recession"));
        assert!(words.contains("2025"));
        // "US" is two characters, dropped by the length filter.
        assert!(!words.contains("us"));
        assert!(!words.contains("will"));
        assert!(!words.contains("the"));
    }

    #[test]
    fn test_fuzzy_match_near_identical_titles() {
        let matcher = Matcher::default();
        let a = vec![market(Platform::Polymarket, "p1", "US recession in 2025?")];
        let b = vec![market(Platform::Manifold, "m1", "US recession 2025")];

        let matches = matcher.find_matches(&a, &b);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].score >= 60, "score was {}", matches[0].score);
        assert_eq!(matches[0].matched_by, MatchedBy::Fuzzy);
        assert!(matches[0].is_cross_platform());
    }

    #[test]
    fn test_no_shared_keywords_no_match() {
        let matcher = Matcher::default();
        let a = vec![market(Platform::Polymarket, "p1", "Bitcoin above 100k?")];
        let b = vec![market(Platform::Kalshi, "k1", "Fed cuts rates twice")];

        assert!(matcher.find_matches(&a, &b).is_empty());
    }

    #[test]
    fn test_all_keywords_stopworded_no_match() {
        let matcher = Matcher::default();
        // Every token is a stop word or too short: keyword set is empty,
        // so nothing can share a keyword with it.
        let a = vec![market(Platform::Polymarket, "p1", "Will it be on at?")];
        let b = vec![market(Platform::Kalshi, "k1", "Will it be on at?")];

        assert!(matcher.find_matches(&a, &b).is_empty());
    }

    #[test]
    fn test_date_prefilter_rejects_distant_dates() {
        let matcher = Matcher::default();
        let now = Utc::now();

        let mut a = market(Platform::Polymarket, "p1", "US recession in 2025?");
        a.end_date = Some(now);
        let mut b = market(Platform::Manifold, "m1", "US recession 2025");
        b.end_date = Some(now + Duration::days(45));

        assert!(matcher.find_matches(&[a], &[b]).is_empty());
    }

    #[test]
    fn test_missing_end_date_never_rejects() {
        let matcher = Matcher::default();
        let mut a = market(Platform::Polymarket, "p1", "US recession in 2025?");
        a.end_date = Some(Utc::now());
        let b = market(Platform::Manifold, "m1", "US recession 2025");
        assert!(b.end_date.is_none());

        assert_eq!(matcher.find_matches(&[a], &[b]).len(), 1);
    }

    #[test]
    fn test_outcome_cardinality_must_agree() {
        let matcher = Matcher::default();
        let a = vec![market(Platform::Polymarket, "p1", "US recession in 2025?")];
        let mut b = market(Platform::Manifold, "m1", "US recession 2025");
        b.outcomes.push(Outcome::new("Maybe", dec!(0.0)));

        assert!(matcher.find_matches(&a, &[b]).is_empty());
    }

    #[test]
    fn test_dissimilar_titles_below_threshold() {
        let matcher = Matcher::default();
        // Shares the keyword "recession" but the titles read nothing alike.
        let a = vec![market(Platform::Polymarket, "p1", "US recession in 2025?")];
        let b = vec![market(
            Platform::Kalshi,
            "k1",
            "How many recession headlines tomorrow morning edition count",
        )];

        assert!(matcher.find_matches(&a, &b).is_empty());
    }

    #[test]
    fn test_best_of_multiple_candidates_wins() {
        let matcher = Matcher::default();
        let a = vec![market(Platform::Polymarket, "p1", "US recession in 2025?")];
        let b = vec![
            market(Platform::Manifold, "far", "Global recession fears grow in 2025"),
            market(Platform::Manifold, "near", "US recession in 2025"),
        ];

        let matches = matcher.find_matches(&a, &b);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].market_b.id, "near");
    }

    #[test]
    fn test_at_most_one_match_per_a() {
        let matcher = Matcher::default();
        let a = vec![market(Platform::Polymarket, "p1", "US recession in 2025?")];
        let b = vec![
            market(Platform::Manifold, "m1", "US recession in 2025"),
            market(Platform::Manifold, "m2", "US recession in 2025!"),
        ];

        assert_eq!(matcher.find_matches(&a, &b).len(), 1);
    }
}
