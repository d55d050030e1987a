//! Fuzzy keyword filter.
//!
//! Each keyword is scored against the best-matching window of the message:
//! windows one char shorter, equal to, and one char longer than the keyword
//! are compared with normalized Levenshtein similarity. The score runs from
//! `0.0` (exact occurrence) to `1.0` (nothing alike); lower is better, and a
//! keyword counts as matched when its score is at most the threshold.
//!
//! ```rust,ignore
//! on::<MessageEvent>()
//!     .with(
//!         fuzzy_contains([("weather", 2.0), ("forecast", 1.0)], 0.3)
//!             .require_all_match(false),
//!     )
//!     .handle(|ctx| async move {
//!         let hit = ctx.get::<FuzzyContainsMatch>().unwrap();
//!         println!("weighted score {}", hit.weighted_score);
//!     })
//!     .commit(&bus)?;
//! ```

use async_trait::async_trait;
use sakiko_core::{Context, HandlerResult, Middleware};
use tracing::trace;

/// Only this many leading chars are searched when location matters.
pub const LOCATION_WINDOW: usize = 60;

/// A keyword and how much its score counts towards the weighted score.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedKeyword {
    pub text: String,
    pub weight: f64,
}

impl WeightedKeyword {
    /// Non-finite weights fall back to `1.0`.
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight: if weight.is_finite() { weight } else { 1.0 },
        }
    }
}

impl From<&str> for WeightedKeyword {
    fn from(text: &str) -> Self {
        Self::new(text, 1.0)
    }
}

impl From<String> for WeightedKeyword {
    fn from(text: String) -> Self {
        Self::new(text, 1.0)
    }
}

impl<S: Into<String>> From<(S, f64)> for WeightedKeyword {
    fn from((text, weight): (S, f64)) -> Self {
        Self::new(text, weight)
    }
}

/// Score of one keyword against the message.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyHit {
    pub keyword: String,
    pub weight: f64,
    /// `0.0` is an exact occurrence, `1.0` means no match at all.
    pub score: f64,
    /// `score <= threshold`.
    pub matched: bool,
    /// Char range `[start, end)` of the best window in the searched text,
    /// which is lowercased unless the filter is case sensitive.
    pub range: Option<(usize, usize)>,
}

/// Set by [`fuzzy_contains`].
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyContainsMatch {
    pub threshold: f64,
    pub case_sensitive: bool,
    pub location_sensitive: bool,
    pub require_all_match: bool,
    /// Lowest score over all keywords.
    pub min_score: f64,
    /// Highest score over all keywords.
    pub max_score: f64,
    /// One hit per keyword, in configuration order.
    pub keyword_scores: Vec<FuzzyHit>,
    /// Matched keywords, best score first.
    pub matched_keywords: Vec<FuzzyHit>,
    /// Weight-averaged score of the matched keywords, `1.0` when none matched.
    pub weighted_score: f64,
}

/// Middleware behind [`fuzzy_contains`].
#[derive(Debug, Clone)]
pub struct FuzzyFilter {
    keywords: Vec<WeightedKeyword>,
    threshold: f64,
    case_sensitive: bool,
    location_sensitive: bool,
    require_all_match: bool,
}

/// Passes when at least one of `keywords` fuzzily occurs in the message.
///
/// `threshold` is the highest score still counted as a match; `0.0` only
/// accepts exact occurrences. Matching ignores case and searches the whole
/// message unless configured otherwise.
pub fn fuzzy_contains<I, K>(keywords: I, threshold: f64) -> FuzzyFilter
where
    I: IntoIterator<Item = K>,
    K: Into<WeightedKeyword>,
{
    FuzzyFilter {
        keywords: keywords.into_iter().map(Into::into).collect(),
        threshold,
        case_sensitive: false,
        location_sensitive: false,
        require_all_match: false,
    }
}

impl FuzzyFilter {
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Only search the first [`LOCATION_WINDOW`] chars of the message.
    pub fn location_sensitive(mut self, location_sensitive: bool) -> Self {
        self.location_sensitive = location_sensitive;
        self
    }

    /// Pass only when every keyword matches.
    pub fn require_all_match(mut self, require_all_match: bool) -> Self {
        self.require_all_match = require_all_match;
        self
    }

    pub fn keywords(&self) -> &[WeightedKeyword] {
        &self.keywords
    }

    fn evaluate(&self, text: &str) -> FuzzyContainsMatch {
        let searched = if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        };
        let searched: &str = if self.location_sensitive {
            match searched.char_indices().nth(LOCATION_WINDOW) {
                Some((end, _)) => &searched[..end],
                None => &searched,
            }
        } else {
            &searched
        };

        let keyword_scores: Vec<FuzzyHit> = self
            .keywords
            .iter()
            .map(|kw| {
                let keyword = if self.case_sensitive {
                    kw.text.clone()
                } else {
                    kw.text.to_lowercase()
                };
                let (score, range) = best_window(searched, &keyword);
                FuzzyHit {
                    keyword: kw.text.clone(),
                    weight: kw.weight,
                    score,
                    matched: score <= self.threshold,
                    range,
                }
            })
            .collect();

        let mut matched_keywords: Vec<FuzzyHit> =
            keyword_scores.iter().filter(|h| h.matched).cloned().collect();
        matched_keywords.sort_by(|a, b| a.score.total_cmp(&b.score));

        let total_weight: f64 = matched_keywords.iter().map(|h| h.weight).sum();
        let weighted_score = if matched_keywords.is_empty() || total_weight <= 0.0 {
            1.0
        } else {
            matched_keywords
                .iter()
                .map(|h| h.score * h.weight)
                .sum::<f64>()
                / total_weight
        };

        let min_score = keyword_scores
            .iter()
            .map(|h| h.score)
            .fold(f64::INFINITY, f64::min);
        let max_score = keyword_scores
            .iter()
            .map(|h| h.score)
            .fold(f64::NEG_INFINITY, f64::max);

        FuzzyContainsMatch {
            threshold: self.threshold,
            case_sensitive: self.case_sensitive,
            location_sensitive: self.location_sensitive,
            require_all_match: self.require_all_match,
            min_score,
            max_score,
            keyword_scores,
            matched_keywords,
            weighted_score,
        }
    }
}

#[async_trait]
impl Middleware for FuzzyFilter {
    async fn process(&self, ctx: Context) -> HandlerResult<(Context, bool)> {
        if self.keywords.is_empty() {
            return Ok((ctx, false));
        }
        let Some(text) = ctx.plain_text() else {
            trace!("Event carries no message");
            return Ok((ctx, false));
        };

        let result = self.evaluate(&text);
        let pass = if self.require_all_match {
            result.matched_keywords.len() == result.keyword_scores.len()
        } else {
            !result.matched_keywords.is_empty()
        };
        trace!(
            min_score = result.min_score,
            matched = result.matched_keywords.len(),
            pass,
            "Fuzzy keywords scored"
        );
        Ok((ctx.with(result), pass))
    }
}

/// Best score of `keyword` against any window of `text`, with its char range.
fn best_window(text: &str, keyword: &str) -> (f64, Option<(usize, usize)>) {
    let key_len = keyword.chars().count();
    if key_len == 0 {
        return (0.0, None);
    }
    // Byte offset of every char boundary, including the end.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let text_len = bounds.len() - 1;
    if text_len == 0 {
        return (1.0, None);
    }

    let mut best = (1.0, None);
    for len in [key_len, key_len.saturating_sub(1), key_len + 1] {
        let len = len.clamp(1, text_len);
        for start in 0..=text_len - len {
            let window = &text[bounds[start]..bounds[start + len]];
            let score = 1.0 - strsim::normalized_levenshtein(window, keyword);
            if score < best.0 {
                best = (score, Some((start, start + len)));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBot, notice, text_message};
    use tokio_test::block_on;

    fn run(filter: &FuzzyFilter, text: &str) -> (Context, bool) {
        let ctx = Context::new(text_message(text), MockBot::boxed("10001"));
        block_on(filter.process(ctx)).unwrap()
    }

    #[test]
    fn test_best_window_scores() {
        assert_eq!(best_window("please help me", "help"), (0.0, Some((7, 11))));
        assert_eq!(best_window("please help me", "halp"), (0.25, Some((7, 11))));
        assert_eq!(best_window("please help me", "xyz").0, 1.0);
        assert_eq!(best_window("", "xyz"), (1.0, None));
    }

    #[test]
    fn test_fuzzy_contains_tolerates_typos() {
        let filter = fuzzy_contains(["halp"], 0.3);
        let (next, pass) = run(&filter, "please help me");
        assert!(pass);

        let hit = next.get::<FuzzyContainsMatch>().unwrap();
        assert_eq!(hit.matched_keywords.len(), 1);
        assert_eq!(hit.matched_keywords[0].keyword, "halp");
        assert_eq!(hit.matched_keywords[0].score, 0.25);
        assert_eq!(hit.weighted_score, 0.25);

        let strict = fuzzy_contains(["halp"], 0.1);
        assert!(!run(&strict, "please help me").1);
    }

    #[test]
    fn test_weighted_score_and_ordering() {
        let filter = fuzzy_contains([("halp", 1.0), ("help", 3.0)], 0.3);
        let (next, pass) = run(&filter, "please help me");
        assert!(pass);

        let hit = next.get::<FuzzyContainsMatch>().unwrap();
        let order: Vec<_> = hit
            .matched_keywords
            .iter()
            .map(|h| h.keyword.as_str())
            .collect();
        assert_eq!(order, ["help", "halp"]);
        assert_eq!(hit.keyword_scores[0].keyword, "halp");
        assert_eq!(hit.min_score, 0.0);
        assert_eq!(hit.max_score, 0.25);
        assert_eq!(hit.weighted_score, 0.0625);
    }

    #[test]
    fn test_require_all_match() {
        let any = fuzzy_contains(["help", "xyz"], 0.3);
        let (next, pass) = run(&any, "please help me");
        assert!(pass);
        let hit = next.get::<FuzzyContainsMatch>().unwrap();
        assert!(!hit.keyword_scores[1].matched);
        assert_eq!(hit.max_score, 1.0);

        let all = fuzzy_contains(["help", "xyz"], 0.3).require_all_match(true);
        assert!(!run(&all, "please help me").1);
    }

    #[test]
    fn test_case_and_location() {
        assert!(run(&fuzzy_contains(["help"], 0.0), "HELP").1);
        assert!(!run(&fuzzy_contains(["help"], 0.0).case_sensitive(true), "HELP").1);

        let late = format!("{}help", "a".repeat(LOCATION_WINDOW + 10));
        assert!(run(&fuzzy_contains(["help"], 0.0), &late).1);
        assert!(
            !run(&fuzzy_contains(["help"], 0.0).location_sensitive(true), &late).1
        );
    }

    #[test]
    fn test_fuzzy_rejects_without_message_or_keywords() {
        let ctx = Context::new(notice(), MockBot::boxed("10001"));
        let (next, pass) = block_on(fuzzy_contains(["help"], 0.5).process(ctx)).unwrap();
        assert!(!pass);
        assert!(!next.contains::<FuzzyContainsMatch>());

        let empty = fuzzy_contains(Vec::<WeightedKeyword>::new(), 0.5);
        assert!(!run(&empty, "help").1);
    }

    #[test]
    fn test_non_finite_weight_defaults() {
        assert_eq!(WeightedKeyword::new("a", f64::NAN).weight, 1.0);
        assert_eq!(WeightedKeyword::from(("b", 2.5)).weight, 2.5);
    }
}
