//! Filter middlewares.
//!
//! Text filters read the event's message through
//! [`Messageable::plain_text`](sakiko_core::Messageable::plain_text). An event
//! without a message fails every text filter. On a match, the filter extends
//! the context with a typed result that the action can read back:
//!
//! ```rust,ignore
//! on::<MessageEvent>()
//!     .with(starts_with(["/echo "], true))
//!     .handle(|ctx| async move {
//!         let hit = ctx.get::<StartsWithMatch>().unwrap();
//!         println!("echo: {}", hit.rest);
//!     })
//!     .commit(&bus)?;
//! ```
//!
//! | Filter | Extension |
//! |--------|-----------|
//! | [`starts_with`] | [`StartsWithMatch`] |
//! | [`ends_with`] | [`EndsWithMatch`] |
//! | [`full_match`] | [`FullMatch`] |
//! | [`contains`] | [`ContainsMatch`] |
//! | [`regex`] | [`RegexMatch`] |
//! | [`fuzzy_contains`](crate::fuzzy_contains) | [`FuzzyContainsMatch`](crate::FuzzyContainsMatch) |
//! | [`event_type`], [`from_bot`] | none |

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use sakiko_core::{Context, EventType, HandlerResult, Middleware};
use tracing::trace;

use crate::error::{FilterError, FilterResult};

// ============================================================================
// Match results
// ============================================================================

/// Set by [`starts_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartsWithMatch {
    /// The configured prefix that matched.
    pub prefix: String,
    /// Text after the prefix, in its original case.
    pub rest: String,
    pub case_sensitive: bool,
}

/// Set by [`ends_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndsWithMatch {
    /// The configured suffix that matched.
    pub suffix: String,
    /// Text before the suffix, in its original case.
    pub rest: String,
    pub case_sensitive: bool,
}

/// Set by [`full_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullMatch {
    pub text: String,
    pub case_sensitive: bool,
}

/// Set by [`contains`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainsMatch {
    pub keyword: String,
    pub case_sensitive: bool,
}

/// Set by [`regex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexMatch {
    /// The whole match.
    pub matched: String,
    /// Every capture group in order, group 0 first. Unmatched groups are `None`.
    pub groups: Vec<Option<String>>,
    /// Named groups that participated in the match.
    pub named: HashMap<String, String>,
}

// ============================================================================
// Text filters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextRule {
    StartsWith,
    EndsWith,
    FullMatch,
    Contains,
}

/// Middleware behind the plain-text filters.
#[derive(Debug, Clone)]
pub struct TextFilter {
    rule: TextRule,
    patterns: Vec<String>,
    case_sensitive: bool,
}

impl TextFilter {
    fn new<I, S>(rule: TextRule, patterns: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rule,
            patterns: patterns.into_iter().map(Into::into).collect(),
            case_sensitive,
        }
    }

    /// Configured patterns, in the order they are tried.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    fn apply(&self, ctx: &Context, text: &str) -> Option<Context> {
        let cs = self.case_sensitive;
        for pattern in &self.patterns {
            let extended = match self.rule {
                TextRule::StartsWith => strip_prefix(text, pattern, cs).map(|rest| {
                    ctx.with(StartsWithMatch {
                        prefix: pattern.clone(),
                        rest: rest.to_string(),
                        case_sensitive: cs,
                    })
                }),
                TextRule::EndsWith => strip_suffix(text, pattern, cs).map(|rest| {
                    ctx.with(EndsWithMatch {
                        suffix: pattern.clone(),
                        rest: rest.to_string(),
                        case_sensitive: cs,
                    })
                }),
                TextRule::FullMatch => equals(text, pattern, cs).then(|| {
                    ctx.with(FullMatch {
                        text: pattern.clone(),
                        case_sensitive: cs,
                    })
                }),
                TextRule::Contains => includes(text, pattern, cs).then(|| {
                    ctx.with(ContainsMatch {
                        keyword: pattern.clone(),
                        case_sensitive: cs,
                    })
                }),
            };
            if extended.is_some() {
                return extended;
            }
        }
        None
    }
}

#[async_trait]
impl Middleware for TextFilter {
    async fn process(&self, ctx: Context) -> HandlerResult<(Context, bool)> {
        let Some(text) = ctx.plain_text() else {
            trace!(rule = ?self.rule, "Event carries no message");
            return Ok((ctx, false));
        };
        match self.apply(&ctx, &text) {
            Some(next) => Ok((next, true)),
            None => Ok((ctx, false)),
        }
    }
}

/// Passes when the message starts with any of `prefixes`, tried in order.
pub fn starts_with<I, S>(prefixes: I, case_sensitive: bool) -> TextFilter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TextFilter::new(TextRule::StartsWith, prefixes, case_sensitive)
}

/// Passes when the message ends with any of `suffixes`, tried in order.
pub fn ends_with<I, S>(suffixes: I, case_sensitive: bool) -> TextFilter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TextFilter::new(TextRule::EndsWith, suffixes, case_sensitive)
}

/// Passes when the whole message equals one of `texts`.
pub fn full_match<I, S>(texts: I, case_sensitive: bool) -> TextFilter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TextFilter::new(TextRule::FullMatch, texts, case_sensitive)
}

/// Passes when the message contains any of `keywords`.
pub fn contains<I, S>(keywords: I, case_sensitive: bool) -> TextFilter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TextFilter::new(TextRule::Contains, keywords, case_sensitive)
}

// Case folding uses `char::to_lowercase`, so the returned slices always sit on
// char boundaries of the original text.

fn strip_prefix<'a>(text: &'a str, prefix: &str, case_sensitive: bool) -> Option<&'a str> {
    if case_sensitive {
        return text.strip_prefix(prefix);
    }
    let target = prefix.to_lowercase();
    if target.is_empty() {
        return Some(text);
    }
    // A char may fold into several, so the folded text can run past the
    // target inside a single char.
    let mut folded = String::new();
    for (i, c) in text.char_indices() {
        folded.extend(c.to_lowercase());
        if folded.len() >= target.len() {
            return folded
                .starts_with(&target)
                .then(|| &text[i + c.len_utf8()..]);
        }
    }
    None
}

fn strip_suffix<'a>(text: &'a str, suffix: &str, case_sensitive: bool) -> Option<&'a str> {
    if case_sensitive {
        return text.strip_suffix(suffix);
    }
    let target = suffix.to_lowercase();
    if target.is_empty() {
        return Some(text);
    }
    let mut folded = String::new();
    for (i, c) in text.char_indices().rev() {
        let lower: String = c.to_lowercase().collect();
        folded.insert_str(0, &lower);
        if folded.len() >= target.len() {
            return folded.ends_with(&target).then(|| &text[..i]);
        }
    }
    None
}

fn equals(text: &str, pattern: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        text == pattern
    } else {
        text.to_lowercase() == pattern.to_lowercase()
    }
}

fn includes(text: &str, pattern: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        text.contains(pattern)
    } else {
        text.to_lowercase().contains(&pattern.to_lowercase())
    }
}

// ============================================================================
// Regex filter
// ============================================================================

/// Middleware behind [`regex`].
#[derive(Debug, Clone)]
pub struct RegexFilter {
    regex: Regex,
}

impl RegexFilter {
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Passes when `pattern` matches anywhere in the message.
///
/// Fails immediately if the pattern does not compile.
pub fn regex(pattern: &str) -> FilterResult<RegexFilter> {
    let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(RegexFilter { regex })
}

#[async_trait]
impl Middleware for RegexFilter {
    async fn process(&self, ctx: Context) -> HandlerResult<(Context, bool)> {
        let Some(text) = ctx.plain_text() else {
            return Ok((ctx, false));
        };
        let Some(caps) = self.regex.captures(&text) else {
            return Ok((ctx, false));
        };

        let groups = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        let named = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| Some((name.to_string(), caps.name(name)?.as_str().to_string())))
            .collect();
        let matched = caps
            .get(0)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let next = ctx.with(RegexMatch {
            matched,
            groups,
            named,
        });
        Ok((next, true))
    }
}

// ============================================================================
// Event filters
// ============================================================================

/// Middleware behind [`event_type`].
#[derive(Debug, Clone, Copy)]
pub struct EventTypeFilter {
    expected: EventType,
}

/// Passes events whose [`EventType`] is `expected`.
pub fn event_type(expected: EventType) -> EventTypeFilter {
    EventTypeFilter { expected }
}

#[async_trait]
impl Middleware for EventTypeFilter {
    async fn process(&self, ctx: Context) -> HandlerResult<(Context, bool)> {
        let pass = ctx.event().event_type() == self.expected;
        Ok((ctx, pass))
    }
}

/// Middleware behind [`from_bot`].
#[derive(Debug, Clone)]
pub struct FromBotFilter {
    self_id: String,
}

/// Passes events received by the bot with account id `self_id`.
pub fn from_bot(self_id: impl Into<String>) -> FromBotFilter {
    FromBotFilter {
        self_id: self_id.into(),
    }
}

#[async_trait]
impl Middleware for FromBotFilter {
    async fn process(&self, ctx: Context) -> HandlerResult<(Context, bool)> {
        let pass = ctx.bot().self_id() == self.self_id;
        Ok((ctx, pass))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBot, notice, text_message};
    use tokio_test::block_on;

    fn run<M: Middleware>(filter: &M, ctx: Context) -> (Context, bool) {
        block_on(filter.process(ctx)).unwrap()
    }

    fn ctx(text: &str) -> Context {
        Context::new(text_message(text), MockBot::boxed("10001"))
    }

    #[test]
    fn test_starts_with() {
        let filter = starts_with(["/help", "/echo "], true);

        let (next, pass) = run(&filter, ctx("/echo Hello"));
        assert!(pass);
        assert_eq!(
            next.get::<StartsWithMatch>(),
            Some(&StartsWithMatch {
                prefix: "/echo ".into(),
                rest: "Hello".into(),
                case_sensitive: true,
            })
        );

        let (next, pass) = run(&filter, ctx("/ECHO Hello"));
        assert!(!pass);
        assert!(!next.contains::<StartsWithMatch>());
    }

    #[test]
    fn test_starts_with_ignoring_case_keeps_original_rest() {
        let filter = starts_with(["/echo "], false);
        let (next, pass) = run(&filter, ctx("/ECHO MiXeD"));
        assert!(pass);
        assert_eq!(next.get::<StartsWithMatch>().map(|m| m.rest.as_str()), Some("MiXeD"));
    }

    #[test]
    fn test_ends_with() {
        let filter = ends_with(["?", "？"], true);
        let (next, pass) = run(&filter, ctx("你好？"));
        assert!(pass);
        let hit = next.get::<EndsWithMatch>().unwrap();
        assert_eq!(hit.suffix, "？");
        assert_eq!(hit.rest, "你好");

        let filter = ends_with(["PLEASE"], false);
        let (next, pass) = run(&filter, ctx("help please"));
        assert!(pass);
        assert_eq!(next.get::<EndsWithMatch>().unwrap().rest, "help ");
    }

    #[test]
    fn test_full_match() {
        let filter = full_match(["ping"], false);
        assert!(run(&filter, ctx("PING")).1);
        assert!(!run(&filter, ctx("ping!")).1);

        let strict = full_match(["ping"], true);
        assert!(!run(&strict, ctx("PING")).1);
    }

    #[test]
    fn test_contains_first_keyword_wins() {
        let filter = contains(["cat", "dog"], true);
        let (next, pass) = run(&filter, ctx("dog and cat"));
        assert!(pass);
        assert_eq!(next.get::<ContainsMatch>().unwrap().keyword, "cat");
    }

    #[test]
    fn test_regex_groups() {
        let filter = regex(r"roll (?P<count>\d+)d(\d+)(x)?").unwrap();
        let (next, pass) = run(&filter, ctx("please roll 2d6 now"));
        assert!(pass);

        let hit = next.get::<RegexMatch>().unwrap();
        assert_eq!(hit.matched, "roll 2d6");
        assert_eq!(
            hit.groups,
            vec![
                Some("roll 2d6".to_string()),
                Some("2".to_string()),
                Some("6".to_string()),
                None,
            ]
        );
        assert_eq!(hit.named.get("count").map(String::as_str), Some("2"));

        assert!(!run(&filter, ctx("no dice")).1);
    }

    #[test]
    fn test_invalid_regex_fails_at_construction() {
        let err = regex("(unclosed").unwrap_err();
        assert!(matches!(err, FilterError::InvalidPattern { .. }));
    }

    #[test]
    fn test_text_filters_reject_events_without_message() {
        let ctx = Context::new(notice(), MockBot::boxed("10001"));
        assert!(!run(&starts_with([""], true), ctx.clone()).1);
        assert!(!run(&contains([""], true), ctx.clone()).1);
        assert!(!run(&regex(".*").unwrap(), ctx).1);
    }

    #[test]
    fn test_event_type_and_from_bot() {
        let message = ctx("hi");
        assert!(run(&event_type(EventType::Message), message.clone()).1);
        assert!(!run(&event_type(EventType::Notice), message.clone()).1);

        assert!(run(&from_bot("10001"), message.clone()).1);
        assert!(!run(&from_bot("10002"), message).1);
    }

    #[test]
    fn test_case_folding_helpers() {
        assert_eq!(strip_prefix("ÄBC", "äb", false), Some("C"));
        assert_eq!(strip_prefix("ab", "abc", false), None);
        assert_eq!(strip_suffix("xyZ", "YZ", false), Some("x"));
        assert_eq!(strip_suffix("z", "yz", false), None);
    }

    #[test]
    fn test_prefix_agrees_with_contains_on_expanding_fold() {
        // 'İ' lowercases to "i\u{307}", which is longer than the char itself.
        assert_eq!(strip_prefix("İstanbul", "i", false), Some("stanbul"));
        assert!(includes("İstanbul", "i", false));
        assert_eq!(strip_suffix("xİ", "i\u{307}", false), Some("x"));
        assert_eq!(strip_prefix("İstanbul", "x", false), None);

        assert!(run(&starts_with(["i"], false), ctx("İstanbul")).1);
        assert!(run(&contains(["i"], false), ctx("İstanbul")).1);
    }
}
