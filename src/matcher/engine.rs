//! Ordered pattern matching over text
//!
//! Matchers are ranked by complexity score, then priority (both
//! descending). Detection walks the ranked list and lets each matcher claim
//! spans; a later matcher cannot claim a span overlapping an earlier claim.
//!
//! ```text
//! text ──► [id_card 60] ──► [bank_card 50] ──► [email 27] ──► [phone 10] ──► matches
//!               │ claims           │ skips overlaps
//! ```

use super::pattern::PatternMatcher;
use crate::error::{Error, Result};
use crate::text::{apply_edits, Edit};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

/// Existing mask run. Detection skips text containing one; the plugin
/// pre-pass only skips matches that touch one.
pub const MASK_MARKER: &str = "****";

/// A validated match found in text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    /// Sensitive-data type
    pub kind: String,
    /// Matcher that produced the match
    pub matcher: String,
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Raw matched text (never serialized)
    #[serde(skip)]
    pub text: String,
    /// Transformer output for the match
    pub masked: String,
    /// Matcher priority
    pub priority: i32,
}

impl Match {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Ranked collection of [`PatternMatcher`]s.
#[derive(Debug, Default, Clone)]
pub struct MatchEngine {
    matchers: Vec<Arc<PatternMatcher>>,
}

impl MatchEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the built-in matchers.
    pub fn with_builtin() -> Self {
        let mut engine = Self::new();
        for matcher in super::builtin::builtin_matchers() {
            engine.insert_sorted(Arc::new(matcher));
        }
        engine
    }

    /// Add a matcher. Fails without mutation if the name is taken.
    pub fn add_matcher(&mut self, matcher: PatternMatcher) -> Result<()> {
        if matcher.name().is_empty() {
            return Err(Error::Config("matcher name must not be empty".to_string()));
        }
        if self.get(matcher.name()).is_some() {
            return Err(Error::Config(format!(
                "matcher '{}' already registered",
                matcher.name()
            )));
        }
        tracing::debug!(
            matcher = matcher.name(),
            kind = matcher.kind(),
            complexity = matcher.complexity(),
            "Matcher added"
        );
        self.insert_sorted(Arc::new(matcher));
        Ok(())
    }

    /// Compile and add a pattern. An invalid regex leaves the engine as is.
    pub fn add_pattern(&mut self, name: &str, kind: &str, pattern: &str, priority: i32) -> Result<()> {
        let matcher = PatternMatcher::new(name, kind, pattern)?.with_priority(priority);
        self.add_matcher(matcher)
    }

    /// Replace an existing matcher of the same name.
    pub fn update_matcher(&mut self, matcher: PatternMatcher) -> Result<()> {
        let Some(pos) = self.position(matcher.name()) else {
            return Err(Error::Validation(format!(
                "matcher '{}' not found",
                matcher.name()
            )));
        };
        self.matchers.remove(pos);
        self.insert_sorted(Arc::new(matcher));
        Ok(())
    }

    /// Remove a matcher by name. Returns whether it existed.
    pub fn remove_matcher(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(pos) => {
                self.matchers.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&PatternMatcher> {
        self.matchers
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    /// Matcher names in ranking order.
    pub fn matcher_names(&self) -> Vec<String> {
        self.matchers.iter().map(|m| m.name().to_string()).collect()
    }

    /// Distinct kinds, in ranking order of first appearance.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = Vec::new();
        for m in &self.matchers {
            if !kinds.iter().any(|k| k == m.kind()) {
                kinds.push(m.kind().to_string());
            }
        }
        kinds
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.matchers.iter().any(|m| m.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// All validated, non-overlapping matches, ordered by position.
    pub fn detect_all(&self, text: &str) -> Vec<Match> {
        if self.is_passthrough(text) {
            return Vec::new();
        }
        Self::claim(self.matchers.iter().map(|m| m.as_ref()), text)
    }

    /// Matches of a single kind.
    pub fn search_by_type(&self, text: &str, kind: &str) -> Vec<Match> {
        if self.is_passthrough(text) {
            return Vec::new();
        }
        Self::claim(
            self.matchers
                .iter()
                .filter(|m| m.kind() == kind)
                .map(|m| m.as_ref()),
            text,
        )
    }

    /// Replace every match with its transformer output.
    pub fn replace_all_types(&self, text: &str) -> String {
        Self::replace(text, self.detect_all(text))
    }

    /// Replace only matches of `kind`.
    pub fn replace_by_type(&self, text: &str, kind: &str) -> String {
        Self::replace(text, self.search_by_type(text, kind))
    }

    /// Replace matches of any kind in `kinds`, claiming spans in one pass.
    ///
    /// Partially masked text is still scanned; only matches overlapping an
    /// existing mask run are left alone.
    pub fn replace_kinds(&self, text: &str, kinds: &[String]) -> String {
        if kinds.is_empty() || self.is_rule_token(text) {
            return text.to_string();
        }
        let runs = mask_runs(text);
        let matches = Self::claim(
            self.matchers
                .iter()
                .filter(|m| kinds.iter().any(|k| k == m.kind()))
                .map(|m| m.as_ref()),
            text,
        )
        .into_iter()
        .filter(|m| !runs.iter().any(|r| m.start < r.end && r.start < m.end))
        .collect();
        Self::replace(text, matches)
    }

    /// Matches grouped by kind.
    pub fn detect_grouped(&self, text: &str) -> HashMap<String, Vec<Match>> {
        let mut grouped: HashMap<String, Vec<Match>> = HashMap::new();
        for m in self.detect_all(text) {
            grouped.entry(m.kind.clone()).or_default().push(m);
        }
        grouped
    }

    /// Already masked, or a bare rule-name token.
    fn is_passthrough(&self, text: &str) -> bool {
        text.contains(MASK_MARKER) || self.is_rule_token(text)
    }

    fn is_rule_token(&self, text: &str) -> bool {
        let trimmed = text.trim();
        self.matchers.iter().any(|m| {
            trimmed == m.name()
                || (trimmed.len() == m.name().len() + 2
                    && trimmed.starts_with('[')
                    && trimmed.ends_with(']')
                    && &trimmed[1..trimmed.len() - 1] == m.name())
        })
    }

    fn claim<'a>(matchers: impl Iterator<Item = &'a PatternMatcher>, text: &str) -> Vec<Match> {
        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut found = Vec::new();

        for matcher in matchers {
            for span in matcher.find_spans(text) {
                if claimed
                    .iter()
                    .any(|c| span.start < c.end && c.start < span.end)
                {
                    continue;
                }
                let candidate = &text[span.clone()];
                if !matcher.validate(candidate) {
                    continue;
                }
                claimed.push(span.clone());
                found.push(Match {
                    kind: matcher.kind().to_string(),
                    matcher: matcher.name().to_string(),
                    start: span.start,
                    end: span.end,
                    text: candidate.to_string(),
                    masked: matcher.transform(candidate),
                    priority: matcher.priority(),
                });
            }
        }

        found.sort_by_key(|m| m.start);
        found
    }

    fn replace(text: &str, matches: Vec<Match>) -> String {
        let edits = matches
            .into_iter()
            .map(|m| Edit {
                range: m.start..m.end,
                with: m.masked,
            })
            .collect();
        apply_edits(text, edits)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.matchers.iter().position(|m| m.name() == name)
    }

    /// Stable insert: complexity desc, then priority desc.
    fn insert_sorted(&mut self, matcher: Arc<PatternMatcher>) {
        self.matchers.push(matcher);
        self.matchers.sort_by(|a, b| {
            b.complexity()
                .cmp(&a.complexity())
                .then(b.priority().cmp(&a.priority()))
        });
    }
}

/// Byte ranges of `*` runs at least as long as [`MASK_MARKER`].
fn mask_runs(text: &str) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, b) in text.bytes().enumerate() {
        match (b == b'*', start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= MASK_MARKER.len() {
                    runs.push(s..i);
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if text.len() - s >= MASK_MARKER.len() {
            runs.push(s..text.len());
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- registration ----

    #[test]
    fn test_add_duplicate_matcher() {
        let mut engine = MatchEngine::new();
        engine.add_pattern("digits", "num", r"\d+", 0).unwrap();
        let err = engine.add_pattern("digits", "num", r"\d{2}", 0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_invalid_pattern_no_mutation() {
        let mut engine = MatchEngine::new();
        assert!(engine.add_pattern("bad", "x", "[unclosed", 0).is_err());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_ordering_by_complexity_then_priority() {
        let mut engine = MatchEngine::new();
        engine.add_pattern("low", "a", r"abc", 1).unwrap();
        engine.add_pattern("high", "b", r"abc", 5).unwrap();
        engine.add_pattern("complex", "c", r"[a-c]+", 0).unwrap();
        assert_eq!(engine.matcher_names(), vec!["complex", "high", "low"]);
    }

    #[test]
    fn test_update_and_remove() {
        let mut engine = MatchEngine::new();
        engine.add_pattern("tok", "token", r"tok_\w+", 0).unwrap();
        let updated = PatternMatcher::new("tok", "token", r"tok_[a-z]+")
            .unwrap()
            .with_priority(9);
        engine.update_matcher(updated).unwrap();
        assert_eq!(engine.get("tok").unwrap().priority(), 9);

        let missing = PatternMatcher::new("nope", "x", "x").unwrap();
        assert!(engine.update_matcher(missing).is_err());

        assert!(engine.remove_matcher("tok"));
        assert!(!engine.remove_matcher("tok"));
    }

    // ---- detection ----

    #[test]
    fn test_claimed_spans_block_overlaps() {
        let mut engine = MatchEngine::new();
        engine.add_pattern("long", "long", r"[0-9]{6}", 0).unwrap();
        engine.add_pattern("short", "short", r"345", 0).unwrap();
        let matches = engine.detect_all("x123456y");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matcher, "long");
    }

    #[test]
    fn test_failed_validation_leaves_span() {
        let mut engine = MatchEngine::new();
        let m = PatternMatcher::new("even", "num", r"\d+")
            .unwrap()
            .with_validator(|s| s.len() % 2 == 0);
        engine.add_matcher(m).unwrap();
        assert_eq!(engine.replace_all_types("a 123 b 1234"), "a 123 b ****");
    }

    #[test]
    fn test_passthrough_guards() {
        let engine = MatchEngine::with_builtin();
        let masked = "138****5678";
        assert_eq!(engine.replace_all_types(masked), masked);
        assert_eq!(engine.replace_all_types("phone"), "phone");
        assert_eq!(engine.replace_all_types("[email]"), "[email]");
    }

    #[test]
    fn test_search_and_replace_by_type() {
        let engine = MatchEngine::with_builtin();
        let text = "tel 13812345678 mail alice@example.com";
        let phones = engine.search_by_type(text, "phone");
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].text, "13812345678");

        let out = engine.replace_by_type(text, "email");
        assert!(out.contains("13812345678"));
        assert!(out.contains("al*ce@example.com"));
    }

    #[test]
    fn test_replace_kinds_single_pass() {
        let mut engine = MatchEngine::new();
        engine.add_pattern("a", "a", r"A\d", 0).unwrap();
        engine.add_pattern("b", "b", r"B\d", 0).unwrap();
        engine.add_pattern("c", "c", r"C\d", 0).unwrap();
        let out = engine.replace_kinds("A1 B2 C3", &["a".to_string(), "b".to_string()]);
        assert_eq!(out, "** ** C3");
        assert_eq!(engine.replace_kinds("A1", &[]), "A1");
    }

    #[test]
    fn test_replace_kinds_scans_partially_masked_text() {
        let engine = MatchEngine::with_builtin();
        let kinds = vec!["password".to_string(), "api_key".to_string()];
        let text = "card 6225****4324 password=hunter2 key sk-abcdefghijklmnop1234";
        let out = engine.replace_kinds(text, &kinds);
        assert!(out.starts_with("card 6225****4324 "), "{out}");
        assert!(!out.contains("hunter2"), "{out}");
        assert!(!out.contains("abcdefghijklmnop"), "{out}");

        // a match touching an existing mask run is left as is
        assert_eq!(engine.replace_kinds("password=****", &kinds), "password=****");
    }

    #[test]
    fn test_mask_runs() {
        assert_eq!(mask_runs("a****b**c*****"), vec![1..5, 9..14]);
        assert!(mask_runs("***").is_empty());
    }

    #[test]
    fn test_grouped_detection() {
        let engine = MatchEngine::with_builtin();
        let grouped = engine.detect_grouped("13812345678 and 13912345678");
        assert_eq!(grouped.get("phone").map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_match_serialization_omits_raw_text() {
        let engine = MatchEngine::with_builtin();
        let matches = engine.detect_all("13812345678");
        let json = serde_json::to_string(&matches).unwrap();
        assert!(json.contains("138****5678"));
        assert!(!json.contains("13812345678"));
    }
}
