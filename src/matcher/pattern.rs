//! Compiled pattern matcher

use crate::error::{Error, Result};
use crate::text::mask::{mask_all, DEFAULT_MASK};
use regex::Regex;
use std::ops::Range;
use std::sync::Arc;

/// Post-match check; a match failing it is left untouched.
pub type Validator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Produces the replacement for a match. Must be deterministic and
/// idempotent on its own output.
pub type Transformer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Name of the capture group that narrows the replaced span.
pub const VALUE_GROUP: &str = "value";

/// A named, prioritized regex with optional validation and a transformer.
#[derive(Clone)]
pub struct PatternMatcher {
    name: String,
    kind: String,
    pattern: Regex,
    priority: i32,
    complexity: u32,
    validator: Option<Validator>,
    transformer: Transformer,
    digit_boundary: bool,
}

impl PatternMatcher {
    /// Compile a matcher. The default transformer masks every
    /// non-whitespace char.
    pub fn new(name: impl Into<String>, kind: impl Into<String>, pattern: &str) -> Result<Self> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            name: name.clone(),
            source,
        })?;
        Ok(Self {
            name,
            kind: kind.into(),
            complexity: complexity_score(pattern),
            pattern: regex,
            priority: 0,
            validator: None,
            transformer: Arc::new(|s: &str| mask_all(s, DEFAULT_MASK)),
            digit_boundary: false,
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_validator(mut self, f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn with_transformer(
        mut self,
        f: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.transformer = Arc::new(f);
        self
    }

    /// Reject matches directly preceded or followed by an ASCII digit.
    pub fn with_digit_boundary(mut self) -> Self {
        self.digit_boundary = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sensitive-data type this matcher detects.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn complexity(&self) -> u32 {
        self.complexity
    }

    /// Pattern source.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Run the validator, if any.
    pub fn validate(&self, candidate: &str) -> bool {
        self.validator.as_ref().map_or(true, |v| v(candidate))
    }

    /// Apply the transformer.
    pub fn transform(&self, candidate: &str) -> String {
        (self.transformer)(candidate)
    }

    /// Candidate spans in `text`, before validation.
    ///
    /// When the pattern has a `value` group, only that group is the span.
    pub fn find_spans(&self, text: &str) -> Vec<Range<usize>> {
        let has_value_group = self
            .pattern
            .capture_names()
            .any(|n| n == Some(VALUE_GROUP));

        let spans: Vec<Range<usize>> = if has_value_group {
            self.pattern
                .captures_iter(text)
                .filter_map(|caps| caps.name(VALUE_GROUP).map(|m| m.range()))
                .collect()
        } else {
            self.pattern.find_iter(text).map(|m| m.range()).collect()
        };

        if !self.digit_boundary {
            return spans;
        }
        spans
            .into_iter()
            .filter(|r| {
                let before = text[..r.start].chars().next_back();
                let after = text[r.end..].chars().next();
                !before.is_some_and(|c| c.is_ascii_digit())
                    && !after.is_some_and(|c| c.is_ascii_digit())
            })
            .collect()
    }
}

impl std::fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("pattern", &self.pattern.as_str())
            .field("priority", &self.priority)
            .field("complexity", &self.complexity)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

/// Heuristic specificity score of a regex source.
///
/// Character classes (bracketed or `\d`-style shorthands) count 3 each,
/// quantifiers 4, capture groups 5, escaped literal specials 2, and any
/// lookaround adds a flat 10.
pub fn complexity_score(pattern: &str) -> u32 {
    let chars: Vec<char> = pattern.chars().collect();
    let mut classes = 0u32;
    let mut quantifiers = 0u32;
    let mut captures = 0u32;
    let mut literals = 0u32;
    let mut in_class = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                if "dDwWsSpP".contains(next) {
                    if !in_class {
                        classes += 1;
                    }
                } else if r".-+*?()[]{}|^$\/".contains(next) {
                    literals += 1;
                }
            }
            i += 2;
            continue;
        }
        if in_class {
            if c == ']' {
                in_class = false;
            }
            i += 1;
            continue;
        }
        match c {
            '[' => {
                classes += 1;
                in_class = true;
                // a leading ']' or '^]' is literal
                if chars.get(i + 1) == Some(&'^') {
                    i += 1;
                }
                if chars.get(i + 1) == Some(&']') {
                    i += 1;
                }
            }
            '(' => {
                if chars.get(i + 1) != Some(&'?') {
                    captures += 1;
                } else if matches!(chars.get(i + 2), Some('P') | Some('<'))
                    && !matches!(chars.get(i + 3), Some('=') | Some('!'))
                {
                    captures += 1;
                }
            }
            '*' | '+' => quantifiers += 1,
            '?' => {
                // `(?` opens a group; `+?` / `*?` / `??` are lazy modifiers
                let prev = if i > 0 { chars[i - 1] } else { ' ' };
                if prev != '(' && !matches!(prev, '*' | '+' | '?' | '}') {
                    quantifiers += 1;
                }
            }
            '{' => {
                let close = chars[i..].iter().position(|&ch| ch == '}');
                if let Some(offset) = close {
                    let body: String = chars[i + 1..i + offset].iter().collect();
                    if !body.is_empty() && body.chars().all(|ch| ch.is_ascii_digit() || ch == ',') {
                        quantifiers += 1;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    let lookaround = ["(?=", "(?!", "(?<=", "(?<!"]
        .iter()
        .any(|l| pattern.contains(l));

    classes * 3 + quantifiers * 4 + captures * 5 + literals * 2 + if lookaround { 10 } else { 0 }
}
