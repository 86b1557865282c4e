//! Pattern matcher and match engine (legacy path)
//!
//! A [`PatternMatcher`] is a compiled regex with a priority, a derived
//! complexity score, an optional validator and a transformer. The
//! [`MatchEngine`] ranks matchers and replaces validated, non-overlapping
//! matches.

pub mod builtin;
pub mod engine;
pub mod pattern;

pub use builtin::builtin_matchers;
pub use engine::{Match, MatchEngine, MASK_MARKER};
pub use pattern::{complexity_score, PatternMatcher, Transformer, Validator};
