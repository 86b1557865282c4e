//! Shared text algorithms
//!
//! Normalization, validators and masking conventions used by both the
//! legacy matcher path and the desensitizer family. Validation code (Luhn,
//! ID checksum, date checks) lives here once and is reused everywhere.

pub mod fallback;
pub mod mask;
pub mod normalize;
pub mod validate;

pub use normalize::{
    digits_only, is_invisible, normalize, permissive_runs, strict_runs, strip_invisible,
    DigitRun, Normalized, PROCESSED_MARKER,
};

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Compile a fixed pattern once.
///
/// Returns `None` only if the pattern does not compile; callers treat that
/// as "nothing matches" rather than panicking.
pub(crate) fn compiled(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// A replacement of `range` (in the original text) by `with`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Byte range in the original text
    pub range: Range<usize>,
    /// Replacement text
    pub with: String,
}

/// Apply non-overlapping edits to `text`.
///
/// Edits are sorted by start offset; an edit overlapping an earlier one is
/// dropped.
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    if edits.is_empty() {
        return text.to_string();
    }
    edits.sort_by_key(|e| e.range.start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor || edit.range.end > text.len() {
            continue;
        }
        out.push_str(&text[cursor..edit.range.start]);
        out.push_str(&edit.with);
        cursor = edit.range.end;
    }
    out.push_str(&text[cursor..]);
    out
}
