//! Evasion-resistant normalization
//!
//! Builds a normalized *view* of the input for detection and validation.
//! Replacements are always applied to the original text, so the view keeps
//! a byte mapping from each normalized char back to its original span.
//!
//! Normalization steps:
//! - strip zero-width and invisible format characters (ZWSP, ZWNJ, ZWJ,
//!   BOM, word joiner, bidi controls, non-whitespace control code points)
//! - fold full-width digits (U+FF10..U+FF19) to ASCII
//! - fold a fixed set of Cyrillic homoglyphs to their Latin look-alikes

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Appended by the aggressive path when a flagged input needed no change.
///
/// Text ending with this marker is treated as already processed.
pub const PROCESSED_MARKER: char = '\u{2063}';

/// Returns true for zero-width, invisible formatting and control characters.
///
/// Whitespace controls (`\n`, `\r`, `\t`) are not invisible; they separate.
pub fn is_invisible(c: char) -> bool {
    match c {
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => true,
        '\u{00AD}' | '\u{034F}' | '\u{061C}' | '\u{180E}' => true,
        '\u{2061}'..='\u{2064}' => true,
        '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' => true,
        '\u{FE00}'..='\u{FE0F}' | '\u{E0000}'..='\u{E007F}' => true,
        '\n' | '\r' | '\t' => false,
        _ => c.is_control(),
    }
}

/// Fold a full-width digit to ASCII, if it is one.
pub fn fold_fullwidth_digit(c: char) -> Option<char> {
    if ('\u{FF10}'..='\u{FF19}').contains(&c) {
        char::from_u32('0' as u32 + (c as u32 - 0xFF10))
    } else {
        None
    }
}

/// Returns true for ASCII or full-width decimal digits.
pub fn is_any_digit(c: char) -> bool {
    c.is_ascii_digit() || fold_fullwidth_digit(c).is_some()
}

/// Cyrillic code points commonly substituted for Latin letters.
const HOMOGLYPHS: &[(char, char)] = &[
    ('\u{0430}', 'a'),
    ('\u{0435}', 'e'),
    ('\u{043E}', 'o'),
    ('\u{0440}', 'p'),
    ('\u{0441}', 'c'),
    ('\u{0443}', 'y'),
    ('\u{0445}', 'x'),
    ('\u{0455}', 's'),
    ('\u{0456}', 'i'),
    ('\u{0458}', 'j'),
    ('\u{0410}', 'A'),
    ('\u{0412}', 'B'),
    ('\u{0415}', 'E'),
    ('\u{041A}', 'K'),
    ('\u{041C}', 'M'),
    ('\u{041D}', 'H'),
    ('\u{041E}', 'O'),
    ('\u{0420}', 'P'),
    ('\u{0421}', 'C'),
    ('\u{0422}', 'T'),
    ('\u{0425}', 'X'),
];

/// Latin look-alike for a Cyrillic homoglyph.
pub fn fold_homoglyph(c: char) -> Option<char> {
    HOMOGLYPHS
        .iter()
        .find(|(glyph, _)| *glyph == c)
        .map(|(_, latin)| *latin)
}

/// Original span of one normalized char.
#[derive(Debug, Clone, Copy)]
struct CharSpan {
    norm: usize,
    orig_start: usize,
    orig_end: usize,
}

/// Normalized view of a text with a mapping back to the original.
#[derive(Debug, Clone)]
pub struct Normalized<'a> {
    original: &'a str,
    text: String,
    spans: Vec<CharSpan>,
}

impl<'a> Normalized<'a> {
    /// Build the normalized view.
    pub fn new(original: &'a str) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut spans = Vec::with_capacity(original.len());

        for (idx, c) in original.char_indices() {
            if is_invisible(c) {
                continue;
            }
            let folded = fold_fullwidth_digit(c)
                .or_else(|| fold_homoglyph(c))
                .unwrap_or(c);
            spans.push(CharSpan {
                norm: text.len(),
                orig_start: idx,
                orig_end: idx + c.len_utf8(),
            });
            text.push(folded);
        }

        Self {
            original,
            text,
            spans,
        }
    }

    /// The normalized text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The original text.
    pub fn original(&self) -> &'a str {
        self.original
    }

    /// Whether normalization changed anything.
    pub fn changed(&self) -> bool {
        self.text != self.original
    }

    /// Map a byte range of the normalized text to the original text.
    ///
    /// Invisible characters that fall inside the range are included.
    pub fn original_range(&self, norm: Range<usize>) -> Range<usize> {
        if norm.start >= norm.end || self.spans.is_empty() {
            let at = self.original_offset(norm.start);
            return at..at;
        }
        let first = self.span_index(norm.start);
        let last = self.span_index(norm.end - 1);
        self.spans[first].orig_start..self.spans[last].orig_end
    }

    fn original_offset(&self, norm: usize) -> usize {
        if norm >= self.text.len() {
            return self.original.len();
        }
        self.spans[self.span_index(norm)].orig_start
    }

    fn span_index(&self, norm: usize) -> usize {
        match self.spans.binary_search_by(|s| s.norm.cmp(&norm)) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }
}

/// Remove every invisible character.
pub fn strip_invisible(text: &str) -> String {
    text.chars().filter(|c| !is_invisible(*c)).collect()
}

/// Normalize into an owned string (no mapping kept).
pub fn normalize(text: &str) -> String {
    Normalized::new(text).text
}

/// Keep only the digits (full-width folded) and a trailing `X`.
pub fn digits_only(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some(d) = fold_fullwidth_digit(c) {
            out.push(d);
        } else if c.is_ascii_digit() {
            out.push(c);
        } else if c == 'X' || c == 'x' {
            out.push('X');
        }
    }
    out
}

// =============================================================================
// Digit runs
// =============================================================================

/// A run of digits in normalized text, possibly split by separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitRun {
    /// Byte range in the normalized text
    pub range: Range<usize>,
    /// Collapsed digits (a trailing ID checksum `X` is kept as `X`)
    pub digits: String,
    /// Number of separator chars inside the run
    pub separators: usize,
    offsets: Vec<usize>,
}

impl DigitRun {
    /// Number of digit units.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the run has no digits.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Normalized byte range covering digit units `from..to`.
    pub fn sub_range(&self, from: usize, to: usize) -> Range<usize> {
        if from >= to || to > self.offsets.len() {
            return self.range.start..self.range.start;
        }
        self.offsets[from]..self.offsets[to - 1] + 1
    }

    /// Contiguous digit groups (split at separators) as digit-index ranges.
    pub fn groups(&self) -> Vec<Range<usize>> {
        let mut groups = Vec::new();
        let mut start = 0;
        for i in 1..=self.offsets.len() {
            let split = i == self.offsets.len() || self.offsets[i] != self.offsets[i - 1] + 1;
            if split {
                groups.push(start..i);
                start = i;
            }
        }
        groups
    }

    /// Digit-index ranges accepted by `accept`.
    ///
    /// The whole run is tried first. Otherwise consecutive groups are
    /// combined greedily from the left, taking the longest accepted span at
    /// each start, so two numbers joined by a single space are still found.
    pub fn segments_where(&self, accept: impl Fn(&str) -> bool) -> Vec<Range<usize>> {
        if self.is_empty() {
            return Vec::new();
        }
        if accept(&self.digits) {
            return vec![0..self.len()];
        }
        let groups = self.groups();
        let mut out = Vec::new();
        let mut i = 0;
        while i < groups.len() {
            let mut best = None;
            for j in i..groups.len() {
                let span = groups[i].start..groups[j].end;
                if span == (0..self.len()) {
                    continue;
                }
                if accept(&self.digits[span.clone()]) {
                    best = Some((j, span));
                }
            }
            match best {
                Some((j, span)) => {
                    out.push(span);
                    i = j + 1;
                }
                None => i += 1,
            }
        }
        out
    }

    fn from_match(text: &str, range: Range<usize>) -> Self {
        let slice = &text[range.clone()];
        let mut digits = String::with_capacity(slice.len());
        let mut offsets = Vec::with_capacity(slice.len());
        let mut separators = 0;
        for (i, c) in slice.char_indices() {
            if c.is_ascii_digit() {
                digits.push(c);
                offsets.push(range.start + i);
            } else if c == 'X' || c == 'x' {
                digits.push('X');
                offsets.push(range.start + i);
            } else {
                separators += 1;
            }
        }
        Self {
            range,
            digits,
            separators,
            offsets,
        }
    }
}

static STRICT_RUN: OnceLock<Option<Regex>> = OnceLock::new();
static PERMISSIVE_RUN: OnceLock<Option<Regex>> = OnceLock::new();

/// Digit runs joined by at most one space, hyphen or dot.
pub fn strict_runs(normalized: &str) -> Vec<DigitRun> {
    collect_runs(
        super::compiled(&STRICT_RUN, r"[0-9](?:[ \-.]?[0-9])*[Xx]?"),
        normalized,
    )
}

/// Digit runs tolerant of up to three separator chars between digits.
pub fn permissive_runs(normalized: &str) -> Vec<DigitRun> {
    collect_runs(
        super::compiled(&PERMISSIVE_RUN, r"[0-9](?:[\s\-._/()]{0,3}[0-9])*[Xx]?"),
        normalized,
    )
}

fn collect_runs(pattern: Option<&Regex>, text: &str) -> Vec<DigitRun> {
    let Some(pattern) = pattern else {
        return Vec::new();
    };
    pattern
        .find_iter(text)
        .map(|m| {
            let mut end = m.end();
            // A trailing X is only an ID checksum after exactly 17 digits.
            if m.as_str().ends_with(['X', 'x']) {
                let body = &text[m.start()..end - 1];
                let digit_count = body.chars().filter(|c| c.is_ascii_digit()).count();
                let next_is_word = text[end..]
                    .chars()
                    .next()
                    .map(|c| c.is_ascii_alphanumeric())
                    .unwrap_or(false);
                if digit_count != 17 || next_is_word {
                    end -= 1;
                }
            }
            DigitRun::from_match(text, m.start()..end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_zero_width() {
        let n = Normalized::new("138\u{200B}1234\u{200C}5678");
        assert_eq!(n.as_str(), "13812345678");
        assert!(n.changed());
    }

    #[test]
    fn test_fold_fullwidth_digits() {
        let n = Normalized::new("１３８１２３４５６７８");
        assert_eq!(n.as_str(), "13812345678");
    }

    #[test]
    fn test_fold_homoglyphs() {
        // Cyrillic е and о
        let n = Normalized::new("t\u{0435}st@\u{043E}k.com");
        assert_eq!(n.as_str(), "test@ok.com");
    }

    #[test]
    fn test_newline_is_kept() {
        let n = Normalized::new("a\nb\tc");
        assert_eq!(n.as_str(), "a\nb\tc");
        assert!(!n.changed());
    }

    #[test]
    fn test_original_range_spans_invisibles() {
        let original = "x138\u{200B}1234y";
        let n = Normalized::new(original);
        assert_eq!(n.as_str(), "x1381234y");
        let range = n.original_range(1..8);
        assert_eq!(&original[range], "138\u{200B}1234");
    }

    #[test]
    fn test_original_range_multibyte() {
        let original = "手机１３８";
        let n = Normalized::new(original);
        let start = n.as_str().find('1').unwrap();
        let range = n.original_range(start..n.as_str().len());
        assert_eq!(&original[range], "１３８");
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("6222-0212 3456"), "622202123456");
        assert_eq!(digits_only("１２x"), "12X");
    }

    // ---- runs ----

    #[test]
    fn test_strict_runs_single_separator() {
        let runs = strict_runs("call 138-1234-5678 now");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].digits, "13812345678");
        assert_eq!(runs[0].separators, 2);
    }

    #[test]
    fn test_strict_runs_split_on_double_separator() {
        let runs = strict_runs("138 - 1234");
        assert_eq!(runs.len(), 2);
    }

    #[test]
    fn test_permissive_runs_join_wide_separators() {
        let runs = permissive_runs("138 - 1234 - 5678");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].digits, "13812345678");
    }

    #[test]
    fn test_trailing_x_only_after_17_digits() {
        let runs = strict_runs("11010119900307123X");
        assert_eq!(runs[0].digits, "11010119900307123X");

        let runs = strict_runs("10x faster");
        assert_eq!(runs[0].digits, "10");
    }

    #[test]
    fn test_groups_and_segments() {
        let runs = strict_runs("13812345678 13912345678");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].groups(), vec![0..11, 11..22]);
        let segs = runs[0].segments_where(|d| d.len() == 11);
        assert_eq!(segs, vec![0..11, 11..22]);
    }

    #[test]
    fn test_sub_range() {
        let text = "8613812345678";
        let runs = strict_runs(text);
        let r = runs[0].sub_range(2, 13);
        assert_eq!(&text[r], "13812345678");
    }
}
