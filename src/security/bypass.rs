//! Bypass attempt detection
//!
//! Looks for the evasion techniques normalization is meant to undo. A hit
//! does not mean the input is malicious, only that the normal path may have
//! been targeted, so the caller switches to aggressive masking.

use crate::text::normalize::{fold_fullwidth_digit, fold_homoglyph, is_invisible};
use crate::text::validate::is_valid_bank_card_digits;
use crate::text::{permissive_runs, DigitRun, Normalized};
use serde::{Deserialize, Serialize};

/// Separator chars inside one digit run that count as excessive
pub const EXCESSIVE_SEPARATORS: usize = 4;

/// Evasion technique found in an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassIndicator {
    /// Zero-width or control characters
    InvisibleCharacters,
    /// Full-width digits
    FullWidthDigits,
    /// Cyrillic look-alikes mixed into Latin words
    Homoglyphs,
    /// Card number split by separators
    SeparatedCardNumber,
    /// Digit run with many separators outside a card or phone layout
    ExcessiveSeparators,
    /// Processed marker on text the aggressive pass would still change
    ForgedMarker,
}

impl BypassIndicator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvisibleCharacters => "invisible_characters",
            Self::FullWidthDigits => "full_width_digits",
            Self::Homoglyphs => "homoglyphs",
            Self::SeparatedCardNumber => "separated_card_number",
            Self::ExcessiveSeparators => "excessive_separators",
            Self::ForgedMarker => "forged_marker",
        }
    }
}

/// Scans input for bypass indicators.
#[derive(Debug, Clone, Copy, Default)]
pub struct BypassDetector;

impl BypassDetector {
    pub fn new() -> Self {
        Self
    }

    /// Indicators found in `text`, each reported once. The processed
    /// marker is invisible, so marked text always reports
    /// [`BypassIndicator::InvisibleCharacters`]; telling genuine output from
    /// a forged marker is up to the caller.
    pub fn detect(&self, text: &str) -> Vec<BypassIndicator> {
        let mut found = Vec::new();
        if text.chars().any(is_invisible) {
            found.push(BypassIndicator::InvisibleCharacters);
        }
        if text.chars().any(|c| fold_fullwidth_digit(c).is_some()) {
            found.push(BypassIndicator::FullWidthDigits);
        }
        if has_mixed_script_word(text) {
            found.push(BypassIndicator::Homoglyphs);
        }

        let norm = Normalized::new(text);
        let runs = permissive_runs(norm.as_str());
        if runs
            .iter()
            .any(|r| r.separators > 0 && is_valid_bank_card_digits(&r.digits))
        {
            found.push(BypassIndicator::SeparatedCardNumber);
        }
        if runs
            .iter()
            .any(|r| r.separators >= EXCESSIVE_SEPARATORS && !is_recognized_layout(r))
        {
            found.push(BypassIndicator::ExcessiveSeparators);
        }
        found
    }

    pub fn is_suspicious(&self, text: &str) -> bool {
        !self.detect(text).is_empty()
    }
}

/// A word containing both a homoglyph and a Latin letter or digit.
fn has_mixed_script_word(text: &str) -> bool {
    text.split_whitespace().any(|word| {
        word.chars().any(|c| fold_homoglyph(c).is_some())
            && word.chars().any(|c| c.is_ascii_alphanumeric())
    })
}

/// Card layout (groups of four, a shorter last group allowed) or phone
/// layout (3-4-4), each group split by exactly one separator.
fn is_recognized_layout(run: &DigitRun) -> bool {
    let groups = run.groups();
    if groups.len() < 2 || run.separators != groups.len() - 1 {
        return false;
    }
    let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
    if sizes == [3, 4, 4] {
        return true;
    }
    let (last, body) = match sizes.split_last() {
        Some(split) => split,
        None => return false,
    };
    body.iter().all(|&n| n == 4) && (1..=4).contains(last) && run.len() <= 19
}
