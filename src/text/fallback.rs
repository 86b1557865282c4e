//! Separator-tolerant fallback masking
//!
//! Used when a primary pass may have been evaded. Numbers are found as
//! permissive digit runs over the normalized view (up to three separator
//! chars between digits, invisibles ignored) and masked by digit position
//! in the original text. Nothing here requires an exact format.

use super::mask::{email_local_keep, mask_units};
use super::normalize::{is_any_digit, is_invisible, permissive_runs, DigitRun, Normalized};
use super::validate::{
    id_card_structure_valid, is_valid_bank_card_digits, is_valid_id_card_digits,
    is_valid_phone_digits,
};
use super::{apply_edits, Edit};
use regex::Regex;
use std::sync::OnceLock;

/// Numeric sensitive types recognised by the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    /// Mobile phone, optionally with the 86 country code
    Phone,
    /// Resident ID
    IdCard,
    /// Bank card
    BankCard,
}

impl NumberKind {
    /// Type name used across the crate.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::IdCard => "id_card",
            Self::BankCard => "bank_card",
        }
    }
}

/// Classify collapsed digits that pass full validation.
pub fn classify_valid(digits: &str) -> Option<NumberKind> {
    if is_valid_phone_digits(digits)
        || (digits.len() == 13 && digits.starts_with("86") && is_valid_phone_digits(&digits[2..]))
    {
        return Some(NumberKind::Phone);
    }
    if is_valid_id_card_digits(digits, false) {
        return Some(NumberKind::IdCard);
    }
    if is_valid_bank_card_digits(digits) {
        return Some(NumberKind::BankCard);
    }
    None
}

/// Kept prefix and suffix for a digit string, by length and lead digits.
fn mask_shape(digits: &str) -> Option<(usize, usize)> {
    let n = digits.len();
    match n {
        11 if digits.starts_with('1') => Some((3, 4)),
        13 if digits.starts_with("861") => Some((5, 4)),
        18 => Some((6, 4)),
        15 if id_card_structure_valid(digits) => Some((6, 3)),
        13..=19 => Some((4, 4)),
        _ => None,
    }
}

/// Digit-index segments of a run worth masking, with kept prefix/suffix.
fn segments(run: &DigitRun) -> Vec<(usize, usize, usize, usize)> {
    if run.len() <= 19 {
        return mask_shape(&run.digits)
            .map(|(p, s)| vec![(0, run.len(), p, s)])
            .unwrap_or_default();
    }

    // Overlong run: split at separator gaps, longest classifiable span first.
    let groups = run.groups();
    let mut out = Vec::new();
    let mut i = 0;
    while i < groups.len() {
        let mut best = None;
        for j in i..groups.len() {
            let (from, to) = (groups[i].start, groups[j].end);
            if to - from > 19 {
                break;
            }
            if let Some((p, s)) = mask_shape(&run.digits[from..to]) {
                best = Some((j, from, to, p, s));
            }
        }
        match best {
            Some((j, from, to, p, s)) => {
                out.push((from, to, p, s));
                i = j + 1;
            }
            None => i += 1,
        }
    }
    if out.is_empty() && groups.len() == 1 {
        out.push((0, run.len(), 4, 4));
    }
    out
}

fn is_number_unit(c: char) -> bool {
    is_any_digit(c) || c == 'X' || c == 'x'
}

/// Mask phone, ID and card shaped numbers by digit position.
pub fn mask_numbers(text: &str, mask: char) -> String {
    let norm = Normalized::new(text);
    let mut edits = Vec::new();
    for run in permissive_runs(norm.as_str()) {
        for (from, to, prefix, suffix) in segments(&run) {
            let range = norm.original_range(run.sub_range(from, to));
            let slice = &text[range.clone()];
            let masked = mask_units(slice, is_number_unit, prefix, suffix, mask);
            if masked != slice {
                edits.push(Edit {
                    range,
                    with: masked,
                });
            }
        }
    }
    apply_edits(text, edits)
}

static LOOSE_EMAIL: OnceLock<Option<Regex>> = OnceLock::new();

/// Mask email local parts, tolerant of embedded invisible characters.
pub fn mask_emails(text: &str, mask: char) -> String {
    let Some(re) = super::compiled(
        &LOOSE_EMAIL,
        r"[A-Za-z0-9._%+\-*]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}",
    ) else {
        return text.to_string();
    };
    let norm = Normalized::new(text);
    let mut edits = Vec::new();
    for m in re.find_iter(norm.as_str()) {
        let Some(at) = m.as_str().find('@') else {
            continue;
        };
        let range = norm.original_range(m.start()..m.start() + at);
        let local = &text[range.clone()];
        if local.contains(mask) {
            continue;
        }
        let is_unit = |c: char| !is_invisible(c);
        let keep = email_local_keep(local.chars().filter(|c| is_unit(*c)).count());
        edits.push(Edit {
            range,
            with: mask_units(local, is_unit, keep, keep, mask),
        });
    }
    apply_edits(text, edits)
}

/// Numbers first, then emails.
pub fn aggressive_mask(text: &str, mask: char) -> String {
    mask_emails(&mask_numbers(text, mask), mask)
}

/// Fully valid numeric instances still present in `text`.
pub fn residual_numbers(text: &str) -> Vec<NumberKind> {
    let norm = Normalized::new(text);
    let mut found = Vec::new();
    for run in permissive_runs(norm.as_str()) {
        if let Some(kind) = classify_valid(&run.digits) {
            found.push(kind);
            continue;
        }
        for (from, to, _, _) in segments(&run) {
            if let Some(kind) = classify_valid(&run.digits[from..to]) {
                found.push(kind);
            }
        }
    }
    found
}
