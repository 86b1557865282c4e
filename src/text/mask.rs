//! Masking conventions
//!
//! Every masker replaces characters one-for-one, so the masked output has
//! the same char count as the input and separators stay where they were.
//! All maskers are idempotent on their own output.

use super::normalize::{fold_fullwidth_digit, is_any_digit};
use super::validate::collapse_digits;

/// Default mask character.
pub const DEFAULT_MASK: char = '*';

/// Mask the "unit" chars of `text` except the first `keep_prefix` and the
/// last `keep_suffix` units. Non-unit chars (separators, invisibles) are
/// copied through.
///
/// If there are not more units than kept ones, every unit is masked.
pub fn mask_units(
    text: &str,
    is_unit: impl Fn(char) -> bool,
    keep_prefix: usize,
    keep_suffix: usize,
    mask: char,
) -> String {
    let total = text.chars().filter(|c| is_unit(*c)).count();
    let (keep_prefix, keep_suffix) = if total <= keep_prefix + keep_suffix {
        (0, 0)
    } else {
        (keep_prefix, keep_suffix)
    };

    let mut out = String::with_capacity(text.len());
    let mut index = 0;
    for c in text.chars() {
        if is_unit(c) {
            if index < keep_prefix || index >= total - keep_suffix {
                out.push(c);
            } else {
                out.push(mask);
            }
            index += 1;
        } else {
            out.push(c);
        }
    }
    out
}

/// Mask the units in the half-open index range `from..to`.
pub fn mask_unit_range(
    text: &str,
    is_unit: impl Fn(char) -> bool,
    from: usize,
    to: usize,
    mask: char,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut index = 0;
    for c in text.chars() {
        if is_unit(c) {
            if (from..to).contains(&index) {
                out.push(mask);
            } else {
                out.push(c);
            }
            index += 1;
        } else {
            out.push(c);
        }
    }
    out
}

fn is_digit_or_mask(mask: char) -> impl Fn(char) -> bool {
    move |c| is_any_digit(c) || c == mask
}

fn is_id_unit(mask: char) -> impl Fn(char) -> bool {
    move |c| is_any_digit(c) || c == mask || c == 'X' || c == 'x'
}

/// Keep the first 3 and last 4 digits of a mobile number.
///
/// A leading `86` country code is kept as well.
pub fn mask_phone(candidate: &str, mask: char) -> String {
    let digits = count_units(candidate, is_digit_or_mask(mask));
    let prefix = if digits == 13 && starts_with_country_code(candidate) {
        5
    } else {
        3
    };
    mask_units(candidate, is_digit_or_mask(mask), prefix, 4, mask)
}

fn starts_with_country_code(candidate: &str) -> bool {
    let lead: String = candidate
        .chars()
        .filter_map(|c| fold_fullwidth_digit(c).or(c.is_ascii_digit().then_some(c)))
        .take(2)
        .collect();
    lead == "86"
}

/// Keep the first 4 and last 4 digits of a card number.
pub fn mask_bank_card(candidate: &str, mask: char) -> String {
    mask_units(candidate, is_digit_or_mask(mask), 4, 4, mask)
}

/// Keep the region code and the tail of a resident ID; mask the birth date.
///
/// 18-char IDs mask units 6..14; 15-digit legacy IDs mask units 6..12.
pub fn mask_id_card(candidate: &str, mask: char) -> String {
    let units = count_units(candidate, is_id_unit(mask));
    let end = if units == 15 { 12 } else { 14 };
    if units != 15 && units != 18 {
        return mask_units(candidate, is_id_unit(mask), 6, 4, mask);
    }
    mask_unit_range(candidate, is_id_unit(mask), 6, end, mask)
}

/// Tiered local-part masking.
///
/// - up to 2 chars: fully masked
/// - 3 to 4 chars: first and last kept
/// - longer: first 2 and last 2 kept
///
/// A local part that already contains the mask char is left alone.
pub fn mask_email_local(local: &str, mask: char) -> String {
    if local.contains(mask) {
        return local.to_string();
    }
    let keep = email_local_keep(local.chars().count());
    mask_units(local, |_| true, keep, keep, mask)
}

/// Chars kept at each end of a local part of `len` chars.
pub fn email_local_keep(len: usize) -> usize {
    match len {
        0..=2 => 0,
        3..=4 => 1,
        _ => 2,
    }
}

/// Mask an email address with [`mask_email_local`]; the domain is untouched.
pub fn mask_email(email: &str, mask: char) -> String {
    match email.rfind('@') {
        Some(at) => format!("{}{}", mask_email_local(&email[..at], mask), &email[at..]),
        None => email.to_string(),
    }
}

/// Mask a Chinese personal name.
///
/// Two chars keep the surname, three keep surname and last char, longer
/// names keep the first and last char.
pub fn mask_chinese_name(name: &str, mask: char) -> String {
    let chars: Vec<char> = name.chars().collect();
    match chars.len() {
        0 => String::new(),
        1 => mask.to_string(),
        2 => format!("{}{}", chars[0], mask),
        n => {
            let mut out = String::with_capacity(name.len());
            out.push(chars[0]);
            out.extend(std::iter::repeat(mask).take(n - 2));
            out.push(chars[n - 1]);
            out
        }
    }
}

/// Keep `prefix` leading and `suffix` trailing chars, mask the rest.
pub fn keep_ends(text: &str, prefix: usize, suffix: usize, mask: char) -> String {
    mask_units(text, |c| !c.is_whitespace(), prefix, suffix, mask)
}

/// Replace every non-whitespace char with the mask.
pub fn mask_all(text: &str, mask: char) -> String {
    text.chars()
        .map(|c| if c.is_whitespace() { c } else { mask })
        .collect()
}

fn count_units(text: &str, is_unit: impl Fn(char) -> bool) -> usize {
    text.chars().filter(|c| is_unit(*c)).count()
}

// =============================================================================
// Standalone helpers
// =============================================================================

/// `13812345678` -> `138****5678`. Anything that is not 11 digits is
/// returned unchanged.
pub fn mobile_phone_desensitize(phone: &str) -> String {
    match collapse_digits(phone) {
        Some(d) if d.len() == 11 => mask_units(phone, is_any_digit, 3, 4, DEFAULT_MASK),
        _ => phone.to_string(),
    }
}

/// `test@example.com` -> `t**@example.com`: the first char of the local
/// part, then `len - 2` (at least one) mask chars.
pub fn email_desensitize(email: &str) -> String {
    let Some(at) = email.rfind('@') else {
        return email.to_string();
    };
    let local = &email[..at];
    if local.is_empty() || local.contains(DEFAULT_MASK) {
        return email.to_string();
    }
    let n = local.chars().count();
    let mut out = String::with_capacity(email.len());
    out.extend(local.chars().take(1));
    out.extend(std::iter::repeat(DEFAULT_MASK).take(n.saturating_sub(2).max(1)));
    out.push_str(&email[at..]);
    out
}

/// 18- or 15-char resident ID with the birth segment masked.
pub fn id_card_desensitize(id: &str) -> String {
    match collapse_digits(id) {
        Some(d) if d.len() == 18 || d.len() == 15 => mask_id_card(id, DEFAULT_MASK),
        _ => id.to_string(),
    }
}

/// Card number with all but the first and last 4 digits masked.
pub fn bank_card_desensitize(card: &str) -> String {
    match collapse_digits(card) {
        Some(d) if (13..=19).contains(&d.len()) => mask_bank_card(card, DEFAULT_MASK),
        _ => card.to_string(),
    }
}

/// See [`mask_chinese_name`].
pub fn chinese_name_desensitize(name: &str) -> String {
    mask_chinese_name(name.trim(), DEFAULT_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- helpers ----

    #[test]
    fn test_mobile_phone_desensitize() {
        assert_eq!(mobile_phone_desensitize("13812345678"), "138****5678");
        assert_eq!(mobile_phone_desensitize("138-1234-5678"), "138-****-5678");
        assert_eq!(mobile_phone_desensitize("12345"), "12345");
    }

    #[test]
    fn test_email_desensitize() {
        assert_eq!(email_desensitize("test@example.com"), "t**@example.com");
        assert_eq!(email_desensitize("ab@example.com"), "a*@example.com");
        assert_eq!(email_desensitize("t**@example.com"), "t**@example.com");
        assert_eq!(email_desensitize("nope"), "nope");
    }

    #[test]
    fn test_id_card_desensitize() {
        let masked = id_card_desensitize("110101199003079876");
        assert_eq!(masked, "110101********9876");
        assert_eq!(masked.chars().count(), 18);

        assert_eq!(id_card_desensitize("110105491231002"), "110105******002");
    }

    #[test]
    fn test_bank_card_desensitize() {
        assert_eq!(bank_card_desensitize("6225880137654324"), "6225********4324");
        assert_eq!(
            bank_card_desensitize("6225 8801 3765 4324"),
            "6225 **** **** 4324"
        );
    }

    #[test]
    fn test_chinese_name_desensitize() {
        assert_eq!(chinese_name_desensitize("张三"), "张*");
        assert_eq!(chinese_name_desensitize("张三丰"), "张*丰");
        assert_eq!(chinese_name_desensitize("欧阳娜娜"), "欧**娜");
    }

    // ---- tiers ----

    #[test]
    fn test_email_local_tiers() {
        assert_eq!(mask_email("ab@x.com", '*'), "**@x.com");
        assert_eq!(mask_email("abc@x.com", '*'), "a*c@x.com");
        assert_eq!(mask_email("test@x.com", '*'), "t**t@x.com");
        assert_eq!(mask_email("alice@x.com", '*'), "al*ce@x.com");
        assert_eq!(mask_email("johnsmith@x.com", '*'), "jo*****th@x.com");
    }

    #[test]
    fn test_maskers_are_idempotent() {
        let phone = mask_phone("13812345678", '*');
        assert_eq!(mask_phone(&phone, '*'), phone);

        let email = mask_email("alice@x.com", '*');
        assert_eq!(mask_email(&email, '*'), email);

        let card = mask_bank_card("6225 8801 3765 4324", '*');
        assert_eq!(mask_bank_card(&card, '*'), card);

        let id = mask_id_card("110101199003079876", '*');
        assert_eq!(mask_id_card(&id, '*'), id);
    }

    #[test]
    fn test_phone_with_country_code() {
        assert_eq!(mask_phone("8613812345678", '*'), "86138****5678");
        assert_eq!(mask_phone("+86 138 1234 5678", '*'), "+86 138 **** 5678");
    }

    #[test]
    fn test_fullwidth_digits_masked_by_position() {
        assert_eq!(mask_phone("１３８１２３４５６７８", '*'), "１３８****５６７８");
    }

    #[test]
    fn test_mask_units_short_input_masks_all() {
        assert_eq!(mask_units("1234", is_any_digit, 3, 4, '#'), "####");
    }

    #[test]
    fn test_keep_ends_and_mask_all() {
        assert_eq!(keep_ends("sk-abcdef123456", 3, 4, '*'), "sk-********3456");
        assert_eq!(mask_all("a b", '*'), "* *");
    }
}
