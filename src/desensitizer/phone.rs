//! Mobile phone desensitizer

use super::{
    mask_digit_candidates, residue_pass, Desensitizer, DesensitizerCore, DesensitizerOptions,
    TypeAware,
};
use crate::cache::CacheStats;
use crate::error::Result;
use crate::text::fallback::NumberKind;
use crate::text::mask::mask_phone;
use crate::text::validate::{collapse_digits, is_valid_phone_digits};

const SUPPORTED_TYPES: &[&str] = &["phone", "mobile"];

/// Masks mainland mobile numbers as `138****5678`.
///
/// Numbers carrying the `86` country code keep it: `86138****5678`.
#[derive(Debug)]
pub struct PhoneDesensitizer {
    core: DesensitizerCore,
}

impl PhoneDesensitizer {
    pub fn new() -> Self {
        Self {
            core: DesensitizerCore::new("phone"),
        }
    }

    pub fn core(&self) -> &DesensitizerCore {
        &self.core
    }

    fn mask_text(&self, text: &str) -> Result<String> {
        let settings = self.core.settings();
        let masked = mask_digit_candidates(text, is_phone_candidate, |s| {
            mask_phone(s, settings.mask_char)
        });
        if settings.residue_check {
            Ok(residue_pass(
                self.core.name(),
                masked,
                NumberKind::Phone,
                settings.mask_char,
            ))
        } else {
            Ok(masked)
        }
    }
}

impl Default for PhoneDesensitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// 11-digit mobile number, optionally behind an `86` country code.
fn is_phone_candidate(digits: &str) -> bool {
    is_valid_phone_digits(digits)
        || (digits.len() == 13 && digits.starts_with("86") && is_valid_phone_digits(&digits[2..]))
}

impl Desensitizer for PhoneDesensitizer {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn supports(&self, kind: &str) -> bool {
        SUPPORTED_TYPES.contains(&kind)
    }

    fn desensitize(&self, text: &str) -> Result<String> {
        self.core.cached(text, |t| self.mask_text(t))
    }

    fn configure(&self, options: &DesensitizerOptions) -> Result<()> {
        self.core.apply_common_options(options)
    }

    fn enable(&self) {
        self.core.enable();
    }

    fn disable(&self) {
        self.core.disable();
    }

    fn is_enabled(&self) -> bool {
        self.core.is_enabled()
    }

    fn clear_cache(&self) {
        self.core.clear_cache();
    }

    fn cache_stats(&self) -> CacheStats {
        self.core.cache_stats()
    }

    fn as_type_aware(&self) -> Option<&dyn TypeAware> {
        Some(self)
    }
}

impl TypeAware for PhoneDesensitizer {
    fn supported_types(&self) -> Vec<String> {
        SUPPORTED_TYPES.iter().map(|s| s.to_string()).collect()
    }

    fn validate_type(&self, text: &str, kind: &str) -> bool {
        if !self.supports(kind) {
            return false;
        }
        let trimmed = text.trim();
        let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
        collapse_digits(trimmed).is_some_and(|d| is_phone_candidate(&d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_phone() {
        let d = PhoneDesensitizer::new();
        assert_eq!(d.desensitize("13812345678").unwrap(), "138****5678");
    }

    #[test]
    fn test_phone_in_prose_with_separators() {
        let d = PhoneDesensitizer::new();
        assert_eq!(
            d.desensitize("call 138-1234-5678 or 139 1234 5678").unwrap(),
            "call 138-****-5678 or 139 **** 5678"
        );
    }

    #[test]
    fn test_country_code() {
        let d = PhoneDesensitizer::new();
        assert_eq!(d.desensitize("+86 138 1234 5678").unwrap(), "+86 138 **** 5678");
        assert_eq!(d.desensitize("8613812345678").unwrap(), "86138****5678");
    }

    #[test]
    fn test_evasion_is_normalized() {
        let d = PhoneDesensitizer::new();
        let out = d.desensitize("138\u{200B}1234\u{200B}5678").unwrap();
        assert_eq!(out, "138\u{200B}****\u{200B}5678");

        let out = d.desensitize("１３８１２３４５６７８").unwrap();
        assert_eq!(out, "１３８****５６７８");
    }

    #[test]
    fn test_residue_fallback() {
        let d = PhoneDesensitizer::new();
        assert_eq!(d.desensitize("138 - 1234 - 5678").unwrap(), "138 - **** - 5678");

        d.configure(&json!({"residue_check": false}).as_object().cloned().unwrap())
            .unwrap();
        assert_eq!(d.desensitize("138 - 1234 - 5678").unwrap(), "138 - 1234 - 5678");
    }

    #[test]
    fn test_invalid_numbers_untouched() {
        let d = PhoneDesensitizer::new();
        for text in ["12812345678", "11111111111", "1381234567", "913812345678"] {
            assert_eq!(d.desensitize(text).unwrap(), text);
        }
    }

    #[test]
    fn test_idempotent() {
        let d = PhoneDesensitizer::new();
        let once = d.desensitize("tel 13812345678").unwrap();
        assert_eq!(d.desensitize(&once).unwrap(), once);
    }

    #[test]
    fn test_mask_char_option() {
        let d = PhoneDesensitizer::new();
        d.configure(&json!({"mask_char": "#"}).as_object().cloned().unwrap())
            .unwrap();
        assert_eq!(d.desensitize("13812345678").unwrap(), "138####5678");
    }

    #[test]
    fn test_type_awareness() {
        let d = PhoneDesensitizer::new();
        let aware = d.as_type_aware().unwrap();
        assert!(aware.validate_type(" 138 1234 5678 ", "phone"));
        assert!(aware.validate_type("+8613812345678", "mobile"));
        assert!(!aware.validate_type("13812345678", "email"));
        assert!(!aware.validate_type("tel 13812345678", "phone"));
    }

    #[test]
    fn test_disabled_passthrough() {
        let d = PhoneDesensitizer::new();
        d.disable();
        assert_eq!(d.desensitize("13812345678").unwrap(), "13812345678");
    }
}
