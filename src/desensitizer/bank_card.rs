//! Bank card desensitizer

use super::{
    mask_digit_candidates, residue_pass, Desensitizer, DesensitizerCore, DesensitizerOptions,
    TypeAware,
};
use crate::cache::CacheStats;
use crate::error::Result;
use crate::text::fallback::NumberKind;
use crate::text::mask::mask_bank_card;
use crate::text::validate::{is_valid_bank_card, is_valid_bank_card_digits};

const SUPPORTED_TYPES: &[&str] = &["bank_card", "credit_card"];

/// Masks Luhn-valid card numbers, keeping the first and last four digits.
///
/// Separators keep their positions: `6225 8801 3765 4324` becomes
/// `6225 **** **** 4324`. Published test numbers and trivially sequential
/// or repeated digit strings are left alone.
#[derive(Debug)]
pub struct BankCardDesensitizer {
    core: DesensitizerCore,
}

impl BankCardDesensitizer {
    pub fn new() -> Self {
        Self {
            core: DesensitizerCore::new("bank_card"),
        }
    }

    pub fn core(&self) -> &DesensitizerCore {
        &self.core
    }

    fn mask_text(&self, text: &str) -> Result<String> {
        let settings = self.core.settings();
        let masked = mask_digit_candidates(text, is_valid_bank_card_digits, |s| {
            mask_bank_card(s, settings.mask_char)
        });
        if settings.residue_check {
            Ok(residue_pass(
                self.core.name(),
                masked,
                NumberKind::BankCard,
                settings.mask_char,
            ))
        } else {
            Ok(masked)
        }
    }
}

impl Default for BankCardDesensitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Desensitizer for BankCardDesensitizer {
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

impl TypeAware for BankCardDesensitizer {
    fn supported_types(&self) -> Vec<String> {
        SUPPORTED_TYPES.iter().map(|s| s.to_string()).collect()
    }

    fn validate_type(&self, text: &str, kind: &str) -> bool {
        self.supports(kind) && is_valid_bank_card(text.trim())
    }
}
