//! Resident ID desensitizer

use super::{
    mask_digit_candidates, option_bool, residue_pass, Desensitizer, DesensitizerCore,
    DesensitizerOptions, TypeAware,
};
use crate::cache::CacheStats;
use crate::error::Result;
use crate::text::fallback::NumberKind;
use crate::text::mask::mask_id_card;
use crate::text::validate::{is_valid_id_card, is_valid_id_card_digits};
use std::sync::atomic::{AtomicBool, Ordering};

const SUPPORTED_TYPES: &[&str] = &["id_card"];

/// Masks the birth-date segment of Chinese resident IDs.
///
/// `110101199003079876` becomes `110101********9876`; legacy 15-digit IDs
/// keep the region code and the last three digits. Free-text candidates
/// need a valid region prefix and birth date; the checksum is enforced only
/// with `strict_checksum` (whole-input classification always checks it).
#[derive(Debug)]
pub struct IdCardDesensitizer {
    core: DesensitizerCore,
    strict_checksum: AtomicBool,
}

impl IdCardDesensitizer {
    pub fn new() -> Self {
        Self {
            core: DesensitizerCore::new("id_card"),
            strict_checksum: AtomicBool::new(false),
        }
    }

    pub fn core(&self) -> &DesensitizerCore {
        &self.core
    }

    pub fn strict_checksum(&self) -> bool {
        self.strict_checksum.load(Ordering::SeqCst)
    }

    fn mask_text(&self, text: &str) -> Result<String> {
        let settings = self.core.settings();
        let strict = self.strict_checksum();
        let masked = mask_digit_candidates(
            text,
            |d| is_valid_id_card_digits(d, strict),
            |s| mask_id_card(s, settings.mask_char),
        );
        if settings.residue_check {
            Ok(residue_pass(
                self.core.name(),
                masked,
                NumberKind::IdCard,
                settings.mask_char,
            ))
        } else {
            Ok(masked)
        }
    }
}

impl Default for IdCardDesensitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Desensitizer for IdCardDesensitizer {
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
        if let Some(value) = options.get("strict_checksum") {
            let strict = option_bool("strict_checksum", value)?;
            self.strict_checksum.store(strict, Ordering::SeqCst);
        }
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

impl TypeAware for IdCardDesensitizer {
    fn supported_types(&self) -> Vec<String> {
        SUPPORTED_TYPES.iter().map(|s| s.to_string()).collect()
    }

    fn validate_type(&self, text: &str, kind: &str) -> bool {
        self.supports(kind) && is_valid_id_card(text.trim())
    }
}
