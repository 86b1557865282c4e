//! Email desensitizer

use super::{Desensitizer, DesensitizerCore, DesensitizerOptions, TypeAware};
use crate::cache::CacheStats;
use crate::error::Result;
use crate::text::fallback::mask_emails;
use crate::text::mask::{email_local_keep, mask_units};
use crate::text::normalize::is_invisible;
use crate::text::validate::is_valid_email;
use crate::text::{apply_edits, Edit, Normalized};
use regex::Regex;
use std::sync::OnceLock;

const SUPPORTED_TYPES: &[&str] = &["email"];

static EMAIL_CANDIDATE: OnceLock<Option<Regex>> = OnceLock::new();

fn candidate_pattern() -> Option<&'static Regex> {
    crate::text::compiled(
        &EMAIL_CANDIDATE,
        r"[A-Za-z0-9*][A-Za-z0-9._%+\-*]*@[A-Za-z0-9][A-Za-z0-9.\-]*\.[A-Za-z]{2,}",
    )
}

/// Masks the local part of email addresses; the domain is kept.
///
/// Local parts of up to 2 chars are fully masked, 3 to 4 keep the first
/// and last char, longer ones keep two chars at each end.
#[derive(Debug)]
pub struct EmailDesensitizer {
    core: DesensitizerCore,
}

impl EmailDesensitizer {
    pub fn new() -> Self {
        Self {
            core: DesensitizerCore::new("email"),
        }
    }

    pub fn core(&self) -> &DesensitizerCore {
        &self.core
    }

    fn mask_text(&self, text: &str) -> Result<String> {
        let settings = self.core.settings();
        let Some(re) = candidate_pattern() else {
            return Ok(text.to_string());
        };

        let norm = Normalized::new(text);
        let mut edits = Vec::new();
        for m in re.find_iter(norm.as_str()) {
            if !is_valid_email(m.as_str()) {
                continue;
            }
            let Some(at) = m.as_str().rfind('@') else {
                continue;
            };
            let range = norm.original_range(m.start()..m.start() + at);
            let local = &text[range.clone()];
            if local.contains(settings.mask_char) {
                continue;
            }
            let is_unit = |c: char| !is_invisible(c);
            let keep = email_local_keep(local.chars().filter(|c| is_unit(*c)).count());
            edits.push(Edit {
                range,
                with: mask_units(local, is_unit, keep, keep, settings.mask_char),
            });
        }
        let masked = apply_edits(text, edits);

        if settings.residue_check && has_unmasked_email(&masked, settings.mask_char) {
            tracing::debug!(
                desensitizer = self.core.name(),
                "Residual email after primary pass, applying fallback"
            );
            return Ok(mask_emails(&masked, settings.mask_char));
        }
        Ok(masked)
    }
}

impl Default for EmailDesensitizer {
    fn default() -> Self {
        Self::new()
    }
}

fn has_unmasked_email(text: &str, mask: char) -> bool {
    let Some(re) = candidate_pattern() else {
        return false;
    };
    let norm = Normalized::new(text);
    re.find_iter(norm.as_str()).any(|m| {
        let local = m.as_str().split('@').next().unwrap_or_default();
        !local.contains(mask) && is_valid_email(m.as_str())
    })
}

impl Desensitizer for EmailDesensitizer {
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

impl TypeAware for EmailDesensitizer {
    fn supported_types(&self) -> Vec<String> {
        SUPPORTED_TYPES.iter().map(|s| s.to_string()).collect()
    }

    fn validate_type(&self, text: &str, kind: &str) -> bool {
        self.supports(kind) && is_valid_email(text.trim())
    }
}
