//! Pluggable desensitizers
//!
//! Each desensitizer owns normalization, validation and masking for one
//! family of sensitive data. Detection runs on a normalized view of the
//! input (invisibles stripped, full-width digits and homoglyphs folded);
//! replacements are applied to the original text so formatting survives.
//!
//! ```text
//! text ─► Normalized view ─► candidates ─► validate ─► mask original spans
//!                                                          │
//!                         residue re-scan (normalized) ◄───┘
//!                                  │ valid instance left?
//!                                  └─► separator-tolerant fallback
//! ```
//!
//! Optional capabilities are exposed through safe accessors such as
//! [`Desensitizer::as_type_aware`] rather than downcasts.

pub mod bank_card;
pub mod chinese_name;
pub mod email;
pub mod id_card;
pub mod phone;
pub mod regex_rule;

pub use bank_card::BankCardDesensitizer;
pub use chinese_name::ChineseNameDesensitizer;
pub use email::EmailDesensitizer;
pub use id_card::IdCardDesensitizer;
pub use phone::PhoneDesensitizer;
pub use regex_rule::{MaskStrategy, RegexDesensitizer};

use crate::cache::{CacheKeyCodec, CacheStats, LruResultCache, ResultCache};
use crate::error::{Error, Result};
use crate::text::fallback::{mask_numbers, residual_numbers, NumberKind};
use crate::text::mask::DEFAULT_MASK;
use crate::text::{apply_edits, strict_runs, Edit, Normalized};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Options accepted by [`Desensitizer::configure`].
pub type DesensitizerOptions = serde_json::Map<String, serde_json::Value>;

/// Entries kept in each desensitizer's local result cache.
pub const LOCAL_CACHE_CAPACITY: usize = 256;

/// A masking strategy for one family of sensitive data.
pub trait Desensitizer: Send + Sync {
    /// Unique registry name.
    fn name(&self) -> &str;

    /// Whether this desensitizer handles `kind`.
    fn supports(&self, kind: &str) -> bool;

    /// Mask every instance found in `text`. A disabled desensitizer returns
    /// the input unchanged.
    fn desensitize(&self, text: &str) -> Result<String>;

    /// Apply options; clears the local cache.
    fn configure(&self, options: &DesensitizerOptions) -> Result<()>;

    fn enable(&self);

    fn disable(&self);

    fn is_enabled(&self) -> bool;

    fn clear_cache(&self);

    fn cache_stats(&self) -> CacheStats;

    /// Type enumeration and whole-input validation, if supported.
    fn as_type_aware(&self) -> Option<&dyn TypeAware> {
        None
    }
}

/// Capability: enumerate supported types and classify a whole input.
pub trait TypeAware {
    /// Types this desensitizer registers for.
    fn supported_types(&self) -> Vec<String>;

    /// Whether the whole trimmed `text` is a valid instance of `kind`.
    fn validate_type(&self, text: &str, kind: &str) -> bool;
}

/// Settings shared by every built-in desensitizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommonSettings {
    /// Replacement character
    pub mask_char: char,
    /// Re-scan output and apply the fallback if a valid instance remains
    pub residue_check: bool,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            mask_char: DEFAULT_MASK,
            residue_check: true,
        }
    }
}

/// State shared by the built-in desensitizers: enabled flag, local cache
/// with counters, and common settings.
pub struct DesensitizerCore {
    name: String,
    enabled: AtomicBool,
    cache: Arc<dyn ResultCache>,
    codec: CacheKeyCodec,
    hits: AtomicU64,
    misses: AtomicU64,
    settings: RwLock<CommonSettings>,
}

impl DesensitizerCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_cache(name, Arc::new(LruResultCache::new(LOCAL_CACHE_CAPACITY)))
    }

    pub fn with_cache(name: impl Into<String>, cache: Arc<dyn ResultCache>) -> Self {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(true),
            cache,
            codec: CacheKeyCodec::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            settings: RwLock::new(CommonSettings::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> CommonSettings {
        *self.settings.read()
    }

    pub fn set_mask_char(&self, mask_char: char) {
        self.settings.write().mask_char = mask_char;
        self.clear_cache();
    }

    pub fn set_residue_check(&self, on: bool) {
        self.settings.write().residue_check = on;
        self.clear_cache();
    }

    /// Return the cached result for `text`, or compute and cache it.
    pub fn cached(&self, text: &str, compute: impl FnOnce(&str) -> Result<String>) -> Result<String> {
        if !self.is_enabled() || text.is_empty() {
            return Ok(text.to_string());
        }
        let key = self.codec.key(&self.name, text);
        if let Some(hit) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let out = compute(text)?;
        self.cache.put(key, out.clone());
        Ok(out)
    }

    /// Apply `mask_char`, `residue_check` and `enabled`; other keys are
    /// left to the caller.
    pub fn apply_common_options(&self, options: &DesensitizerOptions) -> Result<()> {
        let mut settings = self.settings();
        if let Some(value) = options.get("mask_char") {
            settings.mask_char = parse_mask_char(value)?;
        }
        if let Some(value) = options.get("residue_check") {
            settings.residue_check = option_bool("residue_check", value)?;
        }
        if let Some(value) = options.get("enabled") {
            if option_bool("enabled", value)? {
                self.enable();
            } else {
                self.disable();
            }
        }
        *self.settings.write() = settings;
        self.clear_cache();
        tracing::debug!(desensitizer = %self.name, "Desensitizer configured");
        Ok(())
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.cache.len(),
            capacity: self.cache.capacity(),
        }
    }
}

impl std::fmt::Debug for DesensitizerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesensitizerCore")
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .field("settings", &self.settings())
            .finish_non_exhaustive()
    }
}

/// Read a boolean option.
pub fn option_bool(key: &str, value: &serde_json::Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::Validation(format!("option '{}' must be a boolean", key)))
}

/// Read a non-negative integer option.
pub fn option_usize(key: &str, value: &serde_json::Value) -> Result<usize> {
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| Error::Validation(format!("option '{}' must be a non-negative integer", key)))
}

fn parse_mask_char(value: &serde_json::Value) -> Result<char> {
    let s = value
        .as_str()
        .ok_or_else(|| Error::Validation("option 'mask_char' must be a string".to_string()))?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_whitespace() && !c.is_ascii_digit() => Ok(c),
        _ => Err(Error::Validation(
            "option 'mask_char' must be a single non-digit character".to_string(),
        )),
    }
}

/// Mask digit-run candidates in `text`.
///
/// Runs (single space/hyphen/dot separators) are found on the normalized
/// view; every segment accepted by `accept` is masked in the original text
/// with `mask`.
pub(crate) fn mask_digit_candidates(
    text: &str,
    accept: impl Fn(&str) -> bool,
    mask: impl Fn(&str) -> String,
) -> String {
    let norm = Normalized::new(text);
    let mut edits = Vec::new();
    for run in strict_runs(norm.as_str()) {
        for segment in run.segments_where(&accept) {
            let range = norm.original_range(run.sub_range(segment.start, segment.end));
            let original = &text[range.clone()];
            let masked = mask(original);
            if masked != original {
                edits.push(Edit {
                    range,
                    with: masked,
                });
            }
        }
    }
    apply_edits(text, edits)
}

/// Second pass: if a valid `kind` instance survived, apply the fallback.
pub(crate) fn residue_pass(name: &str, output: String, kind: NumberKind, mask: char) -> String {
    if !residual_numbers(&output).contains(&kind) {
        return output;
    }
    tracing::debug!(
        desensitizer = name,
        kind = kind.type_name(),
        "Residual instance after primary pass, applying fallback"
    );
    mask_numbers(&output, mask)
}
