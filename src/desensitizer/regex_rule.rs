//! User-defined regex desensitizer

use super::{Desensitizer, DesensitizerCore, DesensitizerOptions, TypeAware};
use crate::cache::CacheStats;
use crate::error::{Error, Result};
use crate::matcher::pattern::VALUE_GROUP;
use crate::text::mask::{keep_ends, mask_all};
use crate::text::{apply_edits, Edit};
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a matched value is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaskStrategy {
    /// Mask every non-whitespace char
    #[default]
    Full,
    /// Keep `prefix` leading and `suffix` trailing chars
    KeepEnds { prefix: usize, suffix: usize },
    /// Replace the whole value with a fixed string
    Replace { with: String },
}

impl MaskStrategy {
    pub fn apply(&self, value: &str, mask: char) -> String {
        match self {
            Self::Full => mask_all(value, mask),
            Self::KeepEnds { prefix, suffix } => keep_ends(value, *prefix, *suffix, mask),
            Self::Replace { with } => with.clone(),
        }
    }
}

/// Masks every match of a user-supplied pattern.
///
/// If the pattern has a `value` group only that group is replaced, so
/// `token=(?P<value>\w+)` keeps the `token=` prefix.
pub struct RegexDesensitizer {
    core: DesensitizerCore,
    pattern: RwLock<Regex>,
    types: Vec<String>,
    strategy: RwLock<MaskStrategy>,
}

impl RegexDesensitizer {
    /// Compile a rule. `types` lists the kinds it registers for; the rule
    /// name is always accepted as a kind.
    pub fn new(name: impl Into<String>, pattern: &str, types: Vec<String>) -> Result<Self> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            name: name.clone(),
            source,
        })?;
        Ok(Self {
            core: DesensitizerCore::new(name),
            pattern: RwLock::new(regex),
            types,
            strategy: RwLock::new(MaskStrategy::default()),
        })
    }

    pub fn with_strategy(self, strategy: MaskStrategy) -> Self {
        *self.strategy.write() = strategy;
        self
    }

    pub fn core(&self) -> &DesensitizerCore {
        &self.core
    }

    pub fn strategy(&self) -> MaskStrategy {
        self.strategy.read().clone()
    }

    pub fn pattern(&self) -> String {
        self.pattern.read().as_str().to_string()
    }

    fn mask_text(&self, text: &str) -> Result<String> {
        let mask = self.core.settings().mask_char;
        let strategy = self.strategy();
        let pattern = self.pattern.read();
        let has_value_group = pattern.capture_names().any(|n| n == Some(VALUE_GROUP));

        let mut edits = Vec::new();
        for caps in pattern.captures_iter(text) {
            let span = if has_value_group {
                caps.name(VALUE_GROUP)
            } else {
                caps.get(0)
            };
            let Some(span) = span else {
                continue;
            };
            if span.as_str().is_empty() {
                continue;
            }
            let replacement = strategy.apply(span.as_str(), mask);
            if replacement != span.as_str() {
                edits.push(Edit {
                    range: span.range(),
                    with: replacement,
                });
            }
        }
        Ok(apply_edits(text, edits))
    }
}

impl std::fmt::Debug for RegexDesensitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexDesensitizer")
            .field("name", &self.core.name())
            .field("pattern", &self.pattern())
            .field("types", &self.types)
            .field("strategy", &self.strategy())
            .finish()
    }
}

impl Desensitizer for RegexDesensitizer {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn supports(&self, kind: &str) -> bool {
        kind == self.core.name() || self.types.iter().any(|t| t == kind)
    }

    fn desensitize(&self, text: &str) -> Result<String> {
        self.core.cached(text, |t| self.mask_text(t))
    }

    fn configure(&self, options: &DesensitizerOptions) -> Result<()> {
        let pattern = match options.get("pattern") {
            Some(value) => {
                let source = value.as_str().ok_or_else(|| {
                    Error::Validation("option 'pattern' must be a string".to_string())
                })?;
                Some(Regex::new(source).map_err(|source| Error::InvalidPattern {
                    name: self.core.name().to_string(),
                    source,
                })?)
            }
            None => None,
        };
        let strategy = match options.get("strategy") {
            Some(value) => Some(
                serde_json::from_value::<MaskStrategy>(value.clone())
                    .map_err(|e| Error::Validation(format!("invalid strategy: {}", e)))?,
            ),
            None => None,
        };

        self.core.apply_common_options(options)?;
        if let Some(pattern) = pattern {
            *self.pattern.write() = pattern;
        }
        if let Some(strategy) = strategy {
            *self.strategy.write() = strategy;
        }
        self.core.clear_cache();
        Ok(())
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

impl TypeAware for RegexDesensitizer {
    fn supported_types(&self) -> Vec<String> {
        if self.types.is_empty() {
            vec![self.core.name().to_string()]
        } else {
            self.types.clone()
        }
    }

    fn validate_type(&self, text: &str, kind: &str) -> bool {
        if !self.supports(kind) {
            return false;
        }
        let trimmed = text.trim();
        self.pattern
            .read()
            .find(trimmed)
            .is_some_and(|m| m.start() == 0 && m.end() == trimmed.len())
    }
}
