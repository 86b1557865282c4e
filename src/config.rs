//! SafeMask configuration management

use crate::desensitizer::MaskStrategy;
use crate::error::Result;
use crate::manager::DEFAULT_PRECEDENCE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main SafeMask configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeMaskConfig {
    /// Engine facade configuration
    pub engine: EngineConfig,

    /// Security layer configuration
    pub security: SecurityConfig,

    /// Detection configuration
    pub detection: DetectionConfig,

    /// Struct processor configuration
    pub structs: StructsConfig,

    /// User-defined regex rules
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
}

impl SafeMaskConfig {
    /// Parse a TOML document. Missing sections and keys take defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::error::Error::Config(e.to_string()))
    }
}

/// Which path `DlpEngine::desensitize_text` takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Desensitizer manager with auto-detection (default)
    #[default]
    Plugin,

    /// Pattern matcher engine
    Legacy,
}

impl EngineMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Legacy => "legacy",
        }
    }
}

/// Engine facade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Master switch; a disabled engine passes text through
    pub enabled: bool,

    /// Processing path
    pub mode: EngineMode,

    /// Engine-level result cache capacity (entries)
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: EngineMode::Plugin,
            cache_capacity: crate::cache::DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Security layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable the security layer for `secure_desensitize`
    pub enabled: bool,

    /// Per-client rate limiting
    pub rate_limit: RateLimitConfig,

    /// Maximum input length in chars
    pub max_input_length: usize,

    /// Bypass detections before an alert is raised
    pub alert_threshold: u64,

    /// Event log size that triggers trimming
    pub max_events: usize,

    /// Events kept after trimming
    pub retained_events: usize,

    /// Executable-content markers rejected as malicious (case-insensitive)
    pub blocked_patterns: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_limit: RateLimitConfig::default(),
            max_input_length: 10_000,
            alert_threshold: 10,
            max_events: 1000,
            retained_events: 500,
            blocked_patterns: default_blocked_patterns(),
        }
    }
}

/// Default executable-content blocklist
pub fn default_blocked_patterns() -> Vec<String> {
    [
        "<script",
        "javascript:",
        "onload=",
        "onerror=",
        "vbscript:",
        "<iframe",
        "eval(",
        "data:text/html",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Sliding-window rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window
    pub requests_per_window: u32,

    /// Window length in seconds
    pub window_secs: u64,

    /// Tracked clients before idle ones are pruned
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_secs: 60,
            max_clients: 10_000,
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Type order for ambiguous input
    pub precedence: Vec<String>,

    /// Re-scan desensitizer output and apply the fallback on residue
    pub residue_check: bool,

    /// Replacement character for built-in desensitizers
    pub mask_char: char,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            precedence: DEFAULT_PRECEDENCE.iter().map(|s| s.to_string()).collect(),
            residue_check: true,
            mask_char: crate::text::mask::DEFAULT_MASK,
        }
    }
}

/// Struct processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructsConfig {
    /// Maximum recursion depth
    pub max_depth: usize,
}

impl Default for StructsConfig {
    fn default() -> Self {
        Self {
            max_depth: crate::structs::DEFAULT_MAX_DEPTH,
        }
    }
}

/// A user-defined regex rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Rule name (desensitizer and matcher name)
    pub name: String,

    /// Regex pattern; a `value` group limits masking to that group
    pub pattern: String,

    /// Types the rule registers for
    #[serde(default)]
    pub types: Vec<String>,

    /// Matcher priority on the legacy path
    #[serde(default = "default_rule_priority")]
    pub priority: i32,

    /// Replacement strategy
    #[serde(default)]
    pub strategy: MaskStrategy,
}

fn default_rule_priority() -> i32 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SafeMaskConfig::default();
        assert!(config.engine.enabled);
        assert_eq!(config.engine.mode, EngineMode::Plugin);
        assert_eq!(config.engine.cache_capacity, 1000);
        assert_eq!(config.security.rate_limit.requests_per_window, 100);
        assert_eq!(config.security.max_input_length, 10_000);
        assert_eq!(config.structs.max_depth, 10);
        assert_eq!(config.detection.precedence[0], "phone");
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = SafeMaskConfig::from_toml_str(
            r#"
            [engine]
            mode = "legacy"

            [security.rate_limit]
            requests_per_window = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.mode, EngineMode::Legacy);
        assert!(config.engine.enabled);
        assert_eq!(config.security.rate_limit.requests_per_window, 5);
        assert_eq!(config.security.rate_limit.window_secs, 60);
        assert!(config
            .security
            .blocked_patterns
            .contains(&"<script".to_string()));
    }

    #[test]
    fn test_rules_section() {
        let config = SafeMaskConfig::from_toml_str(
            r#"
            [[rules]]
            name = "order_id"
            pattern = 'ORD-\d{8}'
            types = ["order"]

            [rules.strategy]
            type = "keep_ends"
            prefix = 4
            suffix = 2
            "#,
        )
        .unwrap();
        let rule = &config.rules[0];
        assert_eq!(rule.name, "order_id");
        assert_eq!(rule.priority, 50);
        assert_eq!(
            rule.strategy,
            MaskStrategy::KeepEnds {
                prefix: 4,
                suffix: 2
            }
        );
    }

    #[test]
    fn test_toml_roundtrip_and_load() {
        let text = SafeMaskConfig::default().to_toml_string().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        let loaded = SafeMaskConfig::load(file.path()).unwrap();
        assert_eq!(loaded.detection.mask_char, '*');
        assert_eq!(loaded.security.alert_threshold, 10);
    }

    #[test]
    fn test_bad_toml() {
        let err = SafeMaskConfig::from_toml_str("engine = 3").unwrap_err();
        assert!(matches!(err, crate::error::Error::ConfigParse(_)));
    }
}
