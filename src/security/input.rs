//! Input validation

use crate::config::SecurityConfig;
use crate::error::SecurityViolation;
use crate::text::strip_invisible;

/// Rejects empty, oversized and script-bearing input.
#[derive(Debug, Clone)]
pub struct InputValidator {
    max_length: usize,
    /// Lowercased blocklist
    blocked: Vec<String>,
}

impl InputValidator {
    pub fn new(max_length: usize, blocked: &[String]) -> Self {
        Self {
            max_length,
            blocked: blocked
                .iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.max_input_length, &config.blocked_patterns)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Check `text`. The blocklist is matched case-insensitively with
    /// invisible characters removed, so `<scr\u{200B}ipt` is still caught.
    pub fn validate(&self, text: &str) -> Result<(), SecurityViolation> {
        if text.is_empty() {
            return Err(SecurityViolation::EmptyInput);
        }
        let len = text.chars().count();
        if len > self.max_length {
            return Err(SecurityViolation::InputTooLong {
                len,
                max: self.max_length,
            });
        }
        let lowered = strip_invisible(text).to_lowercase();
        if let Some(pattern) = self.blocked.iter().find(|p| lowered.contains(p.as_str())) {
            return Err(SecurityViolation::MaliciousPattern(pattern.clone()));
        }
        Ok(())
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}
