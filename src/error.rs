//! SafeMask error types

use thiserror::Error;

/// Reason a request was rejected by the security layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityViolation {
    /// Client exceeded its request budget for the current window
    #[error("rate limit exceeded for client {client_id}")]
    RateLimited {
        /// Client identifier
        client_id: String,
    },
    /// Input was empty
    #[error("empty input")]
    EmptyInput,
    /// Input exceeded the configured maximum length (in chars)
    #[error("input too long: {len} chars (max {max})")]
    InputTooLong {
        /// Observed length
        len: usize,
        /// Configured maximum
        max: usize,
    },
    /// Input contained a blocklisted executable-content marker
    #[error("malicious pattern detected: {0}")]
    MaliciousPattern(String),
}

/// SafeMask error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (duplicate or unnamed desensitizer, bad option)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Regex pattern failed to compile
    #[error("Invalid regex pattern for '{name}': {source}")]
    InvalidPattern {
        /// Matcher or rule name
        name: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Validation error (unknown type, malformed tag)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Input rejected by the security layer
    #[error("Security error: {0}")]
    Security(#[from] SecurityViolation),

    /// Processing error; callers fail open and keep the original text
    #[error("Processing error: {0}")]
    Processing(String),

    /// Contextual call made after its deadline
    #[error("deadline exceeded before processing started")]
    DeadlineExceeded,

    /// Struct walk exceeded the recursion cap
    #[error("max recursion depth {max} exceeded at '{path}'")]
    DepthExceeded {
        /// Field path where the cap was hit
        path: String,
        /// Configured maximum depth
        max: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    /// Returns true if the caller should keep the original text and continue.
    pub fn is_fail_open(&self) -> bool {
        matches!(self, Error::Processing(_) | Error::DeadlineExceeded)
    }

    /// Returns the security violation, if this is a security rejection.
    pub fn security_violation(&self) -> Option<&SecurityViolation> {
        match self {
            Error::Security(v) => Some(v),
            _ => None,
        }
    }
}

/// Result type alias for SafeMask operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_messages() {
        let err: Error = SecurityViolation::InputTooLong { len: 20, max: 10 }.into();
        assert!(err.to_string().contains("input too long"));

        let err: Error = SecurityViolation::MaliciousPattern("<script".into()).into();
        assert!(err.to_string().contains("malicious pattern detected"));

        let err: Error = SecurityViolation::RateLimited {
            client_id: "c1".into(),
        }
        .into();
        assert!(err.to_string().contains("rate limit exceeded"));
    }

    #[test]
    fn test_violation_is_std_error_with_exact_messages() {
        fn as_std(e: &dyn std::error::Error) -> String {
            e.to_string()
        }
        assert_eq!(as_std(&SecurityViolation::EmptyInput), "empty input");
        assert_eq!(
            as_std(&SecurityViolation::InputTooLong { len: 20, max: 10 }),
            "input too long: 20 chars (max 10)"
        );
        assert_eq!(
            SecurityViolation::MaliciousPattern("eval(".into()).to_string(),
            "malicious pattern detected: eval("
        );

        let err: Error = SecurityViolation::EmptyInput.into();
        assert_eq!(err.to_string(), "Security error: empty input");
    }

    #[test]
    fn test_fail_open_classification() {
        assert!(Error::Processing("no desensitizer found for type x".into()).is_fail_open());
        assert!(Error::DeadlineExceeded.is_fail_open());
        assert!(!Error::Config("dup".into()).is_fail_open());
        assert!(!Error::Security(SecurityViolation::EmptyInput).is_fail_open());
    }

    #[test]
    fn test_security_violation_accessor() {
        let err = Error::Security(SecurityViolation::EmptyInput);
        assert_eq!(err.security_violation(), Some(&SecurityViolation::EmptyInput));
        assert!(Error::Validation("x".into()).security_violation().is_none());
    }
}
