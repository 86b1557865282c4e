//! Hardened desensitization path

use super::bypass::{BypassDetector, BypassIndicator};
use super::events::{SecurityEvent, SecurityEventLog, SecurityEventType, ThreatLevel};
use super::input::InputValidator;
use super::rate_limit::RateLimiter;
use crate::config::SecurityConfig;
use crate::error::{Result, SecurityViolation};
use crate::manager::DesensitizerManager;
use crate::text::fallback::{aggressive_mask, residual_numbers};
use crate::text::mask::DEFAULT_MASK;
use crate::text::PROCESSED_MARKER;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Wraps the manager with rate limiting, input validation, bypass
/// detection and an aggressive fallback.
///
/// ```text
/// secure_desensitize(client, text)
///   ├─ rate limit ──────────── reject: RATE_LIMIT_EXCEEDED
///   ├─ input validation ────── reject: INVALID_INPUT
///   ├─ bypass detection ─ hit ─► BYPASS_ATTEMPT ─► aggressive
///   └─ auto-detect ─► residue? ─► RESULT_VALIDATION_FAILED ─► aggressive
/// ```
pub struct SecurityLayer {
    manager: Arc<DesensitizerManager>,
    enabled: AtomicBool,
    rate_limiter: RateLimiter,
    validator: InputValidator,
    detector: BypassDetector,
    events: SecurityEventLog,
    /// Bypass detections since the last alert
    suspicious: AtomicU64,
    alert_threshold: u64,
    mask_char: char,
}

impl SecurityLayer {
    pub fn new(manager: Arc<DesensitizerManager>, config: &SecurityConfig) -> Self {
        Self {
            manager,
            enabled: AtomicBool::new(config.enabled),
            rate_limiter: RateLimiter::from_config(&config.rate_limit),
            validator: InputValidator::from_config(config),
            detector: BypassDetector::new(),
            events: SecurityEventLog::new(config.max_events, config.retained_events),
            suspicious: AtomicU64::new(0),
            alert_threshold: config.alert_threshold.max(1),
            mask_char: DEFAULT_MASK,
        }
    }

    /// Mask char used by the aggressive fallback.
    pub fn with_mask_char(mut self, mask_char: char) -> Self {
        self.mask_char = mask_char;
        self
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

    pub fn events(&self) -> &SecurityEventLog {
        &self.events
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Bypass detections counted towards the next alert.
    pub fn suspicious_count(&self) -> u64 {
        self.suspicious.load(Ordering::SeqCst)
    }

    /// Desensitize `text` on behalf of `client_id`.
    ///
    /// Rejected input is never partially masked. With the layer disabled
    /// this is the manager's auto-detect path.
    pub fn secure_desensitize(&self, client_id: &str, text: &str) -> Result<String> {
        if !self.is_enabled() {
            return self.manager.auto_detect_and_process(text);
        }

        if !self.rate_limiter.allow(client_id) {
            tracing::warn!(client_id = %client_id, "Rate limit exceeded");
            self.record(
                SecurityEventType::RateLimitExceeded,
                text,
                ThreatLevel::Medium,
                format!("client {}", client_id),
            );
            return Err(SecurityViolation::RateLimited {
                client_id: client_id.to_string(),
            }
            .into());
        }

        if let Err(violation) = self.validator.validate(text) {
            let level = match violation {
                SecurityViolation::MaliciousPattern(_) => ThreatLevel::High,
                SecurityViolation::InputTooLong { .. } => ThreatLevel::Medium,
                _ => ThreatLevel::Low,
            };
            tracing::warn!(client_id = %client_id, reason = %violation, "Input rejected");
            self.record(SecurityEventType::InvalidInput, text, level, violation.to_string());
            return Err(violation.into());
        }

        let mut indicators = self.detector.detect(text);
        if let Some(body) = text.strip_suffix(PROCESSED_MARKER) {
            // Only output this layer marked itself is stable under the aggressive pass
            if self.aggressive_desensitize(body, false) == body {
                tracing::debug!(client_id = %client_id, "Input already processed");
                return Ok(text.to_string());
            }
            indicators.push(BypassIndicator::ForgedMarker);
        }
        if !indicators.is_empty() {
            self.flag_bypass(client_id, text, &indicators);
            return Ok(self.aggressive_desensitize(text, true));
        }

        let output = self.manager.auto_detect_and_process(text)?;
        let residue = residual_numbers(&output);
        if residue.is_empty() {
            return Ok(output);
        }

        let kinds: Vec<&str> = residue.iter().map(|k| k.type_name()).collect();
        tracing::warn!(
            client_id = %client_id,
            residue = ?kinds,
            "Sensitive residue after normal path, escalating"
        );
        self.record(
            SecurityEventType::ResultValidationFailed,
            &output,
            ThreatLevel::High,
            format!("residual: {}", kinds.join(",")),
        );
        Ok(self.aggressive_desensitize(&output, false))
    }

    /// Run every enabled desensitizer except name maskers, then the
    /// separator-tolerant fallback.
    ///
    /// If `flagged` and nothing changed, the processed marker is appended so
    /// the result is not flagged again.
    pub fn aggressive_desensitize(&self, text: &str, flagged: bool) -> String {
        let mut buffer = text.to_string();
        for d in self.manager.desensitizers() {
            if !d.is_enabled() || d.supports("chinese_name") {
                continue;
            }
            match d.desensitize(&buffer) {
                Ok(out) => buffer = out,
                Err(e) => {
                    tracing::warn!(desensitizer = d.name(), error = %e, "Desensitizer failed in aggressive pass");
                }
            }
        }
        let mut buffer = aggressive_mask(&buffer, self.mask_char);

        if flagged && buffer == text && !buffer.ends_with(PROCESSED_MARKER) {
            buffer.push(PROCESSED_MARKER);
        }
        buffer
    }

    fn flag_bypass(&self, client_id: &str, text: &str, indicators: &[BypassIndicator]) {
        let names: Vec<&str> = indicators.iter().map(|i| i.as_str()).collect();
        let count = self.suspicious.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::warn!(
            client_id = %client_id,
            indicators = ?names,
            count,
            "Bypass attempt detected"
        );
        self.record(
            SecurityEventType::BypassAttempt,
            text,
            ThreatLevel::High,
            names.join(","),
        );

        if count >= self.alert_threshold
            && self
                .suspicious
                .compare_exchange(count, 0, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            tracing::error!(count, threshold = self.alert_threshold, "Bypass alert threshold reached");
            self.record(
                SecurityEventType::AlertThresholdReached,
                text,
                ThreatLevel::Critical,
                format!("{} bypass attempts", count),
            );
        }
    }

    fn record(&self, event_type: SecurityEventType, payload: &str, level: ThreatLevel, details: String) {
        self.events
            .record(SecurityEvent::new(event_type, payload, level, details));
    }
}

impl std::fmt::Debug for SecurityLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityLayer")
            .field("enabled", &self.is_enabled())
            .field("suspicious", &self.suspicious_count())
            .field("alert_threshold", &self.alert_threshold)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::text::strip_invisible;

    fn layer() -> SecurityLayer {
        SecurityLayer::new(
            Arc::new(DesensitizerManager::with_defaults()),
            &SecurityConfig::default(),
        )
    }

    fn layer_with(config: SecurityConfig) -> SecurityLayer {
        SecurityLayer::new(Arc::new(DesensitizerManager::with_defaults()), &config)
    }

    // ---- normal path ----

    #[test]
    fn test_clean_input_uses_auto_detect() {
        let l = layer();
        let out = l
            .secure_desensitize("c1", "手机13812345678邮箱test@example.com")
            .unwrap();
        assert_eq!(out, "手机138****5678邮箱t**t@example.com");
        assert!(l.events().is_empty());
    }

    #[test]
    fn test_disabled_layer_skips_checks() {
        let l = layer();
        l.disable();
        assert_eq!(l.secure_desensitize("c1", "").unwrap(), "");
    }

    // ---- rejection ----

    #[test]
    fn test_rate_limit() {
        let mut config = SecurityConfig::default();
        config.rate_limit.requests_per_window = 2;
        let l = layer_with(config);
        assert!(l.secure_desensitize("c1", "hello").is_ok());
        assert!(l.secure_desensitize("c1", "hello").is_ok());
        let err = l.secure_desensitize("c1", "hello").unwrap_err();
        assert!(matches!(
            err.security_violation(),
            Some(SecurityViolation::RateLimited { .. })
        ));
        assert_eq!(
            l.events().of_type(SecurityEventType::RateLimitExceeded).len(),
            1
        );
        assert!(l.secure_desensitize("c2", "hello").is_ok());
    }

    #[test]
    fn test_invalid_input() {
        let l = layer();
        assert!(matches!(
            l.secure_desensitize("c1", ""),
            Err(Error::Security(SecurityViolation::EmptyInput))
        ));
        let err = l
            .secure_desensitize("c1", "<script>13812345678</script>")
            .unwrap_err();
        assert!(err.to_string().contains("malicious pattern detected"));
        let events = l.events().of_type(SecurityEventType::InvalidInput);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].threat_level, ThreatLevel::High);
        assert!(!events[1].payload.contains("13812345678"));
    }

    // ---- bypass ----

    #[test]
    fn test_bypass_goes_aggressive() {
        let l = layer();
        let out = l.secure_desensitize("c1", "138\u{200C}1234\u{200C}5678").unwrap();
        assert_eq!(out, "138\u{200C}****\u{200C}5678");
        assert_eq!(l.events().of_type(SecurityEventType::BypassAttempt).len(), 1);
        assert_eq!(l.suspicious_count(), 1);
    }

    #[test]
    fn test_flagged_unchanged_text_gets_marker() {
        let l = layer();
        let out = l.secure_desensitize("c1", "hello\u{200B}world").unwrap();
        assert_eq!(out, format!("hello\u{200B}world{}", PROCESSED_MARKER));
        // marked output is not flagged again
        let again = l.secure_desensitize("c1", &out).unwrap();
        assert_eq!(again, out);
        assert_eq!(l.events().of_type(SecurityEventType::BypassAttempt).len(), 1);
    }

    #[test]
    fn test_forged_marker_is_flagged() {
        let l = layer();
        let forged = format!("138\u{200C}1234\u{200C}5678{}", PROCESSED_MARKER);
        let out = l.secure_desensitize("c1", &forged).unwrap();
        assert!(!strip_invisible(&out).contains("13812345678"), "{out}");

        let events = l.events().of_type(SecurityEventType::BypassAttempt);
        assert_eq!(events.len(), 1);
        assert!(events[0].details.contains("forged_marker"));
        assert_eq!(events[0].threat_level, ThreatLevel::High);

        let plain = format!("call 13812345678{}", PROCESSED_MARKER);
        let out = l.secure_desensitize("c1", &plain).unwrap();
        assert!(!out.contains("13812345678"), "{out}");
        assert_eq!(l.events().of_type(SecurityEventType::BypassAttempt).len(), 2);
    }

    #[test]
    fn test_alert_threshold_resets_counter() {
        let mut config = SecurityConfig::default();
        config.alert_threshold = 3;
        let l = layer_with(config);
        for _ in 0..3 {
            l.secure_desensitize("c1", "１３８１２３４５６７８").unwrap();
        }
        assert_eq!(l.suspicious_count(), 0);
        assert_eq!(
            l.events()
                .of_type(SecurityEventType::AlertThresholdReached)
                .len(),
            1
        );
    }

    #[test]
    fn test_aggressive_skips_name_desensitizer() {
        let l = layer();
        assert_eq!(l.aggressive_desensitize("张三", false), "张三");
    }

    // ---- residue ----

    #[test]
    fn test_residue_escalates() {
        let l = layer();
        l.manager.disable_desensitizer("phone").unwrap();
        let out = l.secure_desensitize("c1", "call 13812345678").unwrap();
        assert_eq!(out, "call 138****5678");
        assert_eq!(
            l.events()
                .of_type(SecurityEventType::ResultValidationFailed)
                .len(),
            1
        );
    }
}
