//! Security event log
//!
//! Append-only during the process lifetime. Once the log grows past its
//! limit the oldest entries are dropped down to the retained size. Payloads
//! are stored as a scrubbed preview, never verbatim.

use crate::text::is_invisible;
use crate::text::normalize::is_any_digit;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Chars kept in an event payload preview
pub const PAYLOAD_PREVIEW_CHARS: usize = 64;

/// Kind of security event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventType {
    /// Evasion indicators found in the input
    BypassAttempt,
    /// Client exceeded its request budget
    RateLimitExceeded,
    /// Input rejected by validation
    InvalidInput,
    /// Sensitive residue found after the normal path
    ResultValidationFailed,
    /// Bypass attempts reached the alert threshold
    AlertThresholdReached,
}

impl SecurityEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BypassAttempt => "BYPASS_ATTEMPT",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::InvalidInput => "INVALID_INPUT",
            Self::ResultValidationFailed => "RESULT_VALIDATION_FAILED",
            Self::AlertThresholdReached => "ALERT_THRESHOLD_REACHED",
        }
    }
}

impl std::fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threat level of a security event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// A recorded security event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// Unique event id
    pub id: String,
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
    /// Event kind
    pub event_type: SecurityEventType,
    /// Scrubbed, truncated preview of the offending input
    pub payload: String,
    /// Threat level
    pub threat_level: ThreatLevel,
    /// Free-form details
    pub details: String,
}

impl SecurityEvent {
    /// Create an event. `payload` is scrubbed before it is stored.
    pub fn new(
        event_type: SecurityEventType,
        payload: &str,
        threat_level: ThreatLevel,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            payload: payload_preview(payload),
            threat_level,
            details: details.into(),
        }
    }
}

/// Digits become `#`, invisibles are shown as `?`, and the result is cut
/// to [`PAYLOAD_PREVIEW_CHARS`].
pub fn payload_preview(text: &str) -> String {
    let mut preview: String = text
        .chars()
        .take(PAYLOAD_PREVIEW_CHARS)
        .map(|c| {
            if is_any_digit(c) {
                '#'
            } else if is_invisible(c) {
                '?'
            } else {
                c
            }
        })
        .collect();
    if text.chars().count() > PAYLOAD_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

/// Bounded in-memory security event log
#[derive(Debug)]
pub struct SecurityEventLog {
    events: RwLock<VecDeque<SecurityEvent>>,
    max_events: usize,
    retained: usize,
}

impl SecurityEventLog {
    /// Create a log trimmed to `retained` entries once it exceeds
    /// `max_events`.
    pub fn new(max_events: usize, retained: usize) -> Self {
        let max_events = max_events.max(1);
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events,
            retained: retained.min(max_events),
        }
    }

    /// Append an event, trimming the oldest entries if needed.
    pub fn record(&self, event: SecurityEvent) {
        let mut events = self.events.write();
        events.push_back(event);
        if events.len() > self.max_events {
            let excess = events.len() - self.retained;
            events.drain(..excess);
            tracing::debug!(dropped = excess, "Security event log trimmed");
        }
    }

    /// All events, oldest first.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.read().iter().cloned().collect()
    }

    /// The `n` most recent events, newest first.
    pub fn recent(&self, n: usize) -> Vec<SecurityEvent> {
        self.events.read().iter().rev().take(n).cloned().collect()
    }

    /// Events of one kind, oldest first.
    pub fn of_type(&self, event_type: SecurityEventType) -> Vec<SecurityEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn count_by_type(&self) -> HashMap<SecurityEventType, usize> {
        let mut counts = HashMap::new();
        for event in self.events.read().iter() {
            *counts.entry(event.event_type).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl Default for SecurityEventLog {
    fn default() -> Self {
        Self::new(1000, 500)
    }
}
