//! Per-desensitizer metrics and call results

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Running call metrics for one desensitizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DesensitizerMetrics {
    pub total_calls: u64,
    pub error_count: u64,
    pub total_duration_nanos: u64,
    pub avg_duration_nanos: u64,
    /// `1 - error_count / total_calls`; 1.0 before the first call
    pub success_rate: f64,
}

impl DesensitizerMetrics {
    pub(crate) fn record(&mut self, elapsed: Duration, failed: bool) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_calls += 1;
        if failed {
            self.error_count += 1;
        }
        self.total_duration_nanos = self.total_duration_nanos.saturating_add(nanos);
        self.avg_duration_nanos = self.total_duration_nanos / self.total_calls;
        self.success_rate = 1.0 - self.error_count as f64 / self.total_calls as f64;
    }
}

/// Snapshot returned by `DesensitizerManager::stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManagerStats {
    /// Registered desensitizers
    pub total: usize,
    /// Currently enabled desensitizers
    pub enabled: usize,
    /// Number of desensitizers registered per type
    pub type_coverage: HashMap<String, usize>,
    /// Call metrics keyed by desensitizer name
    pub desensitizers: HashMap<String, DesensitizerMetrics>,
    /// Registry version at snapshot time
    pub version: u64,
}

/// Outcome of one detailed call. Produced per call, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct DesensitizationResult {
    #[serde(skip)]
    pub original: String,
    pub desensitized: String,
    pub type_used: String,
    pub desensitizer_name: String,
    pub duration_nanos: u64,
    pub from_cache: bool,
    /// Set when processing failed; `desensitized` then equals the input
    pub error: Option<String>,
}

impl DesensitizationResult {
    /// A result that leaves `text` as is.
    pub fn unchanged(text: &str, kind: &str) -> Self {
        Self {
            original: text.to_string(),
            desensitized: text.to_string(),
            type_used: kind.to_string(),
            desensitizer_name: String::new(),
            duration_nanos: 0,
            from_cache: false,
            error: None,
        }
    }
}
