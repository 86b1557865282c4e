//! Security hardening
//!
//! Rate limiting, input validation, bypass detection, the aggressive
//! fallback and the security event log, composed by [`SecurityLayer`].

pub mod bypass;
pub mod events;
pub mod input;
pub mod layer;
pub mod rate_limit;

pub use bypass::{BypassDetector, BypassIndicator};
pub use events::{SecurityEvent, SecurityEventLog, SecurityEventType, ThreatLevel};
pub use input::InputValidator;
pub use layer::SecurityLayer;
pub use rate_limit::RateLimiter;
