//! SafeMask - Sensitive Data Masking Engine
//!
//! SafeMask finds sensitive substrings in free-form text and tagged
//! structured records (phone numbers, emails, bank cards, ID numbers,
//! tokens) and replaces them with masked forms. It resists deliberate
//! evasion such as zero-width characters, full-width digits, homoglyphs and
//! separator insertion.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           DlpEngine                               │
//! │   enable/disable ─ result cache (CacheKeyCodec + LRU) ─ mode      │
//! │                                                                   │
//! │  plugin mode                         legacy mode                  │
//! │  ┌──────────────────────────┐        ┌────────────────────────┐   │
//! │  │   DesensitizerManager    │        │      MatchEngine       │   │
//! │  │  registry ─ type mapping │        │  PatternMatcher × N    │   │
//! │  │  auto-detect ─ stats     │        │  priority ─ complexity │   │
//! │  └────────────┬─────────────┘        └────────────────────────┘   │
//! │               │                                                   │
//! │  ┌────────────▼─────────────┐        ┌────────────────────────┐   │
//! │  │      Desensitizers       │        │     SecurityLayer      │   │
//! │  │ phone  email  bank_card  │◄───────│ rate limit ─ validation│   │
//! │  │ id_card  chinese_name    │        │ bypass ─ aggressive    │   │
//! │  │ regex rules              │        │ event log              │   │
//! │  └────────────▲─────────────┘        └────────────────────────┘   │
//! │               │                                                   │
//! │  ┌────────────┴─────────────┐                                     │
//! │  │     StructProcessor      │  tagged fields, depth cap           │
//! │  └──────────────────────────┘                                     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: the [`DlpEngine`] facade
//! - [`matcher`]: pattern matchers and the legacy match engine
//! - [`desensitizer`]: per-type desensitizers and the plugin trait
//! - [`manager`]: desensitizer registry and auto-detection
//! - [`security`]: hardened path with bypass detection and rate limiting
//! - [`structs`]: tagged struct walking
//! - [`cache`]: result cache trait, LRU backing and key codec
//! - [`text`]: normalization, validators and mask primitives
//! - [`config`]: configuration management
//!
//! ## Example
//!
//! ```
//! use safemask::DlpEngine;
//!
//! let engine = DlpEngine::new();
//! assert_eq!(engine.desensitize_text("call 13812345678"), "call 138****5678");
//! ```

pub mod cache;
pub mod config;
pub mod desensitizer;
pub mod engine;
pub mod error;
pub mod manager;
pub mod matcher;
pub mod security;
pub mod structs;
pub mod text;

pub use config::SafeMaskConfig;
pub use engine::DlpEngine;
pub use error::{Error, Result};
pub use text::mask;
pub use text::mask::{
    bank_card_desensitize, chinese_name_desensitize, email_desensitize, id_card_desensitize,
    mobile_phone_desensitize,
};
