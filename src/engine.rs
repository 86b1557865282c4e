//! DLP engine facade
//!
//! [`DlpEngine`] is the public call surface. It owns the result cache and
//! routes text either through the desensitizer manager (plugin mode) or the
//! pattern matcher engine (legacy mode). The hardened path, struct walking
//! and detection are reached through the same handle.

use crate::cache::{CacheKeyCodec, CacheStats, LruResultCache, NoopCache, ResultCache};
use crate::config::{EngineMode, SafeMaskConfig};
use crate::desensitizer::{Desensitizer, DesensitizerOptions, RegexDesensitizer};
use crate::error::{Error, Result};
use crate::manager::{DesensitizationResult, DesensitizerManager};
use crate::matcher::{Match, MatchEngine, PatternMatcher};
use crate::security::{SecurityEvent, SecurityLayer};
use crate::structs::StructProcessor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry point for masking text, typed values and structs.
///
/// All methods take `&self`; share the engine behind an `Arc`.
pub struct DlpEngine {
    enabled: Arc<AtomicBool>,
    mode: RwLock<EngineMode>,
    matchers: Arc<RwLock<MatchEngine>>,
    manager: Arc<DesensitizerManager>,
    security: SecurityLayer,
    structs: StructProcessor,
    cache: Arc<dyn ResultCache>,
    codec: CacheKeyCodec,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Manager version the cache contents were computed against
    seen_version: AtomicU64,
}

impl DlpEngine {
    /// Engine with the default configuration.
    pub fn new() -> Self {
        Self::assemble(
            &SafeMaskConfig::default(),
            Arc::new(DesensitizerManager::with_defaults()),
            MatchEngine::with_builtin(),
        )
    }

    /// Build an engine from configuration, registering every configured
    /// rule on both processing paths.
    pub fn from_config(config: &SafeMaskConfig) -> Result<Self> {
        let manager = Arc::new(DesensitizerManager::with_defaults());
        manager.set_precedence(config.detection.precedence.clone());

        let mut options = DesensitizerOptions::new();
        options.insert(
            "mask_char".to_string(),
            serde_json::Value::String(config.detection.mask_char.to_string()),
        );
        options.insert(
            "residue_check".to_string(),
            serde_json::Value::Bool(config.detection.residue_check),
        );
        for desensitizer in manager.desensitizers() {
            desensitizer.configure(&options)?;
        }

        let mut matchers = MatchEngine::with_builtin();
        let mask_char = config.detection.mask_char;
        for rule in &config.rules {
            let desensitizer = RegexDesensitizer::new(&rule.name, &rule.pattern, rule.types.clone())?
                .with_strategy(rule.strategy.clone());
            desensitizer.configure(&options)?;
            manager.register(Arc::new(desensitizer))?;

            let kind = rule.types.first().cloned().unwrap_or_else(|| rule.name.clone());
            let strategy = rule.strategy.clone();
            let matcher = PatternMatcher::new(&rule.name, kind, &rule.pattern)?
                .with_priority(rule.priority)
                .with_transformer(move |value| strategy.apply(value, mask_char));
            matchers.add_matcher(matcher)?;
            tracing::debug!(rule = %rule.name, "Rule registered");
        }

        let engine = Self::assemble(config, manager, matchers);
        tracing::info!(
            mode = config.engine.mode.as_str(),
            rules = config.rules.len(),
            cache_capacity = config.engine.cache_capacity,
            "DLP engine initialized"
        );
        Ok(engine)
    }

    fn assemble(
        config: &SafeMaskConfig,
        manager: Arc<DesensitizerManager>,
        matchers: MatchEngine,
    ) -> Self {
        let cache: Arc<dyn ResultCache> = if config.engine.cache_capacity == 0 {
            Arc::new(NoopCache)
        } else {
            Arc::new(LruResultCache::new(config.engine.cache_capacity))
        };
        let security = SecurityLayer::new(Arc::clone(&manager), &config.security)
            .with_mask_char(config.detection.mask_char);
        let enabled = Arc::new(AtomicBool::new(config.engine.enabled));
        let matchers = Arc::new(RwLock::new(matchers));
        let structs = StructProcessor::new(Arc::clone(&manager), config.structs.max_depth)
            .with_matchers(Arc::clone(&matchers))
            .with_switch(Arc::clone(&enabled));
        Self {
            enabled,
            mode: RwLock::new(config.engine.mode),
            matchers,
            seen_version: AtomicU64::new(manager.version()),
            manager,
            security,
            structs,
            cache,
            codec: CacheKeyCodec::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // ---- switches ----

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn mode(&self) -> EngineMode {
        *self.mode.read()
    }

    pub fn set_mode(&self, mode: EngineMode) {
        *self.mode.write() = mode;
    }

    // ---- text ----

    /// Mask every sensitive substring in `text`.
    ///
    /// Never fails: on a processing error the text is returned unchanged
    /// and the error is logged.
    pub fn desensitize_text(&self, text: &str) -> String {
        match self.try_desensitize_text(text) {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(error = %e, "Text desensitization failed, passing through");
                text.to_string()
            }
        }
    }

    /// [`desensitize_text`](Self::desensitize_text) with a deadline checked
    /// on entry. Work already started is not interrupted.
    pub fn desensitize_text_until(&self, text: &str, deadline: Instant) -> Result<String> {
        if Instant::now() >= deadline {
            return Err(Error::DeadlineExceeded);
        }
        self.try_desensitize_text(text)
    }

    /// [`desensitize_text_until`](Self::desensitize_text_until) with a
    /// relative timeout.
    pub fn desensitize_text_within(&self, text: &str, timeout: Duration) -> Result<String> {
        self.desensitize_text_until(text, Instant::now() + timeout)
    }

    fn try_desensitize_text(&self, text: &str) -> Result<String> {
        if !self.is_enabled() || text.is_empty() {
            return Ok(text.to_string());
        }
        self.sync_version();

        let mode = self.mode();
        let key = self.codec.key_with_context("text", mode.as_str(), text);
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }

        let out = match mode {
            EngineMode::Plugin => {
                let matcher_only = self.matcher_only_kinds();
                let pre = self.matchers.read().replace_kinds(text, &matcher_only);
                self.manager.auto_detect_and_process(&pre)?
            }
            EngineMode::Legacy => self.matchers.read().replace_all_types(text),
        };
        self.cache.put(key, out.clone());
        Ok(out)
    }

    /// Matcher kinds no desensitizer handles (IPs, tokens, secrets). The
    /// plugin path masks these with the matchers before auto-detection.
    fn matcher_only_kinds(&self) -> Vec<String> {
        let kinds = self.matchers.read().kinds();
        kinds
            .into_iter()
            .filter(|kind| self.manager.names_for_type(kind).is_empty())
            .collect()
    }

    // ---- typed ----

    /// Mask `text` as `kind`, passing it through unchanged on error.
    pub fn desensitize_specific_type(&self, text: &str, kind: &str) -> String {
        match self.try_desensitize_specific_type(text, kind) {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Typed desensitization failed, passing through");
                text.to_string()
            }
        }
    }

    /// Mask `text` as `kind`.
    ///
    /// Uses the first enabled desensitizer for `kind`. Kinds no
    /// desensitizer is registered for fall back to the matchers of that
    /// kind. Fails with a processing error if neither applies.
    pub fn try_desensitize_specific_type(&self, text: &str, kind: &str) -> Result<String> {
        if !self.is_enabled() || text.is_empty() {
            return Ok(text.to_string());
        }
        self.sync_version();

        let key = self.codec.key_with_context("type", kind, text);
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }

        let out = mask_as_type(&self.manager, &self.matchers, kind, text)?;
        self.cache.put(key, out.clone());
        Ok(out)
    }

    /// Typed masking with timing, desensitizer name and error detail.
    pub fn desensitize_detailed(&self, text: &str, kind: &str) -> DesensitizationResult {
        if !self.is_enabled() {
            return DesensitizationResult::unchanged(text, kind);
        }
        self.manager.process_detailed(kind, text)
    }

    /// Every validated match, grouped by kind.
    pub fn detect_sensitive_info(&self, text: &str) -> HashMap<String, Vec<Match>> {
        if !self.is_enabled() || text.is_empty() {
            return HashMap::new();
        }
        self.matchers.read().detect_grouped(text)
    }

    // ---- hardened path ----

    /// Rate-limited, validated, bypass-aware masking for `client_id`.
    pub fn secure_desensitize(&self, client_id: &str, text: &str) -> Result<String> {
        if !self.is_enabled() {
            return Ok(text.to_string());
        }
        self.security.secure_desensitize(client_id, text)
    }

    /// Snapshot of the security event log, oldest first.
    pub fn security_events(&self) -> Vec<SecurityEvent> {
        self.security.events().events()
    }

    pub fn security(&self) -> &SecurityLayer {
        &self.security
    }

    // ---- structs ----

    pub fn struct_processor(&self) -> &StructProcessor {
        &self.structs
    }

    // ---- registration ----

    /// Add a matcher to the legacy path.
    pub fn register_custom_matcher(&self, matcher: PatternMatcher) -> Result<()> {
        let name = matcher.name().to_string();
        self.matchers.write().add_matcher(matcher)?;
        self.cache.clear();
        tracing::info!(matcher = %name, "Custom matcher registered");
        Ok(())
    }

    /// Replace a matcher with the same name.
    pub fn update_custom_matcher(&self, matcher: PatternMatcher) -> Result<()> {
        self.matchers.write().update_matcher(matcher)?;
        self.cache.clear();
        Ok(())
    }

    pub fn remove_custom_matcher(&self, name: &str) -> bool {
        let removed = self.matchers.write().remove_matcher(name);
        if removed {
            self.cache.clear();
        }
        removed
    }

    pub fn matcher_names(&self) -> Vec<String> {
        self.matchers.read().matcher_names()
    }

    pub fn register_custom_desensitizer(&self, desensitizer: Arc<dyn Desensitizer>) -> Result<()> {
        self.manager.register(desensitizer)
    }

    /// Insert or replace a desensitizer; returns the new manager version.
    pub fn upsert_desensitizer(&self, desensitizer: Arc<dyn Desensitizer>) -> Result<u64> {
        self.manager.upsert(desensitizer)
    }

    pub fn enable_desensitizer(&self, name: &str) -> Result<()> {
        self.manager.enable_desensitizer(name)
    }

    pub fn disable_desensitizer(&self, name: &str) -> Result<()> {
        self.manager.disable_desensitizer(name)
    }

    /// Apply options to one desensitizer; returns the new manager version.
    pub fn configure_desensitizer(&self, name: &str, options: &DesensitizerOptions) -> Result<u64> {
        self.manager.configure_desensitizer(name, options)
    }

    pub fn manager(&self) -> &Arc<DesensitizerManager> {
        &self.manager
    }

    // ---- cache ----

    /// Drop the engine cache and every desensitizer cache. Counters are
    /// kept.
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.manager.clear_caches();
    }

    /// Engine cache `(hits, misses)`.
    pub fn cache_stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    pub fn cache_statistics(&self) -> CacheStats {
        let (hits, misses) = self.cache_stats();
        CacheStats {
            hits,
            misses,
            size: self.cache.len(),
            capacity: self.cache.capacity(),
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match self.cache.get(key) {
            Some(hit) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(hit)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Drop cached results computed against an older registry.
    fn sync_version(&self) {
        let current = self.manager.version();
        let seen = self.seen_version.swap(current, Ordering::SeqCst);
        if seen != current {
            tracing::debug!(from = seen, to = current, "Registry changed, clearing result cache");
            self.cache.clear();
        }
    }
}

/// Typed masking shared by the engine and the struct processor.
///
/// Kinds with no registered desensitizer are handed to the matchers of that
/// kind; a kind whose desensitizers are all disabled is not.
pub(crate) fn mask_as_type(
    manager: &DesensitizerManager,
    matchers: &RwLock<MatchEngine>,
    kind: &str,
    text: &str,
) -> Result<String> {
    match manager.process_with_type(kind, text) {
        Err(e @ Error::Processing(_)) if manager.names_for_type(kind).is_empty() => {
            let matchers = matchers.read();
            if matchers.has_kind(kind) {
                Ok(matchers.replace_by_type(text, kind))
            } else {
                Err(e)
            }
        }
        other => other,
    }
}

impl Default for DlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DlpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DlpEngine")
            .field("enabled", &self.is_enabled())
            .field("mode", &self.mode())
            .field("desensitizers", &self.manager.len())
            .field("cache", &self.cache_statistics())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use crate::desensitizer::MaskStrategy;

    // ---- text ----

    #[test]
    fn test_mixed_text_plugin_mode() {
        let engine = DlpEngine::new();
        assert_eq!(
            engine.desensitize_text("手机13812345678邮箱test@example.com"),
            "手机138****5678邮箱t**t@example.com"
        );
    }

    #[test]
    fn test_plugin_mode_masks_matcher_only_kinds() {
        let engine = DlpEngine::new();
        let out = engine.desensitize_text("host 192.168.1.20 phone 13812345678");
        assert!(!out.contains("192.168.1.20"), "{out}");
        assert!(out.contains("138****5678"), "{out}");
    }

    #[test]
    fn test_legacy_mode() {
        let engine = DlpEngine::new();
        engine.set_mode(EngineMode::Legacy);
        let out = engine.desensitize_text("call 13812345678");
        assert_eq!(out, "call 138****5678");
    }

    #[test]
    fn test_disabled_engine_passes_through() {
        let engine = DlpEngine::new();
        engine.disable();
        assert_eq!(engine.desensitize_text("13812345678"), "13812345678");
        assert_eq!(engine.desensitize_specific_type("13812345678", "phone"), "13812345678");
        assert!(engine.detect_sensitive_info("13812345678").is_empty());
        assert_eq!(engine.secure_desensitize("c1", "").unwrap(), "");
        assert_eq!(engine.cache_stats(), (0, 0));
    }

    #[test]
    fn test_deadline_checked_on_entry() {
        let engine = DlpEngine::new();
        let past = Instant::now() - Duration::from_millis(1);
        assert!(matches!(
            engine.desensitize_text_until("13812345678", past),
            Err(Error::DeadlineExceeded)
        ));
        assert_eq!(
            engine
                .desensitize_text_within("13812345678", Duration::from_secs(5))
                .unwrap(),
            "138****5678"
        );
    }

    // ---- typed ----

    #[test]
    fn test_specific_type() {
        let engine = DlpEngine::new();
        assert_eq!(engine.desensitize_specific_type("13812345678", "phone"), "138****5678");
        assert_eq!(engine.desensitize_specific_type("张三", "chinese_name"), "张*");
    }

    #[test]
    fn test_specific_type_falls_back_to_matchers() {
        let engine = DlpEngine::new();
        let out = engine.try_desensitize_specific_type("ip 10.0.0.1", "ipv4").unwrap();
        assert!(!out.contains("10.0.0.1"), "{out}");
    }

    #[test]
    fn test_disabled_desensitizer_is_not_replaced_by_matcher() {
        let engine = DlpEngine::new();
        engine.disable_desensitizer("phone").unwrap();
        assert_eq!(engine.desensitize_specific_type("13812345678", "phone"), "13812345678");
    }

    #[test]
    fn test_unknown_type_fails_open() {
        let engine = DlpEngine::new();
        assert!(matches!(
            engine.try_desensitize_specific_type("E1234", "passport"),
            Err(Error::Processing(_))
        ));
        assert_eq!(engine.desensitize_specific_type("E1234", "passport"), "E1234");
    }

    #[test]
    fn test_detailed() {
        let engine = DlpEngine::new();
        let result = engine.desensitize_detailed("13812345678", "phone");
        assert_eq!(result.desensitized, "138****5678");
        assert_eq!(result.desensitizer_name, "phone");
        assert!(result.error.is_none());

        engine.disable();
        let result = engine.desensitize_detailed("13812345678", "phone");
        assert_eq!(result.desensitized, "13812345678");
    }

    #[test]
    fn test_detect_sensitive_info() {
        let engine = DlpEngine::new();
        let found = engine.detect_sensitive_info("13812345678 test@example.com");
        assert_eq!(found["phone"][0].text, "13812345678");
        assert_eq!(found["email"][0].text, "test@example.com");
    }

    // ---- cache ----

    #[test]
    fn test_cache_hits_and_misses() {
        let engine = DlpEngine::new();
        let first = engine.desensitize_specific_type("13812345678", "phone");
        let second = engine.desensitize_specific_type("13812345678", "phone");
        assert_eq!(first, second);
        assert_eq!(engine.cache_stats(), (1, 1));
        assert_eq!(engine.cache_statistics().size, 1);

        engine.clear_cache();
        assert_eq!(engine.cache_statistics().size, 0);
        assert_eq!(engine.cache_stats(), (1, 1));
    }

    #[test]
    fn test_disable_desensitizer_invalidates_cache() {
        let engine = DlpEngine::new();
        assert_eq!(engine.desensitize_text("13812345678"), "138****5678");
        engine.disable_desensitizer("phone").unwrap();
        assert_eq!(engine.desensitize_text("13812345678"), "13812345678");
        engine.enable_desensitizer("phone").unwrap();
        assert_eq!(engine.desensitize_text("13812345678"), "138****5678");
        assert!(engine.disable_desensitizer("missing").is_err());
    }

    #[test]
    fn test_registry_change_invalidates_cache() {
        let engine = DlpEngine::new();
        assert_eq!(engine.desensitize_text("ref ORD-1234"), "ref ORD-1234");
        let rule = RegexDesensitizer::new("order", r"ORD-\d{4}", vec![]).unwrap();
        engine.register_custom_desensitizer(Arc::new(rule)).unwrap();
        assert_eq!(engine.desensitize_text("ref ORD-1234"), "ref ********");
    }

    #[test]
    fn test_manager_switch_invalidates_cache() {
        let engine = DlpEngine::new();
        assert_eq!(engine.desensitize_text("13812345678"), "138****5678");
        engine.manager().disable();
        assert_eq!(engine.desensitize_text("13812345678"), "13812345678");
        engine.manager().enable();
        assert_eq!(engine.desensitize_text("13812345678"), "138****5678");

        engine.manager().disable_desensitizer("phone").unwrap();
        assert_eq!(
            engine.desensitize_specific_type("13812345678", "phone"),
            "13812345678"
        );
    }

    #[test]
    fn test_reconfigure_invalidates_cache() {
        let engine = DlpEngine::new();
        assert_eq!(engine.desensitize_text("call 13812345678"), "call 138****5678");
        assert_eq!(engine.desensitize_specific_type("13812345678", "phone"), "138****5678");

        let mut options = DesensitizerOptions::new();
        options.insert("mask_char".into(), serde_json::Value::String("#".into()));
        engine.configure_desensitizer("phone", &options).unwrap();
        assert_eq!(engine.desensitize_text("call 13812345678"), "call 138####5678");
        assert_eq!(engine.desensitize_specific_type("13812345678", "phone"), "138####5678");
    }

    #[test]
    fn test_precedence_change_invalidates_cache() {
        let engine = DlpEngine::new();
        let before = engine.manager().version();
        engine.desensitize_text("13812345678");
        engine.manager().set_precedence(vec!["email".into(), "phone".into()]);
        assert!(engine.manager().version() > before);
        engine.desensitize_text("13812345678");
        // the second call recomputed instead of hitting the stale entry
        assert_eq!(engine.cache_stats(), (0, 2));
    }

    // ---- partially masked input ----

    #[test]
    fn test_partially_masked_text_still_scanned() {
        let engine = DlpEngine::new();
        let out = engine.desensitize_text("card 6225****4324 password=hunter2 key sk-abcdefghijklmnop1234");
        assert!(out.contains("6225****4324"), "{out}");
        assert!(!out.contains("hunter2"), "{out}");
        assert!(!out.contains("abcdefghijklmnop"), "{out}");
    }

    // ---- structs ----

    #[test]
    fn test_struct_fields_use_engine_typed_path() {
        use crate::structs::{Desensitize, FieldAction, FieldWalker};

        struct Session {
            host: String,
            phone: String,
        }

        impl Desensitize for Session {
            fn apply(&mut self, w: &mut FieldWalker<'_>, action: &FieldAction) {
                w.nested(action, |w| {
                    w.field("host", "ipv4", &mut self.host);
                    w.field("phone", "phone", &mut self.phone);
                });
            }
        }

        let engine = DlpEngine::new();
        let mut session = Session {
            host: "192.168.10.1".into(),
            phone: "13812345678".into(),
        };
        let report = engine.struct_processor().process(&mut session);
        assert!(report.is_clean(), "{:?}", report.errors);
        assert_ne!(session.host, "192.168.10.1");
        assert_eq!(session.phone, "138****5678");

        engine.disable();
        let mut session = Session {
            host: "192.168.10.1".into(),
            phone: "13812345678".into(),
        };
        let report = engine.struct_processor().process(&mut session);
        assert!(report.is_clean());
        assert_eq!(report.processed, 0);
        assert_eq!(session.host, "192.168.10.1");
        assert_eq!(session.phone, "13812345678");
    }

    // ---- registration ----

    #[test]
    fn test_custom_matcher() {
        let engine = DlpEngine::new();
        engine.set_mode(EngineMode::Legacy);
        let matcher = PatternMatcher::new("ticket", "ticket", r"TKT-\d+")
            .unwrap()
            .with_priority(90);
        engine.register_custom_matcher(matcher.clone()).unwrap();
        assert!(engine.register_custom_matcher(matcher).is_err());
        assert_eq!(engine.desensitize_text("see TKT-42"), "see ******");
        assert!(engine.matcher_names().contains(&"ticket".to_string()));

        assert!(engine.remove_custom_matcher("ticket"));
        assert_eq!(engine.desensitize_text("see TKT-42"), "see TKT-42");
    }

    #[test]
    fn test_upsert_bumps_version() {
        let engine = DlpEngine::new();
        let before = engine.manager().version();
        let rule = RegexDesensitizer::new("order", r"ORD-\d{4}", vec![]).unwrap();
        let after = engine.upsert_desensitizer(Arc::new(rule)).unwrap();
        assert!(after > before);
    }

    // ---- config ----

    #[test]
    fn test_from_config_rules_on_both_paths() {
        let mut config = SafeMaskConfig::default();
        config.rules.push(RuleConfig {
            name: "employee".into(),
            pattern: r"EMP(?P<value>\d{6})".into(),
            types: vec!["employee_id".into()],
            priority: 60,
            strategy: MaskStrategy::KeepEnds { prefix: 0, suffix: 2 },
        });
        let engine = DlpEngine::from_config(&config).unwrap();
        assert_eq!(engine.desensitize_text("id EMP123456"), "id EMP****56");
        assert_eq!(
            engine.desensitize_specific_type("EMP123456", "employee_id"),
            "EMP****56"
        );

        engine.set_mode(EngineMode::Legacy);
        assert_eq!(engine.desensitize_text("id EMP123456"), "id EMP****56");
    }

    #[test]
    fn test_from_config_mask_char_and_precedence() {
        let mut config = SafeMaskConfig::default();
        config.detection.mask_char = '#';
        let engine = DlpEngine::from_config(&config).unwrap();
        assert_eq!(engine.desensitize_text("13812345678"), "138####5678");
    }

    #[test]
    fn test_from_config_rejects_bad_rule() {
        let mut config = SafeMaskConfig::default();
        config.rules.push(RuleConfig {
            name: "broken".into(),
            pattern: "(".into(),
            types: vec![],
            priority: 50,
            strategy: MaskStrategy::Full,
        });
        assert!(matches!(
            DlpEngine::from_config(&config),
            Err(Error::InvalidPattern { .. })
        ));

        let mut config = SafeMaskConfig::default();
        config.rules.push(RuleConfig {
            name: "phone".into(),
            pattern: r"\d+".into(),
            types: vec![],
            priority: 50,
            strategy: MaskStrategy::Full,
        });
        assert!(matches!(DlpEngine::from_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_disabled_in_config() {
        let mut config = SafeMaskConfig::default();
        config.engine.enabled = false;
        let engine = DlpEngine::from_config(&config).unwrap();
        assert!(!engine.is_enabled());
        assert_eq!(engine.desensitize_text("13812345678"), "13812345678");
    }
}
