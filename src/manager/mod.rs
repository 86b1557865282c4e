//! Desensitizer registry and dispatch
//!
//! The manager owns the name index, the type mapping and per-desensitizer
//! metrics. Every change that can alter output (registration, switches,
//! options, precedence) bumps a monotonic version that upstream result
//! caches compare against to detect hot reloads.

pub mod stats;

pub use stats::{DesensitizationResult, DesensitizerMetrics, ManagerStats};

use crate::desensitizer::{
    BankCardDesensitizer, ChineseNameDesensitizer, Desensitizer, DesensitizerOptions,
    EmailDesensitizer, IdCardDesensitizer, PhoneDesensitizer,
};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Type precedence used when the input category is ambiguous.
pub const DEFAULT_PRECEDENCE: &[&str] = &["phone", "email", "id_card", "bank_card", "chinese_name"];

struct ManagerEntry {
    name: String,
    desensitizer: Arc<dyn Desensitizer>,
    supported_types: Vec<String>,
}

impl ManagerEntry {
    fn new(desensitizer: Arc<dyn Desensitizer>) -> Self {
        let supported_types = desensitizer
            .as_type_aware()
            .map(|t| t.supported_types())
            .unwrap_or_default();
        Self {
            name: desensitizer.name().to_string(),
            desensitizer,
            supported_types,
        }
    }
}

#[derive(Default)]
struct Registry {
    /// Registration order
    entries: Vec<ManagerEntry>,
    /// type -> names, in registration order
    type_mapping: HashMap<String, Vec<String>>,
}

impl Registry {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    fn rebuild_type_mapping(&mut self) {
        let mut mapping: HashMap<String, Vec<String>> = HashMap::new();
        for entry in &self.entries {
            for kind in &entry.supported_types {
                let names = mapping.entry(kind.clone()).or_default();
                if !names.contains(&entry.name) {
                    names.push(entry.name.clone());
                }
            }
        }
        self.type_mapping = mapping;
    }

    /// First enabled desensitizer registered for `kind`.
    fn first_enabled_for(&self, kind: &str) -> Option<Arc<dyn Desensitizer>> {
        let names = self.type_mapping.get(kind)?;
        names.iter().find_map(|name| {
            let entry = &self.entries[self.position(name)?];
            entry
                .desensitizer
                .is_enabled()
                .then(|| entry.desensitizer.clone())
        })
    }
}

/// Cached result of `supported_types`, tagged with the registry version it
/// was computed at.
#[derive(Default)]
struct TypesSnapshot {
    version: Option<u64>,
    types: Vec<String>,
}

/// Registry of desensitizers with type dispatch and auto-detection.
pub struct DesensitizerManager {
    /// Entries and type mapping
    registry: RwLock<Registry>,
    /// Bumped on every register/upsert/unregister
    version: AtomicU64,
    /// Manager-wide switch; disabled means pass-through
    enabled: AtomicBool,
    /// Call metrics keyed by desensitizer name
    stats: RwLock<HashMap<String, DesensitizerMetrics>>,
    /// Type order for the ambiguous-input pass
    precedence: RwLock<Vec<String>>,
    /// Version-guarded `supported_types` snapshot
    types_snapshot: RwLock<TypesSnapshot>,
}

impl DesensitizerManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            version: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
            stats: RwLock::new(HashMap::new()),
            precedence: RwLock::new(DEFAULT_PRECEDENCE.iter().map(|s| s.to_string()).collect()),
            types_snapshot: RwLock::new(TypesSnapshot::default()),
        }
    }

    /// Create a manager with the built-in desensitizers registered in
    /// precedence order.
    pub fn with_defaults() -> Self {
        let manager = Self::new();
        let builtins: Vec<Arc<dyn Desensitizer>> = vec![
            Arc::new(PhoneDesensitizer::new()),
            Arc::new(EmailDesensitizer::new()),
            Arc::new(IdCardDesensitizer::new()),
            Arc::new(BankCardDesensitizer::new()),
            Arc::new(ChineseNameDesensitizer::new()),
        ];
        for d in builtins {
            // names are distinct, so registration cannot fail
            let _ = manager.register(d);
        }
        manager
    }

    /// Register a desensitizer. Fails on an empty or duplicate name.
    pub fn register(&self, desensitizer: Arc<dyn Desensitizer>) -> Result<()> {
        let entry = ManagerEntry::new(desensitizer);
        if entry.name.is_empty() {
            return Err(Error::Config("desensitizer name cannot be empty".to_string()));
        }

        let mut registry = self.registry.write();
        if registry.position(&entry.name).is_some() {
            return Err(Error::Config(format!(
                "desensitizer '{}' is already registered",
                entry.name
            )));
        }
        let name = entry.name.clone();
        let types = entry.supported_types.len();
        registry.entries.push(entry);
        registry.rebuild_type_mapping();
        let version = self.bump_version();
        drop(registry);

        tracing::info!(desensitizer = %name, types, version, "Desensitizer registered");
        Ok(())
    }

    /// Register or replace a desensitizer, keeping the slot of a replaced
    /// entry. Returns the new version, always greater than the previous one.
    pub fn upsert(&self, desensitizer: Arc<dyn Desensitizer>) -> Result<u64> {
        let entry = ManagerEntry::new(desensitizer);
        if entry.name.is_empty() {
            return Err(Error::Config("desensitizer name cannot be empty".to_string()));
        }

        let mut registry = self.registry.write();
        let name = entry.name.clone();
        let replaced = match registry.position(&name) {
            Some(i) => {
                registry.entries[i] = entry;
                true
            }
            None => {
                registry.entries.push(entry);
                false
            }
        };
        registry.rebuild_type_mapping();
        let version = self.bump_version();
        drop(registry);

        if replaced {
            self.stats.write().remove(&name);
        }
        tracing::info!(desensitizer = %name, replaced, version, "Desensitizer upserted");
        Ok(version)
    }

    /// Remove a desensitizer by name.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.write();
        let Some(i) = registry.position(name) else {
            return Err(Error::Validation(format!("desensitizer '{}' not found", name)));
        };
        registry.entries.remove(i);
        registry.rebuild_type_mapping();
        let version = self.bump_version();
        drop(registry);

        self.stats.write().remove(name);
        tracing::info!(desensitizer = name, version, "Desensitizer unregistered");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Desensitizer>> {
        let registry = self.registry.read();
        registry
            .position(name)
            .map(|i| registry.entries[i].desensitizer.clone())
    }

    /// All desensitizers in registration order.
    pub fn desensitizers(&self) -> Vec<Arc<dyn Desensitizer>> {
        self.registry
            .read()
            .entries
            .iter()
            .map(|e| e.desensitizer.clone())
            .collect()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.registry.read().entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Names registered for `kind`, in registration order.
    pub fn names_for_type(&self, kind: &str) -> Vec<String> {
        self.registry
            .read()
            .type_mapping
            .get(kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.registry.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        self.bump_version();
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.bump_version();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enable one desensitizer by name.
    pub fn enable_desensitizer(&self, name: &str) -> Result<()> {
        self.require(name)?.enable();
        self.bump_version();
        Ok(())
    }

    /// Disable one desensitizer by name.
    pub fn disable_desensitizer(&self, name: &str) -> Result<()> {
        self.require(name)?.disable();
        self.bump_version();
        Ok(())
    }

    /// Apply options to one desensitizer by name; returns the new version.
    ///
    /// Configure through here rather than on a handle from [`get`](Self::get)
    /// so that result caches keyed on the version are invalidated.
    pub fn configure_desensitizer(&self, name: &str, options: &DesensitizerOptions) -> Result<u64> {
        let desensitizer = self.require(name)?;
        desensitizer.configure(options)?;
        desensitizer.clear_cache();
        let version = self.bump_version();
        tracing::info!(desensitizer = name, version, "Desensitizer reconfigured");
        Ok(version)
    }

    fn require(&self, name: &str) -> Result<Arc<dyn Desensitizer>> {
        self.get(name)
            .ok_or_else(|| Error::Validation(format!("desensitizer '{}' not found", name)))
    }

    /// Replace the type precedence used for ambiguous input.
    pub fn set_precedence(&self, precedence: Vec<String>) {
        *self.precedence.write() = precedence;
        self.bump_version();
    }

    pub fn precedence(&self) -> Vec<String> {
        self.precedence.read().clone()
    }

    /// Every registered type, sorted.
    ///
    /// Served from a snapshot while the registry version is unchanged. The
    /// recomputation happens outside the snapshot lock, and a result is only
    /// stored if no newer snapshot was stored meanwhile.
    pub fn supported_types(&self) -> Vec<String> {
        let current = self.version();
        {
            let snapshot = self.types_snapshot.read();
            if snapshot.version == Some(current) {
                return snapshot.types.clone();
            }
        }

        let mut types: Vec<String> = self.registry.read().type_mapping.keys().cloned().collect();
        types.sort();

        let mut snapshot = self.types_snapshot.write();
        if snapshot.version.map_or(true, |v| v < current) {
            snapshot.version = Some(current);
            snapshot.types = types.clone();
        }
        types
    }

    /// Run the first enabled desensitizer registered for `kind`.
    ///
    /// A disabled manager returns the text unchanged. Fails with a
    /// processing error when no enabled desensitizer handles `kind`.
    pub fn process_with_type(&self, kind: &str, text: &str) -> Result<String> {
        if !self.is_enabled() {
            return Ok(text.to_string());
        }
        let desensitizer = self.registry.read().first_enabled_for(kind).ok_or_else(|| {
            Error::Processing(format!("no desensitizer found for type '{}'", kind))
        })?;
        self.run(desensitizer.as_ref(), text)
    }

    /// Like [`process_with_type`](Self::process_with_type) but never fails:
    /// errors are reported in the result and the text is left unchanged.
    pub fn process_detailed(&self, kind: &str, text: &str) -> DesensitizationResult {
        let start = Instant::now();
        let mut result = DesensitizationResult::unchanged(text, kind);
        if !self.is_enabled() {
            return result;
        }

        match self.registry.read().first_enabled_for(kind) {
            Some(d) => {
                result.desensitizer_name = d.name().to_string();
                let hits_before = d.cache_stats().hits;
                match self.run(d.as_ref(), text) {
                    Ok(out) => {
                        result.from_cache = d.cache_stats().hits > hits_before;
                        result.desensitized = out;
                    }
                    Err(e) => result.error = Some(e.to_string()),
                }
            }
            None => {
                result.error = Some(format!("no desensitizer found for type '{}'", kind));
            }
        }
        result.duration_nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        result
    }

    /// Classify `text` and mask it.
    ///
    /// If exactly one enabled desensitizer validates the whole trimmed input,
    /// only that one runs. Otherwise the input is treated as mixed prose:
    /// desensitizers run over the same buffer in precedence order, then any
    /// remaining enabled desensitizers in registration order. A failing
    /// desensitizer is logged and skipped.
    pub fn auto_detect_and_process(&self, text: &str) -> Result<String> {
        if !self.is_enabled() || text.is_empty() {
            return Ok(text.to_string());
        }

        let (candidates, ordered) = {
            let registry = self.registry.read();
            let trimmed = text.trim();
            let candidates: Vec<Arc<dyn Desensitizer>> = registry
                .entries
                .iter()
                .filter(|e| e.desensitizer.is_enabled())
                .filter(|e| {
                    e.desensitizer.as_type_aware().is_some_and(|aware| {
                        e.supported_types
                            .iter()
                            .any(|kind| aware.validate_type(trimmed, kind))
                    })
                })
                .map(|e| e.desensitizer.clone())
                .collect();
            (candidates, self.ordered_pass(&registry))
        };

        if let [only] = candidates.as_slice() {
            tracing::debug!(desensitizer = only.name(), "Input classified as single type");
            return self.run(only.as_ref(), text);
        }

        tracing::debug!(
            validated = candidates.len(),
            passes = ordered.len(),
            "Input treated as mixed text"
        );
        let mut buffer = text.to_string();
        for d in ordered {
            match self.run(d.as_ref(), &buffer) {
                Ok(out) => buffer = out,
                Err(e) => {
                    tracing::warn!(desensitizer = d.name(), error = %e, "Desensitizer failed, skipping");
                }
            }
        }
        Ok(buffer)
    }

    /// Enabled desensitizers in precedence order, then the rest in
    /// registration order, each at most once.
    fn ordered_pass(&self, registry: &Registry) -> Vec<Arc<dyn Desensitizer>> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for kind in self.precedence.read().iter() {
            if let Some(d) = registry.first_enabled_for(kind) {
                if seen.insert(d.name().to_string()) {
                    ordered.push(d);
                }
            }
        }
        for entry in &registry.entries {
            if entry.desensitizer.is_enabled() && seen.insert(entry.name.clone()) {
                ordered.push(entry.desensitizer.clone());
            }
        }
        ordered
    }

    /// Run one desensitizer and record its metrics.
    fn run(&self, desensitizer: &dyn Desensitizer, text: &str) -> Result<String> {
        let start = Instant::now();
        let result = desensitizer.desensitize(text);
        self.stats
            .write()
            .entry(desensitizer.name().to_string())
            .or_default()
            .record(start.elapsed(), result.is_err());
        result
    }

    /// Clear every desensitizer's local cache.
    pub fn clear_caches(&self) {
        for entry in &self.registry.read().entries {
            entry.desensitizer.clear_cache();
        }
    }

    pub fn stats(&self) -> ManagerStats {
        let registry = self.registry.read();
        ManagerStats {
            total: registry.entries.len(),
            enabled: registry
                .entries
                .iter()
                .filter(|e| e.desensitizer.is_enabled())
                .count(),
            type_coverage: registry
                .type_mapping
                .iter()
                .map(|(k, v)| (k.clone(), v.len()))
                .collect(),
            desensitizers: self.stats.read().clone(),
            version: self.version(),
        }
    }

    /// Metrics for one desensitizer, if it has been called.
    pub fn metrics(&self, name: &str) -> Option<DesensitizerMetrics> {
        self.stats.read().get(name).cloned()
    }
}

impl Default for DesensitizerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DesensitizerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesensitizerManager")
            .field("names", &self.names())
            .field("version", &self.version())
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
