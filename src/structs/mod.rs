//! Tagged struct processing
//!
//! Types describe their sensitive fields through the [`Desensitize`]
//! visitor; [`StructProcessor`] walks them, masking string leaves through
//! the desensitizer manager or a named custom strategy. Built by the engine,
//! it shares the engine's matchers and master switch, so tagged fields get
//! the same typed masking as `desensitize_specific_type`. A failing field is
//! recorded in the [`StructReport`] and the walk moves on, so one bad field
//! never stops the rest of the value from being masked.

pub mod tag;
pub mod walker;

pub use tag::{FieldAction, FieldPolicy};
pub use walker::{Desensitize, FieldWalker};

use crate::error::{Error, Result};
use crate::manager::DesensitizerManager;
use crate::matcher::MatchEngine;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default recursion cap
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// A named masking function for `custom:<name>` tags
pub type CustomStrategy = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A field that could not be masked
#[derive(Debug)]
pub struct FieldError {
    /// Field path, e.g. `orders[2].card`
    pub path: String,
    pub error: Error,
}

/// Outcome of one walk
#[derive(Debug, Default)]
pub struct StructReport {
    /// String leaves masked
    pub processed: usize,
    /// Fields skipped by tag
    pub skipped: usize,
    /// Per-field failures; those fields keep their original value
    pub errors: Vec<FieldError>,
}

impl StructReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Walks [`Desensitize`] values and masks their tagged fields.
pub struct StructProcessor {
    manager: Arc<DesensitizerManager>,
    matchers: Option<Arc<RwLock<MatchEngine>>>,
    switch: Option<Arc<AtomicBool>>,
    strategies: RwLock<HashMap<String, CustomStrategy>>,
    max_depth: usize,
}

impl StructProcessor {
    pub fn new(manager: Arc<DesensitizerManager>, max_depth: usize) -> Self {
        Self {
            manager,
            matchers: None,
            switch: None,
            strategies: RwLock::new(HashMap::new()),
            max_depth,
        }
    }

    /// Mask kinds no desensitizer handles with these matchers.
    pub fn with_matchers(mut self, matchers: Arc<RwLock<MatchEngine>>) -> Self {
        self.matchers = Some(matchers);
        self
    }

    /// Pass values through untouched while `switch` is off.
    pub fn with_switch(mut self, switch: Arc<AtomicBool>) -> Self {
        self.switch = Some(switch);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.switch
            .as_ref()
            .map_or(true, |switch| switch.load(Ordering::SeqCst))
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Register a strategy for `custom:<name>` tags, replacing any previous
    /// one with that name.
    pub fn register_strategy(
        &self,
        name: impl Into<String>,
        strategy: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Config("strategy name cannot be empty".to_string()));
        }
        tracing::debug!(strategy = %name, "Custom strategy registered");
        self.strategies.write().insert(name, Arc::new(strategy));
        Ok(())
    }

    pub fn unregister_strategy(&self, name: &str) -> bool {
        self.strategies.write().remove(name).is_some()
    }

    pub fn strategy_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Walk `value` as a root struct.
    pub fn process<T: Desensitize + ?Sized>(&self, value: &mut T) -> StructReport {
        self.process_with(value, &FieldAction::Recurse)
    }

    /// Walk `value` with an explicit root action, e.g. masking every string
    /// in a `Vec<String>` as phones.
    pub fn process_with<T: Desensitize + ?Sized>(
        &self,
        value: &mut T,
        action: &FieldAction,
    ) -> StructReport {
        if !self.is_enabled() {
            tracing::debug!("Struct processing skipped, engine disabled");
            return StructReport::default();
        }
        let mut walker = FieldWalker::new(self);
        value.apply(&mut walker, action);
        let report = walker.finish();
        if !report.is_clean() {
            tracing::warn!(
                processed = report.processed,
                errors = report.errors.len(),
                "Struct processed with field errors"
            );
        }
        report
    }

    /// Mask one value as `kind`. Types neither a desensitizer nor a matcher
    /// handles are a validation error.
    pub(crate) fn mask(&self, kind: &str, value: &str) -> Result<String> {
        let matchers = self.matchers.as_deref();
        let known = !self.manager.names_for_type(kind).is_empty()
            || matchers.is_some_and(|m| m.read().has_kind(kind));
        if !known {
            return Err(Error::Validation(format!("unsupported type '{}'", kind)));
        }
        match matchers {
            Some(matchers) => crate::engine::mask_as_type(&self.manager, matchers, kind, value),
            None => self.manager.process_with_type(kind, value),
        }
    }

    pub(crate) fn apply_strategy(&self, name: &str, value: &str) -> Result<String> {
        let strategy = self
            .strategies
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("unknown custom strategy '{}'", name)))?;
        Ok(strategy(value))
    }
}

impl std::fmt::Debug for StructProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructProcessor")
            .field("max_depth", &self.max_depth)
            .field("enabled", &self.is_enabled())
            .field("strategies", &self.strategy_names())
            .finish_non_exhaustive()
    }
}
