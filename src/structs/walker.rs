//! Visitor trait and field walker
//!
//! A type opts in by implementing [`Desensitize`], listing its tagged
//! fields the way a derive macro would:
//!
//! ```
//! use safemask::structs::{Desensitize, FieldAction, FieldWalker};
//!
//! struct Contact {
//!     name: String,
//!     phone: String,
//!     note: String,
//! }
//!
//! impl Desensitize for Contact {
//!     fn apply(&mut self, w: &mut FieldWalker<'_>, action: &FieldAction) {
//!         w.nested(action, |w| {
//!             w.field("name", "chinese_name", &mut self.name);
//!             w.field("phone", "phone", &mut self.phone);
//!             w.field("note", "-", &mut self.note);
//!         });
//!     }
//! }
//! ```

use super::tag::{FieldAction, FieldPolicy};
use super::{FieldError, StructProcessor, StructReport};
use crate::error::Error;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::hash::Hash;

/// A value the struct processor can walk.
pub trait Desensitize {
    /// Apply `action` to this value and everything it contains.
    fn apply(&mut self, walker: &mut FieldWalker<'_>, action: &FieldAction);
}

/// Walk state: current path, depth and the report being built.
pub struct FieldWalker<'a> {
    processor: &'a StructProcessor,
    path: Vec<String>,
    depth: usize,
    report: StructReport,
}

impl<'a> FieldWalker<'a> {
    pub(crate) fn new(processor: &'a StructProcessor) -> Self {
        Self {
            processor,
            path: Vec::new(),
            depth: 0,
            report: StructReport::default(),
        }
    }

    pub(crate) fn finish(self) -> StructReport {
        self.report
    }

    /// Current field path, e.g. `user.addresses[0].phone`.
    pub fn path(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            if !out.is_empty() && !segment.starts_with('[') {
                out.push('.');
            }
            out.push_str(segment);
        }
        out
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Visit one struct field carrying `tag`.
    pub fn field<T: Desensitize + ?Sized>(&mut self, name: &str, tag: &str, value: &mut T) {
        self.path.push(name.to_string());
        match FieldPolicy::parse(tag).action() {
            Some(action) => value.apply(self, &action),
            None => self.report.skipped += 1,
        }
        self.path.pop();
    }

    /// Run `visit` one level deeper if `action` recurses.
    ///
    /// Past the depth cap the subtree is abandoned with a recorded error
    /// and the walk continues with the caller's next field.
    pub fn nested(&mut self, action: &FieldAction, visit: impl FnOnce(&mut Self)) {
        if !action.recurses() {
            return;
        }
        let max = self.processor.max_depth();
        if self.depth >= max {
            let path = self.path();
            tracing::debug!(path = %path, max, "Struct walk depth cap reached");
            self.record_error(Error::DepthExceeded { path, max });
            return;
        }
        self.depth += 1;
        visit(self);
        self.depth -= 1;
    }

    /// Visit a container element under an extra path segment.
    pub fn element<T: Desensitize + ?Sized>(
        &mut self,
        segment: impl Display,
        value: &mut T,
        action: &FieldAction,
    ) {
        self.path.push(format!("[{}]", segment));
        value.apply(self, action);
        self.path.pop();
    }

    /// Apply `action` to a string leaf.
    pub fn leaf(&mut self, value: &mut String, action: &FieldAction) {
        if value.is_empty() {
            return;
        }
        let result = match action {
            FieldAction::Mask { kind, .. } => self.processor.mask(kind, value),
            FieldAction::Custom(name) => self.processor.apply_strategy(name, value),
            FieldAction::Recurse => return,
        };
        match result {
            Ok(masked) => {
                *value = masked;
                self.report.processed += 1;
            }
            Err(e) => self.record_error(e),
        }
    }

    fn record_error(&mut self, error: Error) {
        let path = self.path();
        tracing::debug!(path = %path, error = %error, "Field left unmasked");
        self.report.errors.push(FieldError { path, error });
    }
}

impl std::fmt::Debug for FieldWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldWalker")
            .field("path", &self.path())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Leaf and container impls
// =============================================================================

impl Desensitize for String {
    fn apply(&mut self, walker: &mut FieldWalker<'_>, action: &FieldAction) {
        walker.leaf(self, action);
    }
}

impl<T: Desensitize> Desensitize for Option<T> {
    fn apply(&mut self, walker: &mut FieldWalker<'_>, action: &FieldAction) {
        if let Some(inner) = self {
            inner.apply(walker, action);
        }
    }
}

impl<T: Desensitize + ?Sized> Desensitize for Box<T> {
    fn apply(&mut self, walker: &mut FieldWalker<'_>, action: &FieldAction) {
        (**self).apply(walker, action);
    }
}

impl<T: Desensitize> Desensitize for Vec<T> {
    fn apply(&mut self, walker: &mut FieldWalker<'_>, action: &FieldAction) {
        for (i, item) in self.iter_mut().enumerate() {
            walker.element(i, item, action);
        }
    }
}

impl<T: Desensitize> Desensitize for [T] {
    fn apply(&mut self, walker: &mut FieldWalker<'_>, action: &FieldAction) {
        for (i, item) in self.iter_mut().enumerate() {
            walker.element(i, item, action);
        }
    }
}

impl<K: Display + Eq + Hash, T: Desensitize> Desensitize for HashMap<K, T> {
    fn apply(&mut self, walker: &mut FieldWalker<'_>, action: &FieldAction) {
        for (key, value) in self.iter_mut() {
            walker.element(key, value, action);
        }
    }
}

impl<K: Display + Ord, T: Desensitize> Desensitize for BTreeMap<K, T> {
    fn apply(&mut self, walker: &mut FieldWalker<'_>, action: &FieldAction) {
        for (key, value) in self.iter_mut() {
            walker.element(key, value, action);
        }
    }
}

/// Every string leaf is treated as a field of the enclosing tag. Arrays and
/// objects count towards the depth cap.
impl Desensitize for serde_json::Value {
    fn apply(&mut self, walker: &mut FieldWalker<'_>, action: &FieldAction) {
        use serde_json::Value;

        match self {
            Value::String(s) => walker.leaf(s, action),
            Value::Array(items) => {
                let inner = as_recursive(action);
                walker.nested(&inner, |w| {
                    for (i, item) in items.iter_mut().enumerate() {
                        w.element(i, item, action);
                    }
                });
            }
            Value::Object(map) => {
                let inner = as_recursive(action);
                walker.nested(&inner, |w| {
                    for (key, value) in map.iter_mut() {
                        w.element(key, value, action);
                    }
                });
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

/// JSON containers are plain data, so they are always entered.
fn as_recursive(action: &FieldAction) -> FieldAction {
    match action {
        FieldAction::Mask { kind, .. } => FieldAction::Mask {
            kind: kind.clone(),
            recursive: true,
        },
        FieldAction::Custom(_) | FieldAction::Recurse => FieldAction::Recurse,
    }
}
