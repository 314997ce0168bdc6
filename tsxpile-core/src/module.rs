//! Module values and deferred module bodies
//!
//! A module's exports object is a shared handle: the linker caches it
//! before the body runs, so circular requires observe the partially
//! populated object instead of recursing forever.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::error::LinkError;

/// A host-callable function exported by a module.
pub type HostFn = dyn Fn(&[ExportValue]) -> Result<ExportValue, LinkError> + Send + Sync;

/// A single exported value.
#[derive(Clone)]
pub enum ExportValue {
    Null,
    /// Plain data.
    Json(Value),
    /// Callable (component factories, render functions).
    Function(Arc<HostFn>),
    /// Host-specific value the pipeline passes through untouched.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl ExportValue {
    /// Wrap plain data.
    pub fn json(value: impl Into<Value>) -> Self {
        ExportValue::Json(value.into())
    }

    /// Wrap a callable.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[ExportValue]) -> Result<ExportValue, LinkError> + Send + Sync + 'static,
    {
        ExportValue::Function(Arc::new(f))
    }

    /// View as plain data, if this is a `Json` value.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ExportValue::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Invoke as a callable.
    pub fn call(&self, args: &[ExportValue]) -> Result<ExportValue, LinkError> {
        match self {
            ExportValue::Function(f) => f(args),
            _ => Err(LinkError::Runtime {
                path: String::new(),
                message: "value is not callable".to_string(),
            }),
        }
    }
}

impl fmt::Debug for ExportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportValue::Null => write!(f, "Null"),
            ExportValue::Json(v) => write!(f, "Json({v})"),
            ExportValue::Function(_) => write!(f, "Function"),
            ExportValue::Opaque(_) => write!(f, "Opaque"),
        }
    }
}

impl PartialEq for ExportValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ExportValue::Null, ExportValue::Null) => true,
            (ExportValue::Json(a), ExportValue::Json(b)) => a == b,
            (ExportValue::Function(a), ExportValue::Function(b)) => Arc::ptr_eq(a, b),
            (ExportValue::Opaque(a), ExportValue::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Shared, cheaply clonable exports object of one module.
///
/// Cloning clones the handle, not the contents; mutations through any
/// clone are visible through all of them.
#[derive(Clone, Default)]
pub struct Exports {
    inner: Arc<RwLock<BTreeMap<String, ExportValue>>>,
}

impl Exports {
    /// Create an empty exports object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an exports object from (name, value) pairs.
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, ExportValue)>,
        K: Into<String>,
    {
        let exports = Self::new();
        for (name, value) in values {
            exports.set(name, value);
        }
        exports
    }

    /// Read one export.
    pub fn get(&self, name: &str) -> Option<ExportValue> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// The `default` export, if present.
    pub fn default_export(&self) -> Option<ExportValue> {
        self.get("default")
    }

    /// Write one export.
    pub fn set(&self, name: impl Into<String>, value: ExportValue) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), value);
    }

    /// Replace the whole exports map (`module.exports = ...` semantics).
    ///
    /// Replaces the contents in place so clones held by cyclic importers
    /// observe the new values.
    pub fn replace(&self, values: BTreeMap<String, ExportValue>) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = values;
    }

    /// Exported names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Check whether nothing has been exported yet.
    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    /// Whether two values are the same underlying object.
    pub fn same_object(&self, other: &Exports) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exports")
            .field("names", &self.names())
            .finish()
    }
}

/// Require capability handed to a module body, already closed over the
/// requiring file so nested relative requires resolve against it.
pub type RequireRef<'a> = &'a (dyn Fn(&str) -> Result<Exports, LinkError> + 'a);

/// Execution scope of one module body invocation.
pub struct ModuleScope<'a> {
    /// Resolved path of the module being realized.
    pub path: &'a str,
    /// The module's (already cached) exports object to populate.
    pub exports: Exports,
    require: RequireRef<'a>,
}

impl<'a> ModuleScope<'a> {
    pub fn new(path: &'a str, exports: Exports, require: RequireRef<'a>) -> Self {
        Self {
            path,
            exports,
            require,
        }
    }

    /// Require another module relative to this one.
    pub fn require(&self, spec: &str) -> Result<Exports, LinkError> {
        (self.require)(spec)
    }
}

/// A deferred module body: invoked at most once per compile cycle, with
/// the exports object pre-registered in the module cache.
pub type BodyFn = Arc<dyn Fn(&ModuleScope<'_>) -> Result<(), LinkError> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports_set_get() {
        let exports = Exports::new();
        assert!(exports.is_empty());
        exports.set("default", ExportValue::json(42));
        assert_eq!(exports.default_export(), Some(ExportValue::json(42)));
        assert!(!exports.is_empty());
    }

    #[test]
    fn test_clone_shares_contents() {
        let a = Exports::new();
        let b = a.clone();
        a.set("x", ExportValue::json("shared"));
        assert_eq!(b.get("x"), Some(ExportValue::json("shared")));
        assert!(a.same_object(&b));
        assert!(!a.same_object(&Exports::new()));
    }

    #[test]
    fn test_replace_is_visible_through_clones() {
        let a = Exports::new();
        let b = a.clone();
        a.set("old", ExportValue::Null);

        let mut map = BTreeMap::new();
        map.insert("new".to_string(), ExportValue::json(1));
        a.replace(map);

        assert_eq!(b.get("old"), None);
        assert_eq!(b.get("new"), Some(ExportValue::json(1)));
    }

    #[test]
    fn test_export_value_eq() {
        assert_eq!(ExportValue::json(1), ExportValue::json(1));
        assert_ne!(ExportValue::json(1), ExportValue::json(2));
        let f = ExportValue::function(|_args| Ok(ExportValue::Null));
        assert_eq!(f, f.clone());
        assert_ne!(f, ExportValue::function(|_args| Ok(ExportValue::Null)));
    }

    #[test]
    fn test_call_non_function_fails() {
        let err = ExportValue::json(1).call(&[]).unwrap_err();
        assert!(matches!(err, LinkError::Runtime { .. }));
    }

    #[test]
    fn test_call_function() {
        let double = ExportValue::function(|args| {
            let n = args[0].as_json().and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(ExportValue::json(n * 2))
        });
        assert_eq!(double.call(&[ExportValue::json(21)]).unwrap(), ExportValue::json(42));
    }
}
