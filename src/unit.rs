//! Units and the catalog that resolves them.
//!
//! A [`Unit`] is a named table of functions keyed by name and arity; it is
//! what a test intercepts. Units live in a [`Catalog`], which also acts as
//! the direct, unrecorded [`Dispatch`](crate::runtime::Dispatch)
//! implementation used outside of tests.
//!
//! # Example
//!
//! ```
//! use intercept::unit::Catalog;
//!
//! let catalog = Catalog::new();
//! let math = catalog
//!     .define("math", |unit| {
//!         unit.func("add", |a: i64, b: i64| a + b)?
//!             .func("add", |a: i64, b: i64, c: i64| a + b + c)?
//!             .func("negate", |a: i64| -a)?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let arities = catalog.resolve_arities(&math, "add").unwrap();
//! assert_eq!(arities.into_iter().collect::<Vec<_>>(), vec![2, 3]);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::callable::{Callable, IntoCallable, MAX_ARITY};
use crate::error::{Error, Result};
use crate::runtime::Dispatch;
use intercept_value::Value;

/// Opaque identifier of an interceptable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A named table of functions, keyed by name and then arity.
#[derive(Debug, Clone)]
pub struct Unit {
    target: Target,
    functions: BTreeMap<String, BTreeMap<usize, Callable>>,
}

impl Unit {
    /// Build a unit by registering functions on a [`UnitBuilder`].
    pub fn define<F>(name: impl Into<Target>, build: F) -> Result<Self>
    where
        F: FnOnce(&mut UnitBuilder) -> Result<()>,
    {
        let mut builder = UnitBuilder {
            unit: Unit {
                target: name.into(),
                functions: BTreeMap::new(),
            },
        };
        build(&mut builder)?;
        Ok(builder.unit)
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Look up the implementation of `function` at `arity`.
    pub fn function(&self, function: &str, arity: usize) -> Option<&Callable> {
        self.functions.get(function)?.get(&arity)
    }

    /// Every interceptable arity (`0..=MAX_ARITY`) at which `function` exists.
    pub fn arities(&self, function: &str) -> BTreeSet<usize> {
        self.functions
            .get(function)
            .map(|by_arity| {
                by_arity
                    .keys()
                    .copied()
                    .filter(|arity| *arity <= MAX_ARITY)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Builder for registering the functions of one unit.
pub struct UnitBuilder {
    unit: Unit,
}

impl UnitBuilder {
    /// Register a typed function.
    ///
    /// Parameter types must implement [`FromValue`](crate::FromValue) and the
    /// return type `Into<Value>`. The arity is taken from the closure.
    ///
    /// # Example
    ///
    /// ```ignore
    /// unit.func("greet", |name: String| format!("hello {name}"))?;
    /// ```
    pub fn func<Args, F>(&mut self, name: &str, func: F) -> Result<&mut Self>
    where
        F: IntoCallable<Args>,
    {
        self.insert(name, func.into_callable())
    }

    /// Register a function that works directly on the argument slice.
    ///
    /// Use this for variadic-style helpers or arities above
    /// [`MAX_ARITY`], which are callable but never intercepted.
    pub fn func_raw<F>(&mut self, name: &str, arity: usize, func: F) -> Result<&mut Self>
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.insert(name, Callable::raw(arity, func))
    }

    fn insert(&mut self, name: &str, callable: Callable) -> Result<&mut Self> {
        let arity = callable.arity();
        let by_arity = self.unit.functions.entry(name.to_string()).or_default();
        if by_arity.contains_key(&arity) {
            return Err(Error::DuplicateFunction {
                target: self.unit.target.clone(),
                function: name.to_string(),
                arity,
            });
        }
        by_arity.insert(arity, callable);
        Ok(self)
    }
}

type Loader = Box<dyn FnOnce() -> Result<Unit> + Send>;

enum Entry {
    Loaded(Arc<Unit>),
    Lazy(Loader),
}

/// Registry of units by target.
///
/// Units may be registered eagerly or through a loader that runs the first
/// time the target is resolved.
#[derive(Default)]
pub struct Catalog {
    units: Mutex<HashMap<Target, Entry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a unit in place and register it.
    pub fn define<F>(&self, name: impl Into<Target>, build: F) -> Result<Target>
    where
        F: FnOnce(&mut UnitBuilder) -> Result<()>,
    {
        let unit = Unit::define(name, build)?;
        Ok(self.register(unit))
    }

    /// Register (or replace) a loaded unit.
    pub fn register(&self, unit: Unit) -> Target {
        let target = unit.target().clone();
        debug!(unit = %target, "registering unit");
        self.units
            .lock()
            .insert(target.clone(), Entry::Loaded(Arc::new(unit)));
        target
    }

    /// Register a unit whose definition is produced on first resolution.
    pub fn register_lazy<F>(&self, name: impl Into<Target>, loader: F) -> Target
    where
        F: FnOnce() -> Result<Unit> + Send + 'static,
    {
        let target = name.into();
        self.units
            .lock()
            .insert(target.clone(), Entry::Lazy(Box::new(loader)));
        target
    }

    /// True once the target's definition has been loaded.
    pub fn is_loaded(&self, target: &Target) -> bool {
        matches!(self.units.lock().get(target), Some(Entry::Loaded(_)))
    }

    /// Resolve a target to its current definition, loading it if needed.
    ///
    /// The loader runs without the catalog lock held; while it runs, the
    /// target resolves as unresolvable. A failed loader leaves the target
    /// unresolvable.
    pub fn resolve(&self, target: &Target) -> Result<Arc<Unit>> {
        let loader = {
            let mut units = self.units.lock();
            if let Some(Entry::Loaded(unit)) = units.get(target) {
                return Ok(Arc::clone(unit));
            }
            match units.remove(target) {
                Some(Entry::Lazy(loader)) => loader,
                _ => return Err(Error::UnresolvableTarget(target.clone())),
            }
        };

        let unit = match loader() {
            Ok(unit) if unit.target() == target => Arc::new(unit),
            Ok(unit) => {
                warn!(unit = %target, loaded = %unit.target(), "loader produced a different unit");
                return Err(Error::UnresolvableTarget(target.clone()));
            }
            Err(e) => {
                warn!(unit = %target, error = %e, "unit loader failed");
                return Err(Error::UnresolvableTarget(target.clone()));
            }
        };

        debug!(unit = %target, "loaded unit");
        self.units
            .lock()
            .insert(target.clone(), Entry::Loaded(Arc::clone(&unit)));
        Ok(unit)
    }

    /// Every arity in `0..=MAX_ARITY` at which `function` is defined on the
    /// target's current definition. Forces loading of lazy units.
    pub fn resolve_arities(&self, target: &Target, function: &str) -> Result<BTreeSet<usize>> {
        Ok(self.resolve(target)?.arities(function))
    }
}

impl Dispatch for Catalog {
    fn call(&self, target: &Target, function: &str, args: Vec<Value>) -> Result<Value> {
        let unit = self.resolve(target)?;
        let callable = unit
            .function(function, args.len())
            .ok_or_else(|| Error::UndefinedFunction {
                target: target.clone(),
                function: function.to_string(),
                arity: args.len(),
            })?;
        callable
            .call(&args)
            .map_err(|kind| kind.at(target, function).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn math(catalog: &Catalog) -> Target {
        catalog
            .define("math", |unit| {
                unit.func("add", |a: i64, b: i64| a + b)?
                    .func("add", |a: i64, b: i64, c: i64| a + b + c)?
                    .func_raw("sum", 11, |args| {
                        Value::S64(args.iter().filter_map(Value::as_i64).sum())
                    })?;
                Ok(())
            })
            .unwrap()
    }

    #[test]
    fn test_resolve_arities() {
        let catalog = Catalog::new();
        let target = math(&catalog);

        let arities: Vec<_> = catalog.resolve_arities(&target, "add").unwrap().into_iter().collect();
        assert_eq!(arities, vec![2, 3]);

        // Defined above the ceiling, so not interceptable.
        assert!(catalog.resolve_arities(&target, "sum").unwrap().is_empty());
        assert!(catalog.resolve_arities(&target, "missing").unwrap().is_empty());
    }

    #[test]
    fn test_unresolvable_target() {
        let catalog = Catalog::new();
        let err = catalog.resolve_arities(&Target::new("nowhere"), "f").unwrap_err();
        assert!(matches!(err, Error::UnresolvableTarget(t) if t.name() == "nowhere"));
    }

    #[test]
    fn test_duplicate_function() {
        let err = Unit::define("dup", |unit| {
            unit.func("f", |a: i64| a)?.func("f", |b: String| b)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateFunction { arity: 1, .. }));
    }

    #[test]
    fn test_lazy_loading_runs_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let catalog = Catalog::new();
        let counter = Arc::clone(&loads);
        let target = catalog.register_lazy("clock", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Unit::define("clock", |unit| {
                unit.func("now", || 1_700_000_000u64)?;
                Ok(())
            })
        });

        assert!(!catalog.is_loaded(&target));
        assert_eq!(catalog.resolve_arities(&target, "now").unwrap().len(), 1);
        assert!(catalog.is_loaded(&target));
        catalog.resolve(&target).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_loader_is_unresolvable() {
        let catalog = Catalog::new();
        let target = catalog.register_lazy("broken", || Err(Error::UnresolvableTarget(Target::new("dep"))));
        assert!(matches!(catalog.resolve(&target), Err(Error::UnresolvableTarget(_))));
        assert!(matches!(catalog.resolve(&target), Err(Error::UnresolvableTarget(_))));
    }

    #[test]
    fn test_loader_for_other_unit_is_unresolvable() {
        let catalog = Catalog::new();
        let target = catalog.register_lazy("clock", || {
            Unit::define("calendar", |unit| {
                unit.func("today", || 1u32)?;
                Ok(())
            })
        });
        assert!(matches!(
            catalog.resolve(&target),
            Err(Error::UnresolvableTarget(t)) if t.name() == "clock"
        ));
        assert!(!catalog.is_loaded(&target));
        assert!(!catalog.is_loaded(&Target::new("calendar")));
    }

    #[test]
    fn test_direct_dispatch() {
        let catalog = Catalog::new();
        let target = math(&catalog);
        let args: Vec<Value> = (1..=11i64).map(Value::from).collect();

        assert_eq!(
            catalog.call(&target, "add", vec![Value::S64(1), Value::S64(2)]).unwrap(),
            Value::S64(3)
        );
        assert_eq!(catalog.call(&target, "sum", args).unwrap(), Value::S64(66));
        assert!(matches!(
            catalog.call(&target, "add", vec![Value::S64(1)]),
            Err(Error::UndefinedFunction { arity: 1, .. })
        ));
    }
}
