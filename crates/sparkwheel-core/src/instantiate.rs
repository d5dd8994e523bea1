//! Component construction
//!
//! A mapping item carrying a `_target_` key is an instantiation site. The
//! target names a factory in the [`Registry`]; the remaining keys become
//! keyword arguments. This module holds the resolved-value types, the
//! factory registry, and the invocation plumbing; the resolution-ordered
//! protocol itself runs in the resolver.

use indexmap::IndexMap;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;

/// Reserved directive keys
pub const TARGET_KEY: &str = "_target_";
pub const ARGS_KEY: &str = "_args_";
pub const DISABLED_KEY: &str = "_disabled_";
pub const REQUIRES_KEY: &str = "_requires_";
pub const MODE_KEY: &str = "_mode_";

/// Whether a raw mapping is an instantiation site
pub fn is_site(map: &IndexMap<String, Value>) -> bool {
    map.contains_key(TARGET_KEY)
}

/// Invocation mode of an instantiation site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Call the target and return its result
    #[default]
    Default,
    /// Return the target itself, or a partial binding the provided arguments
    Callable,
    /// Call the target with a debug trace around the invocation
    Debug,
}

impl Mode {
    pub fn parse(text: &str) -> Result<Mode> {
        match text {
            "default" => Ok(Mode::Default),
            "callable" => Ok(Mode::Callable),
            "debug" => Ok(Mode::Debug),
            other => Err(Error::instantiation(
                "",
                format!("Unknown _mode_ '{}'", other),
            )
            .with_help("Use one of: default, callable, debug")),
        }
    }
}

/// The output of resolving an item: plain data, a container holding at
/// least one constructed component, a component instance, or a callable.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// Pure data
    Value(Value),
    /// A sequence with at least one non-data element
    Sequence(Vec<Resolved>),
    /// A mapping with at least one non-data value
    Mapping(IndexMap<String, Resolved>),
    /// A constructed component
    Instance(Instance),
    /// A factory, possibly with bound arguments
    Callable(Callable),
}

impl Resolved {
    /// The null value
    pub fn null() -> Resolved {
        Resolved::Value(Value::Null)
    }

    /// Borrow the plain data, if this is pure data
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Resolved::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Take the plain data, if this is pure data
    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolved::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow the instance, if one was constructed
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Resolved::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Borrow the callable, if this is one
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Resolved::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Truthiness for `_disabled_` and expression conditions
    pub fn truthy(&self) -> Result<bool> {
        match self {
            Resolved::Value(Value::Null) => Ok(false),
            Resolved::Value(Value::Bool(b)) => Ok(*b),
            Resolved::Value(Value::Integer(i)) => Ok(*i != 0),
            Resolved::Value(Value::Float(f)) => Ok(*f != 0.0),
            Resolved::Value(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::instantiation(
                    "",
                    format!("String \"{}\" is not a boolean", s),
                )
                .with_help("Only \"true\" or \"false\" are accepted")),
            },
            other => Err(Error::instantiation(
                "",
                format!("A {} is not a boolean", other.kind_name()),
            )),
        }
    }

    /// Render for splicing into a larger string
    pub fn to_display_string(&self) -> String {
        match self {
            Resolved::Value(v) => v.to_string(),
            other => format!("{}", other),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Resolved::Value(v) => v.type_name(),
            Resolved::Sequence(_) => "sequence",
            Resolved::Mapping(_) => "mapping",
            Resolved::Instance(_) => "instance",
            Resolved::Callable(_) => "callable",
        }
    }
}

impl From<Value> for Resolved {
    fn from(v: Value) -> Self {
        Resolved::Value(v)
    }
}

impl PartialEq for Resolved {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Resolved::Value(a), Resolved::Value(b)) => a == b,
            (Resolved::Sequence(a), Resolved::Sequence(b)) => a == b,
            (Resolved::Mapping(a), Resolved::Mapping(b)) => a == b,
            (Resolved::Instance(a), Resolved::Instance(b)) => Arc::ptr_eq(&a.object, &b.object),
            (Resolved::Callable(a), Resolved::Callable(b)) => {
                Arc::ptr_eq(&a.factory, &b.factory)
                    && a.target == b.target
                    && a.args == b.args
                    && a.kwargs == b.kwargs
            }
            _ => false,
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Value(v) => write!(f, "{}", v),
            Resolved::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Resolved::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Resolved::Instance(i) => write!(f, "<{}>", i.target),
            Resolved::Callable(c) => write!(f, "<callable {}>", c.target),
        }
    }
}

/// A constructed component: the target path that built it plus the object
#[derive(Clone)]
pub struct Instance {
    target: String,
    object: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wrap a freshly constructed component
    pub fn new<T: Any + Send + Sync>(target: impl Into<String>, object: T) -> Self {
        Self {
            target: target.into(),
            object: Arc::new(object),
        }
    }

    /// The target path that produced this instance
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Borrow the underlying component as a concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").field("target", &self.target).finish()
    }
}

/// Arguments handed to a factory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    /// Positional arguments (from `_args_`)
    pub args: Vec<Resolved>,
    /// Keyword arguments (the site's non-reserved keys)
    pub kwargs: IndexMap<String, Resolved>,
}

impl Invocation {
    pub fn new(args: Vec<Resolved>, kwargs: IndexMap<String, Resolved>) -> Self {
        Self { args, kwargs }
    }

    /// Look up a keyword argument
    pub fn kwarg(&self, name: &str) -> Option<&Resolved> {
        self.kwargs.get(name)
    }

    /// A keyword argument as an integer
    pub fn kwarg_i64(&self, name: &str) -> Result<i64> {
        self.kwarg(name)
            .and_then(|r| r.as_value())
            .and_then(|v| v.as_i64())
            .ok_or_else(|| {
                Error::instantiation("", format!("Missing or non-integer argument '{}'", name))
            })
    }

    /// A keyword argument as a string
    pub fn kwarg_str(&self, name: &str) -> Result<&str> {
        self.kwarg(name)
            .and_then(|r| r.as_value())
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::instantiation("", format!("Missing or non-string argument '{}'", name))
            })
    }
}

/// A factory callback registered under a dotted target path
pub type Factory = Arc<dyn Fn(&Invocation) -> Result<Resolved> + Send + Sync>;

/// A target with optionally bound arguments (`_mode_: callable`)
#[derive(Clone)]
pub struct Callable {
    pub(crate) factory: Factory,
    /// The target path this callable stands for
    pub target: String,
    /// Bound positional arguments
    pub args: Vec<Resolved>,
    /// Bound keyword arguments
    pub kwargs: IndexMap<String, Resolved>,
}

impl Callable {
    /// Invoke with additional arguments appended to the bound ones;
    /// keyword arguments given here override bound ones of the same name.
    pub fn call_with(&self, extra: Invocation) -> Result<Resolved> {
        let mut args = self.args.clone();
        args.extend(extra.args);
        let mut kwargs = self.kwargs.clone();
        for (k, v) in extra.kwargs {
            kwargs.insert(k, v);
        }
        (self.factory)(&Invocation::new(args, kwargs))
    }

    /// Invoke with only the bound arguments
    pub fn call(&self) -> Result<Resolved> {
        (self.factory)(&Invocation::new(self.args.clone(), self.kwargs.clone()))
    }

    /// Whether any arguments are bound
    pub fn is_bound(&self) -> bool {
        !self.args.is_empty() || !self.kwargs.is_empty()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("target", &self.target)
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .finish()
    }
}

/// Registry of component factories keyed by dotted target path
///
/// Stands in for dynamic import: the embedding application registers every
/// constructible component at startup.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a target path
    pub fn register<F>(&mut self, path: impl Into<String>, factory: F)
    where
        F: Fn(&Invocation) -> Result<Resolved> + Send + Sync + 'static,
    {
        self.factories.insert(path.into(), Arc::new(factory));
    }

    /// Check if a target path is registered
    pub fn contains(&self, path: &str) -> bool {
        self.factories.contains_key(path)
    }

    /// Locate a factory by target path
    pub fn locate(&self, path: &str) -> Result<Factory> {
        match self.factories.get(path) {
            Some(f) => Ok(Arc::clone(f)),
            None => {
                let known: Vec<String> = self.factories.keys().cloned().collect();
                let suggestions = crate::error::rank_suggestions(path, &known);
                let help = if suggestions.is_empty() {
                    format!("Register '{}' before loading the config", path)
                } else {
                    format!("Did you mean: {}?", suggestions.join(", "))
                };
                Err(Error::instantiation("", format!("Unknown target '{}'", path)).with_help(help))
            }
        }
    }

    /// Registered target paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("paths", &self.paths()).finish()
    }
}
