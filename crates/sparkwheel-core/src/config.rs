//! Main Config type for sparkwheel
//!
//! `Config` owns the merged raw tree, the item graph, the component
//! registry, the expression evaluator, and the resolved cache. Values are
//! resolved lazily and cached; mutation rebuilds the graph and flushes the
//! cache.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::expr::{DefaultEvaluator, Evaluator};
use crate::graph::Graph;
use crate::id::Id;
use crate::instantiate::{Registry, Resolved};
use crate::merge;
use crate::overrides;
use crate::resolve::Resolver;
use crate::value::{from_yaml_str, Value};

/// Engine toggles and environment
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Degrade missing `@` references to null with a warning
    pub allow_missing_refs: bool,
    /// Fail on duplicate mapping keys within one document
    pub strict_keys: bool,
    /// Return `$`-scalars as literal strings without evaluation
    pub disable_expressions: bool,
    /// Verbose resolution diagnostics
    pub debug: bool,
    /// Anchor for relative file paths in `%file::id` macros
    pub base_dir: Option<PathBuf>,
}

impl Options {
    /// Read the boolean toggles from the environment
    /// (`SPARKWHEEL_ALLOW_MISSING_REFS`, `SPARKWHEEL_STRICT_KEYS`,
    /// `SPARKWHEEL_DISABLE_EXPRESSIONS`, `SPARKWHEEL_DEBUG`).
    pub fn from_env() -> Self {
        Options {
            allow_missing_refs: env_flag("SPARKWHEEL_ALLOW_MISSING_REFS"),
            strict_keys: env_flag("SPARKWHEEL_STRICT_KEYS"),
            disable_expressions: env_flag("SPARKWHEEL_DISABLE_EXPRESSIONS"),
            debug: env_flag("SPARKWHEEL_DEBUG"),
            base_dir: None,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// The main configuration container
pub struct Config {
    options: Options,
    registry: Registry,
    evaluator: Arc<dyn Evaluator>,
    merged: Value,
    graph: Graph,
    cache: RwLock<HashMap<Id, Resolved>>,
}

impl Config {
    /// Create a Config from an already-merged tree
    pub fn new(tree: Value) -> Result<Self> {
        Self::with_options(tree, Options::default())
    }

    /// Create a Config with custom options
    pub fn with_options(tree: Value, options: Options) -> Result<Self> {
        let graph = Graph::build(&tree, options.base_dir.as_deref())?;
        Ok(Self {
            options,
            registry: Registry::new(),
            evaluator: Arc::new(DefaultEvaluator),
            merged: tree,
            graph,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_yaml_with_options(yaml, Options::default())
    }

    /// Load configuration from a YAML string with options
    pub fn from_yaml_with_options(yaml: &str, options: Options) -> Result<Self> {
        let tree = from_yaml_str(yaml, options.strict_keys)?;
        Self::with_options(tree, options)
    }

    /// Load and merge YAML files in order, honoring the `=`/`~` operators.
    pub fn from_yaml_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        Self::from_yaml_files_with_options(paths, Options::default())
    }

    /// Load and merge YAML files with options.
    ///
    /// Unless already set, the macro base directory becomes the parent of
    /// the first file.
    pub fn from_yaml_files_with_options<P: AsRef<Path>>(
        paths: &[P],
        mut options: Options,
    ) -> Result<Self> {
        let mut layers = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)
                .map_err(|e| Error::io(format!("Failed to read '{}': {}", path.display(), e)))?;
            let tree = from_yaml_str(&text, options.strict_keys)
                .map_err(|e| e.with_help(format!("In file '{}'", path.display())))?;
            layers.push(tree);
            if options.base_dir.is_none() {
                options.base_dir = path.parent().map(Path::to_path_buf);
            }
        }
        let merged = merge::merge_layers(layers)?;
        Self::with_options(merged, options)
    }

    /// The engine options
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The component registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access to the component registry
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Install a custom expression evaluator
    pub fn set_evaluator(&mut self, evaluator: Arc<dyn Evaluator>) {
        self.evaluator = evaluator;
        self.clear_cache();
    }

    /// Get the raw (unresolved) node at an identifier
    pub fn get(&self, id_text: &str) -> Result<&Value> {
        let id = Id::parse(id_text)?;
        self.graph.node(&id).ok_or_else(|| self.graph.missing(&id))
    }

    /// Whether an identifier names an item
    pub fn has(&self, id_text: &str) -> bool {
        Id::parse(id_text)
            .map(|id| self.graph.has(&id))
            .unwrap_or(false)
    }

    /// Every identifier in the graph, in depth-first order
    pub fn ids(&self) -> Vec<Id> {
        self.graph.ids().cloned().collect()
    }

    /// Top-level keys with their immediate children, for listings
    pub fn sections(&self) -> IndexMap<String, Vec<Id>> {
        self.graph.sections()
    }

    /// Resolve the value at an identifier
    pub fn resolve(&self, id_text: &str) -> Result<Resolved> {
        self.resolve_id(&Id::parse(id_text)?)
    }

    /// Resolve the value at a parsed identifier
    pub fn resolve_id(&self, id: &Id) -> Result<Resolved> {
        self.resolver().resolve(id, &mut Vec::new())
    }

    /// Resolve to plain data, failing if components are involved
    pub fn resolve_value(&self, id_text: &str) -> Result<Value> {
        let resolved = self.resolve(id_text)?;
        resolved.into_value().ok_or_else(|| {
            Error::validation(
                id_text,
                "Resolved value holds constructed components, not plain data",
            )
        })
    }

    /// Resolve a string value, coercing scalars
    pub fn resolve_str(&self, id_text: &str) -> Result<String> {
        let value = self.resolve_value(id_text)?;
        match value {
            Value::String(s) => Ok(s),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok("null".to_string()),
            other => Err(coercion(id_text, "string", &other)),
        }
    }

    /// Resolve an integer value, coercing numeric strings
    pub fn resolve_i64(&self, id_text: &str) -> Result<i64> {
        let value = self.resolve_value(id_text)?;
        match value {
            Value::Integer(i) => Ok(i),
            Value::String(s) => s
                .parse()
                .map_err(|_| coercion(id_text, "integer", &Value::String(s))),
            other => Err(coercion(id_text, "integer", &other)),
        }
    }

    /// Resolve a float value, coercing integers and numeric strings
    pub fn resolve_f64(&self, id_text: &str) -> Result<f64> {
        let value = self.resolve_value(id_text)?;
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            Value::String(s) => s
                .parse()
                .map_err(|_| coercion(id_text, "float", &Value::String(s))),
            other => Err(coercion(id_text, "float", &other)),
        }
    }

    /// Resolve a boolean value; only "true"/"false" strings coerce
    pub fn resolve_bool(&self, id_text: &str) -> Result<bool> {
        let value = self.resolve_value(id_text)?;
        match value {
            Value::Bool(b) => Ok(b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(coercion(id_text, "boolean", &Value::String(s))),
            },
            other => Err(coercion(id_text, "boolean", &other)),
        }
    }

    /// Resolve every item in the configuration eagerly
    pub fn resolve_all(&self) -> Result<()> {
        self.resolve_id(&Id::root())?;
        Ok(())
    }

    /// The merged raw tree
    pub fn raw(&self) -> &Value {
        &self.merged
    }

    /// The merged raw tree as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.merged).map_err(|e| Error::parse(e.to_string()))
    }

    /// Merge another raw tree into this configuration.
    ///
    /// Operator prefixes in the overlay apply as in layered loading. The
    /// graph is rebuilt and the resolved cache flushed. On failure the
    /// configuration is left untouched.
    pub fn merge(&mut self, overlay: Value) -> Result<()> {
        let mut next = self.merged.clone();
        merge::merge(&mut next, overlay)?;
        self.install(next)
    }

    /// Merge a YAML string into this configuration
    pub fn merge_yaml(&mut self, yaml: &str) -> Result<()> {
        let overlay = from_yaml_str(yaml, self.options.strict_keys)?;
        self.merge(overlay)
    }

    /// Apply override strings (`[~|=]id=literal`)
    pub fn update<S: AsRef<str>>(&mut self, specs: &[S]) -> Result<()> {
        let overlay = overrides::overrides_to_tree(specs)?;
        self.merge(overlay)
    }

    /// Replace the subtree at an identifier
    pub fn set(&mut self, id_text: &str, value: Value) -> Result<()> {
        let id = Id::parse(id_text)?;
        let mut next = self.merged.clone();
        next.set(&id, value)?;
        self.install(next)
    }

    /// Drop all resolved values
    pub fn clear_cache(&self) {
        self.cache.write().unwrap().clear();
    }

    /// Commit a new merged tree: rebuild the graph first so a failed build
    /// leaves the previous state intact, then flush the cache.
    fn install(&mut self, tree: Value) -> Result<()> {
        let graph = Graph::build(&tree, self.options.base_dir.as_deref())?;
        self.merged = tree;
        self.graph = graph;
        self.clear_cache();
        Ok(())
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver {
            graph: &self.graph,
            registry: &self.registry,
            evaluator: self.evaluator.as_ref(),
            options: &self.options,
            cache: &self.cache,
        }
    }

}

fn coercion(id: &str, expected: &str, got: &Value) -> Error {
    Error::validation(id, format!("Expected {}, got {} ({})", expected, got.type_name(), got))
}
