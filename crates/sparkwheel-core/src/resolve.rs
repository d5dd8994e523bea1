//! Lazy, dependency-ordered resolution
//!
//! The resolver materializes the value of a requested identifier: `@`
//! references substitute resolved values, `$` expressions evaluate with
//! their references bound, and mapping items carrying `_target_` are
//! handed to the instantiation protocol. Cycle detection uses the ordered
//! stack of in-progress identifiers carried through one resolution; the
//! cache is monotonic until the owning configuration is mutated.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::Options;
use crate::error::{Error, ErrorKind, Result};
use crate::expr::Evaluator;
use crate::graph::{Graph, Item};
use crate::id::{Id, Ref};
use crate::instantiate::{
    is_site, Callable, Invocation, Mode, Registry, Resolved, ARGS_KEY, DISABLED_KEY, MODE_KEY,
    REQUIRES_KEY, TARGET_KEY,
};
use crate::markers::{self, Marker};
use crate::value::Value;

pub(crate) struct Resolver<'a> {
    pub graph: &'a Graph,
    pub registry: &'a Registry,
    pub evaluator: &'a dyn Evaluator,
    pub options: &'a Options,
    pub cache: &'a RwLock<HashMap<Id, Resolved>>,
}

impl Resolver<'_> {
    /// Resolve one identifier. `stack` is the ordered in-progress set of
    /// the current resolution; pass an empty one at the entry point.
    pub fn resolve(&self, id: &Id, stack: &mut Vec<Id>) -> Result<Resolved> {
        if let Some(hit) = self.cache.read().unwrap().get(id) {
            return Ok(hit.clone());
        }

        if let Some(pos) = stack.iter().position(|s| s == id) {
            let participants = stack[pos..].iter().map(|s| s.to_string()).collect();
            return Err(Error::cycle(id.to_string(), participants));
        }

        let item = self.graph.item(id).ok_or_else(|| self.graph.missing(id))?;

        if self.options.debug {
            log::debug!("resolving '{}'", id);
        }

        stack.push(id.clone());
        let outcome = self.resolve_item(item, stack);
        stack.pop();

        // A failure leaves the item unresolved so a corrected state can be
        // retried after mutation.
        let resolved = outcome?;
        self.cache
            .write()
            .unwrap()
            .insert(id.clone(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_item(&self, item: &Item, stack: &mut Vec<Id>) -> Result<Resolved> {
        if item.literal {
            return Ok(Resolved::Value(item.raw.clone()));
        }
        match &item.raw {
            Value::String(s) => self.resolve_string(s, &item.id, stack),
            Value::Mapping(map) if is_site(map) => self.instantiate_site(item, map, stack),
            Value::Mapping(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for key in map.keys() {
                    let child = self.resolve(&item.id.child(key.as_str()), stack)?;
                    out.insert(key.clone(), child);
                }
                Ok(collapse_mapping(out))
            }
            Value::Sequence(seq) => {
                let mut out = Vec::with_capacity(seq.len());
                for i in 0..seq.len() {
                    out.push(self.resolve(&item.id.child(i), stack)?);
                }
                Ok(collapse_sequence(out))
            }
            scalar => Ok(Resolved::Value(scalar.clone())),
        }
    }

    fn resolve_string(&self, s: &str, id: &Id, stack: &mut Vec<Id>) -> Result<Resolved> {
        match markers::classify(s)? {
            // A whole-scalar reference keeps the referent's native type
            Marker::WholeRef(r) => self.resolve_ref(&r, id, stack),
            Marker::Expression(src) => {
                if self.options.disable_expressions {
                    return Ok(Resolved::Value(Value::String(s.to_string())));
                }
                self.resolve_expression(&src, id, stack)
            }
            Marker::Macro(_) => Err(Error::internal(format!(
                "Macro at '{}' survived graph construction",
                id
            ))),
            Marker::Plain => {
                let refs = markers::scan_refs(s);
                if refs.is_empty() {
                    return Ok(Resolved::Value(Value::String(s.to_string())));
                }
                // Embedded references splice via string formatting
                let mut out = String::with_capacity(s.len());
                let mut last = 0;
                for (range, r) in refs {
                    out.push_str(&s[last..range.start]);
                    let resolved = self.resolve_ref(&r, id, stack)?;
                    out.push_str(&resolved.to_display_string());
                    last = range.end;
                }
                out.push_str(&s[last..]);
                Ok(Resolved::Value(Value::String(out)))
            }
        }
    }

    fn resolve_ref(&self, r: &Ref, origin: &Id, stack: &mut Vec<Id>) -> Result<Resolved> {
        let target = r.resolve_against(origin)?;
        if !self.graph.has(&target) {
            if self.options.allow_missing_refs {
                log::warn!(
                    "missing reference '@{}' at '{}', degrading to null",
                    target,
                    origin
                );
                return Ok(Resolved::null());
            }
            return Err(self.graph.missing(&target));
        }
        self.resolve(&target, stack)
    }

    fn resolve_expression(&self, src: &str, id: &Id, stack: &mut Vec<Id>) -> Result<Resolved> {
        let refs = markers::scan_refs(src);
        let mut bindings: IndexMap<String, Resolved> = IndexMap::new();
        let mut names: HashMap<Ref, String> = HashMap::new();
        let mut rewritten = String::with_capacity(src.len());
        let mut last = 0;

        for (range, r) in refs {
            rewritten.push_str(&src[last..range.start]);
            let name = if let Some(known) = names.get(&r) {
                known.clone()
            } else {
                let name = format!("__ref{}", names.len());
                let resolved = self.resolve_ref(&r, id, stack)?;
                bindings.insert(name.clone(), resolved);
                names.insert(r, name.clone());
                name
            };
            rewritten.push_str(&name);
            last = range.end;
        }
        rewritten.push_str(&src[last..]);

        self.evaluator
            .eval(&rewritten, &bindings)
            .map_err(|e| annotate(e, id))
    }

    /// The instantiation protocol for a mapping item carrying `_target_`
    fn instantiate_site(
        &self,
        item: &Item,
        map: &IndexMap<String, Value>,
        stack: &mut Vec<Id>,
    ) -> Result<Resolved> {
        let site = &item.id;

        // 1. A truthy _disabled_ short-circuits to null; nothing is invoked
        if map.contains_key(DISABLED_KEY) {
            let disabled = self.resolve(&site.child(DISABLED_KEY), stack)?;
            let truthy = disabled.truthy().map_err(|e| annotate(e, site))?;
            if truthy {
                return Ok(Resolved::null());
            }
        }

        // 2. Extra dependencies, in order; their values are discarded
        if let Some(requires) = map.get(REQUIRES_KEY) {
            self.resolve_requires(requires, site, stack)?;
        }

        // 3. The target: a registry path, or a reference to a callable
        let target = self.resolve(&site.child(TARGET_KEY), stack)?;
        let callable = match target {
            Resolved::Callable(c) => c,
            Resolved::Value(Value::String(path)) => {
                let factory = self.registry.locate(&path).map_err(|e| annotate(e, site))?;
                Callable {
                    factory,
                    target: path,
                    args: Vec::new(),
                    kwargs: IndexMap::new(),
                }
            }
            other => {
                return Err(Error::instantiation(
                    site.to_string(),
                    format!("_target_ resolved to {}, which is not callable", other),
                ))
            }
        };

        // 4. Positional and keyword arguments, each a child item
        let args = match map.get(ARGS_KEY) {
            Some(Value::Sequence(raw_args)) => {
                let args_id = site.child(ARGS_KEY);
                let mut args = Vec::with_capacity(raw_args.len());
                for i in 0..raw_args.len() {
                    args.push(self.resolve(&args_id.child(i), stack)?);
                }
                args
            }
            Some(other) => {
                return Err(Error::instantiation(
                    site.to_string(),
                    format!("_args_ must be a sequence, got {}", other.type_name()),
                ))
            }
            None => Vec::new(),
        };

        let mut kwargs = IndexMap::new();
        for key in map.keys() {
            if matches!(
                key.as_str(),
                TARGET_KEY | ARGS_KEY | DISABLED_KEY | REQUIRES_KEY | MODE_KEY
            ) {
                continue;
            }
            kwargs.insert(key.clone(), self.resolve(&site.child(key.as_str()), stack)?);
        }

        // 5. Branch on _mode_
        let mode = match map.get(MODE_KEY) {
            Some(_) => {
                let resolved = self.resolve(&site.child(MODE_KEY), stack)?;
                match resolved.as_value().and_then(|v| v.as_str()) {
                    Some(text) => Mode::parse(text).map_err(|e| annotate(e, site))?,
                    None => {
                        return Err(Error::instantiation(
                            site.to_string(),
                            "_mode_ must be a string",
                        ))
                    }
                }
            }
            None => Mode::Default,
        };

        let invocation = Invocation::new(args, kwargs);
        match mode {
            Mode::Default => self.invoke(&callable, invocation, site),
            Mode::Callable => Ok(Resolved::Callable(Callable {
                factory: callable.factory.clone(),
                target: callable.target.clone(),
                args: {
                    let mut bound = callable.args.clone();
                    bound.extend(invocation.args);
                    bound
                },
                kwargs: {
                    let mut bound = callable.kwargs.clone();
                    bound.extend(invocation.kwargs);
                    bound
                },
            })),
            Mode::Debug => {
                log::debug!(
                    "invoking '{}' at '{}' with {} args, {} kwargs",
                    callable.target,
                    site,
                    invocation.args.len(),
                    invocation.kwargs.len()
                );
                let out = self.invoke(&callable, invocation, site)?;
                log::debug!("'{}' returned {}", site, out);
                Ok(out)
            }
        }
    }

    fn invoke(&self, callable: &Callable, invocation: Invocation, site: &Id) -> Result<Resolved> {
        callable.call_with(invocation).map_err(|e| {
            if e.kind == ErrorKind::Instantiation {
                annotate(e, site)
            } else {
                Error::instantiation(site.to_string(), e.to_string())
            }
        })
    }

    fn resolve_requires(&self, requires: &Value, site: &Id, stack: &mut Vec<Id>) -> Result<()> {
        let entries: Vec<&Value> = match requires {
            Value::Sequence(seq) => seq.iter().collect(),
            single => vec![single],
        };
        for entry in entries {
            let text = entry.as_str().ok_or_else(|| {
                Error::instantiation(
                    site.to_string(),
                    format!("_requires_ entries must be identifiers, got {}", entry.type_name()),
                )
            })?;
            if let Some(src) = text.strip_prefix('$') {
                self.resolve_expression(src, site, stack)?;
                continue;
            }
            let r = Ref::parse(text.strip_prefix('@').unwrap_or(text))
                .map_err(|e| annotate(e, site))?;
            self.resolve_ref(&r, site, stack)?;
        }
        Ok(())
    }
}

/// Attach the originating identifier to errors raised without one
fn annotate(e: Error, id: &Id) -> Error {
    if e.id.as_deref().map_or(true, str::is_empty) {
        e.with_id(id.to_string())
    } else {
        e
    }
}

fn collapse_mapping(resolved: IndexMap<String, Resolved>) -> Resolved {
    if resolved.values().all(|r| matches!(r, Resolved::Value(_))) {
        let plain = resolved
            .into_iter()
            .map(|(k, r)| match r {
                Resolved::Value(v) => (k, v),
                _ => unreachable!(),
            })
            .collect();
        Resolved::Value(Value::Mapping(plain))
    } else {
        Resolved::Mapping(resolved)
    }
}

fn collapse_sequence(resolved: Vec<Resolved>) -> Resolved {
    if resolved.iter().all(|r| matches!(r, Resolved::Value(_))) {
        let plain = resolved
            .into_iter()
            .map(|r| match r {
                Resolved::Value(v) => v,
                _ => unreachable!(),
            })
            .collect();
        Resolved::Value(Value::Sequence(plain))
    } else {
        Resolved::Sequence(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::DefaultEvaluator;
    use crate::instantiate::Instance;
    use crate::value::from_yaml_str;
    use pretty_assertions::assert_eq;

    struct Fixture {
        graph: Graph,
        registry: Registry,
        options: Options,
        cache: RwLock<HashMap<Id, Resolved>>,
    }

    impl Fixture {
        fn new(yaml: &str) -> Self {
            Self::with_options(yaml, Options::default())
        }

        fn with_options(yaml: &str, options: Options) -> Self {
            let tree = from_yaml_str(yaml, false).unwrap();
            Fixture {
                graph: Graph::build(&tree, None).unwrap(),
                registry: Registry::new(),
                options,
                cache: RwLock::new(HashMap::new()),
            }
        }

        fn resolver(&self) -> Resolver<'_> {
            Resolver {
                graph: &self.graph,
                registry: &self.registry,
                evaluator: &DefaultEvaluator,
                options: &self.options,
                cache: &self.cache,
            }
        }

        fn resolve(&self, id: &str) -> Result<Resolved> {
            self.resolver()
                .resolve(&Id::parse(id).unwrap(), &mut Vec::new())
        }
    }

    fn value(v: impl Into<Value>) -> Resolved {
        Resolved::Value(v.into())
    }

    #[test]
    fn test_plain_scalar() {
        let fx = Fixture::new("a: 10");
        assert_eq!(fx.resolve("a").unwrap(), value(10i64));
    }

    #[test]
    fn test_simple_reference_preserves_type() {
        let fx = Fixture::new("a: 10\nb: '@a'");
        assert_eq!(fx.resolve("b").unwrap(), value(10i64));
    }

    #[test]
    fn test_reference_to_container() {
        let fx = Fixture::new("m:\n  p: 1\ncopy: '@m'");
        assert_eq!(
            fx.resolve("copy").unwrap(),
            value(from_yaml_str("p: 1", false).unwrap())
        );
    }

    #[test]
    fn test_relative_reference() {
        let fx = Fixture::new("box:\n  a: 3\n  b: '@::a'");
        assert_eq!(fx.resolve("box::b").unwrap(), value(3i64));
    }

    #[test]
    fn test_relative_equals_absolute() {
        // P6: @::sibling at a::b equals @a::sibling from the top
        let fx = Fixture::new("a:\n  sibling: 5\n  b: '@::sibling'\ntop: '@a::sibling'");
        assert_eq!(fx.resolve("a::b").unwrap(), fx.resolve("top").unwrap());
    }

    #[test]
    fn test_embedded_reference_coerces_to_string() {
        let fx = Fixture::new("host: localhost\nport: 5432\nurl: 'db://@host:@port/x'");
        assert_eq!(fx.resolve("url").unwrap(), value("db://localhost:5432/x"));
    }

    #[test]
    fn test_expression_with_reference() {
        let fx = Fixture::new("x: 3\ny: '$@x * 2 + 1'");
        assert_eq!(fx.resolve("y").unwrap(), value(7i64));
    }

    #[test]
    fn test_expression_repeated_reference_binds_once() {
        let fx = Fixture::new("x: 3\ny: '$@x * @x'");
        assert_eq!(fx.resolve("y").unwrap(), value(9i64));
    }

    #[test]
    fn test_expression_whole_reference_preserves_type() {
        let fx = Fixture::new("xs: [1, 2]\ncopy: '$@xs'");
        assert_eq!(
            fx.resolve("copy").unwrap(),
            value(from_yaml_str("[1, 2]", false).unwrap())
        );
    }

    #[test]
    fn test_expression_error_names_item() {
        let fx = Fixture::new("y: '$1 +'");
        let err = fx.resolve("y").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Expression);
        assert_eq!(err.id.as_deref(), Some("y"));
    }

    #[test]
    fn test_expressions_disabled_return_literal() {
        let options = Options {
            disable_expressions: true,
            ..Options::default()
        };
        let fx = Fixture::with_options("y: '$1 + 1'", options);
        assert_eq!(fx.resolve("y").unwrap(), value("$1 + 1"));
    }

    #[test]
    fn test_missing_reference_fails_with_suggestion() {
        let fx = Fixture::new("alpha: 1\nuser: '@alpho'");
        let err = fx.resolve("user").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::KeyNotFound { .. }));
        assert!(err.to_string().contains("alpha"));
    }

    #[test]
    fn test_missing_reference_degrades_when_allowed() {
        let options = Options {
            allow_missing_refs: true,
            ..Options::default()
        };
        let fx = Fixture::with_options("user: '@absent'", options);
        assert_eq!(fx.resolve("user").unwrap(), Resolved::null());
    }

    #[test]
    fn test_cycle_detection() {
        let fx = Fixture::new("a: '@b'\nb: '@a'");
        let err = fx.resolve("a").unwrap_err();
        match err.kind {
            ErrorKind::Cycle { participants } => {
                assert_eq!(participants, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_cycle() {
        let fx = Fixture::new("a: '@a'");
        assert!(matches!(
            fx.resolve("a").unwrap_err().kind,
            ErrorKind::Cycle { .. }
        ));
    }

    #[test]
    fn test_cycle_through_expression() {
        let fx = Fixture::new("a: '$@b + 1'\nb: '$@a + 1'");
        assert!(matches!(
            fx.resolve("a").unwrap_err().kind,
            ErrorKind::Cycle { .. }
        ));
    }

    #[test]
    fn test_failure_does_not_poison_cache() {
        let fx = Fixture::new("a: '@missing'\nb: 2");
        assert!(fx.resolve("a").is_err());
        assert!(fx.cache.read().unwrap().is_empty());
        assert_eq!(fx.resolve("b").unwrap(), value(2i64));
    }

    #[test]
    fn test_resolution_is_cached() {
        let fx = Fixture::new("a: 1\nb: '@a'");
        fx.resolve("b").unwrap();
        assert!(fx.cache.read().unwrap().contains_key(&Id::parse("a").unwrap()));
        assert!(fx.cache.read().unwrap().contains_key(&Id::parse("b").unwrap()));
    }

    fn linear_fixture(yaml: &str) -> Fixture {
        let mut fx = Fixture::new(yaml);
        fx.registry.register("Linear", |inv: &Invocation| {
            Ok(Resolved::Instance(Instance::new(
                "Linear",
                (inv.kwarg_i64("in_features")?, inv.kwarg_i64("out_features")?),
            )))
        });
        fx
    }

    #[test]
    fn test_instantiation_with_reference() {
        let fx = linear_fixture(
            "n: 5\nlin:\n  _target_: Linear\n  in_features: '@n'\n  out_features: 2",
        );
        let out = fx.resolve("lin").unwrap();
        let dims = out
            .as_instance()
            .unwrap()
            .downcast_ref::<(i64, i64)>()
            .unwrap();
        assert_eq!(*dims, (5, 2));
    }

    #[test]
    fn test_instantiation_callable_mode() {
        let fx = linear_fixture(
            "lin:\n  _target_: Linear\n  _mode_: callable\n  in_features: 5\n  out_features: 2",
        );
        let out = fx.resolve("lin").unwrap();
        let callable = out.as_callable().unwrap();
        assert!(callable.is_bound());
        let built = callable.call().unwrap();
        assert_eq!(
            built.as_instance().unwrap().downcast_ref::<(i64, i64)>(),
            Some(&(5, 2))
        );
    }

    #[test]
    fn test_instantiation_disabled() {
        let fx = linear_fixture("lin:\n  _target_: Linear\n  _disabled_: true\n  in_features: 1");
        assert_eq!(fx.resolve("lin").unwrap(), Resolved::null());
    }

    #[test]
    fn test_instantiation_disabled_by_expression() {
        let fx = linear_fixture(
            "n: 0\nlin:\n  _target_: Linear\n  _disabled_: '$@n == 0'\n  in_features: 1",
        );
        assert_eq!(fx.resolve("lin").unwrap(), Resolved::null());
    }

    #[test]
    fn test_instantiation_unknown_target() {
        let fx = linear_fixture("lin:\n  _target_: Liner\n  in_features: 1\n  out_features: 1");
        let err = fx.resolve("lin").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Instantiation);
        assert_eq!(err.id.as_deref(), Some("lin"));
        assert!(err.to_string().contains("Linear"));
    }

    #[test]
    fn test_factory_error_annotated_with_site() {
        let fx = linear_fixture("lin:\n  _target_: Linear\n  in_features: 1");
        let err = fx.resolve("lin").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Instantiation);
        assert_eq!(err.id.as_deref(), Some("lin"));
        assert!(err.to_string().contains("out_features"));
    }

    #[test]
    fn test_target_via_reference_to_callable() {
        let fx = linear_fixture(
            "proto:\n  _target_: Linear\n  _mode_: callable\n  in_features: 5\nlin:\n  _target_: '@proto'\n  out_features: 2",
        );
        let out = fx.resolve("lin").unwrap();
        assert_eq!(
            out.as_instance().unwrap().downcast_ref::<(i64, i64)>(),
            Some(&(5, 2))
        );
    }

    #[test]
    fn test_target_not_callable() {
        let fx = linear_fixture("n: 3\nlin:\n  _target_: '@n'");
        let err = fx.resolve("lin").unwrap_err();
        assert!(err.to_string().contains("not callable"));
    }

    #[test]
    fn test_positional_args() {
        let mut fx = Fixture::new("s:\n  _target_: join\n  _args_: [a, b, c]");
        fx.registry.register("join", |inv: &Invocation| {
            let joined: Vec<String> = inv
                .args
                .iter()
                .map(|a| a.to_display_string())
                .collect();
            Ok(Resolved::Value(Value::String(joined.join("-"))))
        });
        assert_eq!(fx.resolve("s").unwrap(), value("a-b-c"));
    }

    #[test]
    fn test_args_must_be_sequence() {
        let fx = linear_fixture("s:\n  _target_: Linear\n  _args_: nope");
        assert!(fx
            .resolve("s")
            .unwrap_err()
            .to_string()
            .contains("_args_ must be a sequence"));
    }

    #[test]
    fn test_requires_resolved_in_order() {
        let mut fx = Fixture::new(
            "setup:\n  _target_: mark\nmain:\n  _target_: mark\n  _requires_: ['@setup']",
        );
        fx.registry.register("mark", |_inv: &Invocation| {
            Ok(Resolved::Instance(Instance::new("mark", ())))
        });
        fx.resolve("main").unwrap();
        // The required site was resolved (and cached) first
        assert!(fx.cache.read().unwrap().contains_key(&Id::parse("setup").unwrap()));
    }

    #[test]
    fn test_requires_bare_identifier() {
        let mut fx = Fixture::new("dep: 1\nmain:\n  _target_: mark\n  _requires_: dep");
        fx.registry
            .register("mark", |_inv| Ok(Resolved::Instance(Instance::new("mark", ()))));
        fx.resolve("main").unwrap();
        assert!(fx.cache.read().unwrap().contains_key(&Id::parse("dep").unwrap()));
    }

    #[test]
    fn test_nested_site_as_argument() {
        let mut fx = Fixture::new(
            "outer:\n  _target_: wrap\n  inner:\n    _target_: Linear\n    in_features: 1\n    out_features: 1",
        );
        fx.registry.register("Linear", |inv: &Invocation| {
            Ok(Resolved::Instance(Instance::new(
                "Linear",
                (inv.kwarg_i64("in_features")?, inv.kwarg_i64("out_features")?),
            )))
        });
        fx.registry.register("wrap", |inv: &Invocation| {
            let inner = inv.kwarg("inner").and_then(|r| r.as_instance()).cloned();
            match inner {
                Some(instance) => Ok(Resolved::Instance(Instance::new("wrap", instance))),
                None => Err(Error::instantiation("", "inner must be an instance")),
            }
        });
        let out = fx.resolve("outer").unwrap();
        assert_eq!(out.as_instance().unwrap().target(), "wrap");
    }

    #[test]
    fn test_mapping_containing_site_resolves_mixed() {
        let fx = linear_fixture(
            "bundle:\n  plain: 1\n  lin:\n    _target_: Linear\n    in_features: 1\n    out_features: 1",
        );
        let out = fx.resolve("bundle").unwrap();
        match out {
            Resolved::Mapping(map) => {
                assert_eq!(map["plain"], value(1i64));
                assert!(map["lin"].as_instance().is_some());
            }
            other => panic!("expected mixed mapping, got {:?}", other),
        }
    }

    #[test]
    fn test_macro_spliced_site_stays_raw() {
        let fx = linear_fixture("t:\n  _target_: Linear\n  x: 1\nc: '%t'");
        let out = fx.resolve("c").unwrap();
        assert_eq!(
            out,
            value(from_yaml_str("_target_: Linear\nx: 1", false).unwrap())
        );
    }
}
