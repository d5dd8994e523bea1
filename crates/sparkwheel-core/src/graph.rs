//! The config item graph
//!
//! Flattens the merged tree into an arena of items keyed by canonical
//! identifier, one item per interior and leaf node. `%`-macros are
//! expanded here, before items are created: the spliced subtree is a copy
//! of the merged raw tree (operators already applied, nothing resolved),
//! and everything under a splice resolves as plain data.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::id::Id;
use crate::markers::{self, MacroRef, Marker};
use crate::value::{from_yaml_str, Value};

/// Iteration bound for chained macro expansion
const MACRO_DEPTH_LIMIT: usize = 64;

/// One node of the merged tree, addressed by its canonical identifier
#[derive(Debug, Clone)]
pub struct Item {
    /// Canonical identifier
    pub id: Id,
    /// Raw node as produced by the merger (macros already spliced)
    pub raw: Value,
    /// Spliced by a macro: resolves to the raw node as-is
    pub literal: bool,
}

/// Mapping from identifier to config item, closed under descent
#[derive(Debug, Default)]
pub struct Graph {
    items: IndexMap<Id, Item>,
}

impl Graph {
    /// Build the graph from a merged tree, expanding macros.
    ///
    /// `base_dir` anchors relative file paths in `%file::id` macros.
    pub fn build(merged: &Value, base_dir: Option<&Path>) -> Result<Graph> {
        let mut tree = merged.clone();
        let macro_roots = expand_macros(&mut tree, base_dir)?;

        let mut items = IndexMap::new();
        tree.walk(&mut |id: &Id, node: &Value| {
            let literal = macro_roots.iter().any(|root| root.is_prefix_of(id));
            items.insert(
                id.clone(),
                Item {
                    id: id.clone(),
                    raw: node.clone(),
                    literal,
                },
            );
        });
        Ok(Graph { items })
    }

    /// Look up an item
    pub fn item(&self, id: &Id) -> Option<&Item> {
        self.items.get(id)
    }

    /// Look up a raw node
    pub fn node(&self, id: &Id) -> Option<&Value> {
        self.items.get(id).map(|item| &item.raw)
    }

    /// Whether the identifier names an item
    pub fn has(&self, id: &Id) -> bool {
        self.items.contains_key(id)
    }

    /// Every identifier in the graph, in depth-first order
    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.items.keys()
    }

    /// Top-level keys with their immediate children, for listings
    pub fn sections(&self) -> IndexMap<String, Vec<Id>> {
        let mut out: IndexMap<String, Vec<Id>> = IndexMap::new();
        for id in self.items.keys() {
            match id.len() {
                1 => {
                    out.entry(id.to_string()).or_default();
                }
                2 => {
                    if let Some(section) = id.section() {
                        out.entry(section).or_default().push(id.clone());
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Identifier texts for similarity suggestions
    pub fn candidates(&self) -> Vec<String> {
        self.items
            .keys()
            .filter(|id| !id.is_root())
            .map(|id| id.to_string())
            .collect()
    }

    /// A key-not-found error carrying suggestions from this graph
    pub fn missing(&self, id: &Id) -> Error {
        Error::key_not_found(id.to_string(), &self.candidates())
    }
}

/// Expand macros in place until none remain, returning the splice roots.
fn expand_macros(tree: &mut Value, base_dir: Option<&Path>) -> Result<Vec<Id>> {
    let mut roots: Vec<Id> = Vec::new();
    let mut files: HashMap<PathBuf, Value> = HashMap::new();

    for _ in 0..MACRO_DEPTH_LIMIT {
        let sites = collect_macro_sites(tree)?;
        if sites.is_empty() {
            roots.sort();
            roots.dedup();
            return Ok(roots);
        }

        // Splices within one round all read the same snapshot
        let snapshot = tree.clone();
        for (site_id, mref) in sites {
            let replacement = splice_source(&snapshot, &site_id, &mref, base_dir, &mut files)?;
            tree.set(&site_id, replacement)?;
            roots.push(site_id);
        }
    }

    let leftover: Vec<String> = collect_macro_sites(tree)?
        .into_iter()
        .map(|(id, mref)| format!("{} ({})", id, mref_text(&mref)))
        .collect();
    Err(Error::parse(format!(
        "Macro expansion did not terminate after {} rounds; cycle through: {}",
        MACRO_DEPTH_LIMIT,
        leftover.join(", ")
    ))
    .with_help("Remove the mutual '%' references"))
}

fn collect_macro_sites(tree: &Value) -> Result<Vec<(Id, MacroRef)>> {
    let mut sites = Vec::new();
    let mut first_err: Option<Error> = None;
    tree.walk(&mut |id: &Id, node: &Value| {
        if let Value::String(s) = node {
            if s.starts_with('%') && first_err.is_none() {
                match markers::classify(s) {
                    Ok(Marker::Macro(m)) => sites.push((id.clone(), m)),
                    Ok(_) => {}
                    Err(e) => first_err = Some(e.with_id(id.to_string())),
                }
            }
        }
    });
    match first_err {
        Some(e) => Err(e),
        None => Ok(sites),
    }
}

fn splice_source(
    snapshot: &Value,
    site_id: &Id,
    mref: &MacroRef,
    base_dir: Option<&Path>,
    files: &mut HashMap<PathBuf, Value>,
) -> Result<Value> {
    match &mref.file {
        Some(file) => {
            if mref.target.is_relative() {
                return Err(Error::parse(format!(
                    "Macro '%{}::{}' mixes a file with a relative identifier",
                    file, mref.target
                ))
                .with_id(site_id.to_string()));
            }
            let path = match base_dir {
                Some(dir) if Path::new(file).is_relative() => dir.join(file),
                _ => PathBuf::from(file),
            };
            if !files.contains_key(&path) {
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    Error::io(format!("Failed to read '{}': {}", path.display(), e))
                        .with_id(site_id.to_string())
                })?;
                let doc = from_yaml_str(&text, false)
                    .map_err(|e| e.with_id(site_id.to_string()))?;
                files.insert(path.clone(), doc);
            }
            let doc = &files[&path];
            doc.descend(&mref.target.id)
                .map(Clone::clone)
                .map_err(|e| e.with_help(format!("While expanding the macro at '{}'", site_id)))
        }
        None => {
            let target = mref.target.resolve_against(site_id)?;
            snapshot
                .descend(&target)
                .map(Clone::clone)
                .map_err(|e| e.with_help(format!("While expanding the macro at '{}'", site_id)))
        }
    }
}

fn mref_text(mref: &MacroRef) -> String {
    match &mref.file {
        Some(file) => format!("%{}::{}", file, mref.target),
        None => format!("%{}", mref.target),
    }
}
