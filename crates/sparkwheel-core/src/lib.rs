//! sparkwheel-core: Declarative configuration engine
//!
//! This crate loads layered YAML configuration describing both data values
//! and the construction of runtime components, and resolves identifiers to
//! fully materialized values: `@id` references, `%id` raw macros, `$expr`
//! expressions, and `_target_` instantiation sites.
//!
//! # Example
//!
//! ```rust
//! use sparkwheel_core::Config;
//!
//! let yaml = r#"
//! num_classes: 10
//! head:
//!   units: "$@num_classes * 2"
//! "#;
//!
//! let config = Config::from_yaml(yaml).unwrap();
//! let units = config.resolve_i64("head::units").unwrap();
//! assert_eq!(units, 20);
//! ```

pub mod error;
pub mod expr;
pub mod graph;
pub mod id;
pub mod instantiate;
pub mod markers;
pub mod merge;
pub mod overrides;
pub mod value;

mod config;
mod resolve;

pub use config::{Config, Options};
pub use error::{Error, ErrorKind, Result};
pub use expr::{DefaultEvaluator, Evaluator};
pub use id::{Id, Ref, Segment};
pub use instantiate::{Callable, Instance, Invocation, Mode, Registry, Resolved};
pub use value::Value;
