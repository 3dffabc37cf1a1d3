//! Schema-driven validation and coercion for JSON-shaped data.
//!
//! Declare a record's fields once — sample/default value, required mode,
//! constraints — compile the schema, then parse untyped input into a
//! validated, defaulted value or a single precisely-located failure.
//!
//! ```
//! use json_vet::{Config, Property, Schema};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let cx = Arc::new(Config::new());
//! let user = Schema::new("user")
//!     .field("name", Property::new(json!("anon")).min(1.0))
//!     .field("age", Property::new(json!(0)).min(0.0).default_on_missing())
//!     .compile(&cx)
//!     .unwrap();
//!
//! let out = user.run(&json!({"name": "alice"})).unwrap();
//! assert_eq!(out, json!({"name": "alice", "age": 0}));
//!
//! let fail = user.run(&json!({"name": ""})).unwrap_err();
//! assert_eq!(fail.to_string(), "name: length of 0 < minimum length of 1");
//! ```

pub mod check;
pub mod config;
pub mod de;
pub mod engine;
pub mod fail;
pub mod kind;
pub mod schema;

pub use config::{camel_case, Config};
pub use fail::{CheckError, Code, CompileError, Fail, ParseError};
pub use kind::{set_spec, CollectionSpec, Kind, Mismatch, Registry, Sample};
pub use schema::{Compiled, Property, Required, Schema};
