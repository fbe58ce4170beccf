//! json-warden: compile JSON Schema documents into runnable validators.
//!
//! The crate splits along the line the design draws:
//! - [`compile`] is the schema compiler proper: a pure recursive pass that
//!   routes each schema node by its `type` (or structural keywords) and
//!   assembles a validator graph. All construction errors surface here.
//! - [`runtime`] is the validator layer the compiler targets: immutable
//!   combinator nodes ([`Validator`]) that check values and report
//!   structured, path-addressed [`Issues`].
//!
//! Typical use:
//!
//! ```
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": { "name": { "type": "string" } },
//!     "required": ["name"]
//! });
//! let validator = json_warden::convert(&schema).unwrap();
//! assert!(validator.check(&json!({"name": "Ada"})).is_ok());
//! assert!(validator.check(&json!({})).is_err());
//! ```
//!
//! Compilation is stateless and side-effect free; both the schema node and
//! the compiled validator are immutable, so validators can be shared across
//! threads and reused for any number of checks.
pub mod cli;
pub mod compile;
pub mod runtime;

pub use compile::{CompileError, convert};
pub use runtime::{Issue, Issues, Validator};
