//! # tg-policy
//!
//! Authorization policy for agent tools.
//!
//! A [`Policy`] document is validated into a [`PolicyStore`] and wrapped by
//! a [`PolicyEngine`], which answers three questions for a named tool: may
//! it touch this path, contact this domain, run this command. Tools reach
//! the engine through a [`PolicyHandle`] so the whole policy can be swapped
//! atomically at runtime.
//!
//! ## Key invariants
//!
//! - **Default deny**: a tool without a policy entry, or with
//!   `enabled: false`, is denied everything.
//! - **Deny wins**: deny rules are evaluated before allow rules, whatever
//!   order they are declared in.
//! - **Resolve before match**: paths are made absolute and `..` is
//!   collapsed before any pattern sees them.
//! - **Immutable**: engines never change after construction; reloads
//!   replace them whole.
//!
//! ## Known limitations
//!
//! - Command matching is over the whole string. Chained commands
//!   (`ls; rm -rf /`) are only caught if the denylist says so (`*;*`).
//! - In the default lexical resolution mode symlinks are not followed.
//!   Set `path_resolution: strict` to canonicalize before matching.

pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod pattern;
pub mod policy;
pub mod resolve;
pub mod store;

pub use config::{load_engine, load_policy};
pub use engine::{Decision, PolicyEngine, ResourceKind};
pub use error::PolicyError;
pub use handle::PolicyHandle;
pub use pattern::{CommandPattern, DomainPattern, PathPattern};
pub use policy::{PathResolution, Policy, ToolPolicy};
pub use store::{CompiledToolPolicy, PolicyStore};
