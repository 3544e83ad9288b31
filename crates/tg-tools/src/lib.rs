//! # tg-tools
//!
//! The capability layer agents call into. A [`ToolRegistry`] holds named
//! [`Tool`]s; each tool checks its own resource against the shared
//! [`tg_policy::PolicyHandle`] before acting, so a call that fails the
//! check never reaches the filesystem, a shell, or the network.
//!
//! Built-in tools:
//!
//! | Name        | Checks           | Action                          |
//! |-------------|------------------|---------------------------------|
//! | `read`      | `check_path`     | read a text file                |
//! | `write`     | `check_path`     | create or overwrite a file      |
//! | `edit`      | `check_path`     | string replacement in a file    |
//! | `list`      | `check_path`     | list a directory                |
//! | `bash`      | `check_command`  | run `sh -c` in the workspace    |
//! | `web_fetch` | `check_domain`   | HTTP(S) GET                     |
//!
//! Errors caused by the policy are [`ToolError::PolicyDenied`] and are the
//! only ones whose message contains "denied".

pub mod bash;
pub mod error;
pub mod fs;
pub mod registry;
pub mod tool;
pub mod web_fetch;

pub use bash::{BashOutput, BashTool};
pub use error::ToolError;
pub use fs::{EditTool, ListTool, ReadTool, WriteTool};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolContext, ToolDefinition};
pub use web_fetch::WebFetchTool;
