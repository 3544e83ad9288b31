// policy.rs: The policy document as written in configuration.
//
// These are plain serde types. Nothing here is validated; the
// PolicyStore compiles and checks a `Policy` before any decision is made.
// Every field defaults to its most restrictive value so an omitted key
// can never widen access.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Per-tool authorization rules.
///
/// `allow`/`deny` hold path patterns, `allowlist`/`denylist` hold command
/// patterns, and `allow_domains` holds domain patterns. A tool only
/// consults the lists for its own resource kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolPolicy {
    /// Whether the tool may be used at all. Defaults to `false`.
    pub enabled: bool,
    /// Path patterns that grant access.
    pub allow: Vec<String>,
    /// Path patterns that revoke access; always checked before `allow`.
    pub deny: Vec<String>,
    /// Command patterns that grant execution.
    pub allowlist: Vec<String>,
    /// Command patterns that revoke execution; always checked before `allowlist`.
    pub denylist: Vec<String>,
    /// Domain patterns a network tool may contact. There is no deny list.
    pub allow_domains: Vec<String>,
}

impl ToolPolicy {
    /// An enabled policy with no rules. Mostly useful for building policies in code.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Whether this tool declares any path rules.
    pub fn has_path_rules(&self) -> bool {
        !self.allow.is_empty() || !self.deny.is_empty()
    }
}

/// How requested paths are turned into the absolute form that patterns see.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PathResolution {
    /// Collapse `.` and `..` without touching the filesystem. Symlinks are
    /// matched by the name they have inside the workspace, so a link that
    /// points outside the workspace is not detected.
    #[default]
    Lexical,
    /// Canonicalize the deepest existing ancestor (following symlinks),
    /// then append the remaining, not-yet-existing components.
    Strict,
}

/// The full policy document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    /// Containment root for path-based tools. Must be absolute once built.
    #[serde(default)]
    pub workspace: PathBuf,

    /// When true, a path with no matching allow rule is denied.
    #[serde(default = "default_deny")]
    pub default_deny: bool,

    /// Symlink handling for path checks.
    #[serde(default)]
    pub path_resolution: PathResolution,

    /// Tool name → rules. A tool missing from this map is disabled.
    #[serde(default)]
    pub tools: BTreeMap<String, ToolPolicy>,
}

fn default_deny() -> bool {
    true
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            workspace: PathBuf::new(),
            default_deny: default_deny(),
            path_resolution: PathResolution::default(),
            tools: BTreeMap::new(),
        }
    }
}

impl Policy {
    /// Start a policy rooted at `workspace` with default-deny on.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper to add or replace one tool's rules.
    pub fn with_tool(mut self, name: impl Into<String>, policy: ToolPolicy) -> Self {
        self.tools.insert(name.into(), policy);
        self
    }

    pub fn with_default_deny(mut self, default_deny: bool) -> Self {
        self.default_deny = default_deny;
        self
    }

    pub fn with_path_resolution(mut self, mode: PathResolution) -> Self {
        self.path_resolution = mode;
        self
    }
}
