// store.rs: PolicyStore, the validated and compiled form of a Policy.
//
// A store is built once at startup. Construction is the only place a
// policy can fail: patterns are compiled, the workspace is normalized
// (and canonicalized in strict mode), and relative path patterns are
// anchored to the workspace. After that the store is read-only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::PolicyError;
use crate::pattern::{CommandPattern, DomainPattern, PathPattern};
use crate::policy::{PathResolution, Policy, ToolPolicy};
use crate::resolve::normalize_lexical;

/// One tool's rules with every pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledToolPolicy {
    pub enabled: bool,
    pub allow: Vec<PathPattern>,
    pub deny: Vec<PathPattern>,
    pub allowlist: Vec<CommandPattern>,
    pub denylist: Vec<CommandPattern>,
    pub allow_domains: Vec<DomainPattern>,
}

/// Immutable, validated policy configuration.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    workspace: PathBuf,
    default_deny: bool,
    path_resolution: PathResolution,
    tools: BTreeMap<String, CompiledToolPolicy>,
    source: Policy,
}

impl PolicyStore {
    /// Validate and compile a policy document.
    pub fn new(policy: Policy) -> Result<Self, PolicyError> {
        let configured = normalize_lexical(&policy.workspace);
        let workspace = resolve_workspace(&policy)?;

        let mut tools = BTreeMap::new();
        for (name, rules) in &policy.tools {
            let compiled = compile_tool(name, rules, &configured, &workspace)?;
            tools.insert(name.clone(), compiled);
        }

        tracing::debug!(
            workspace = %workspace.display(),
            default_deny = policy.default_deny,
            tools = tools.len(),
            "policy store built"
        );

        Ok(Self {
            workspace,
            default_deny: policy.default_deny,
            path_resolution: policy.path_resolution,
            tools,
            source: policy,
        })
    }

    /// The normalized workspace root (empty if none is configured).
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn default_deny(&self) -> bool {
        self.default_deny
    }

    pub fn path_resolution(&self) -> PathResolution {
        self.path_resolution
    }

    /// Compiled rules for `tool`, if the policy mentions it.
    pub fn tool(&self, tool: &str) -> Option<&CompiledToolPolicy> {
        self.tools.get(tool)
    }

    /// Names of every tool the policy mentions, enabled or not.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// The document this store was built from.
    pub fn source(&self) -> &Policy {
        &self.source
    }
}

fn resolve_workspace(policy: &Policy) -> Result<PathBuf, PolicyError> {
    if policy.workspace.as_os_str().is_empty() {
        if let Some((name, _)) = policy.tools.iter().find(|(_, t)| t.has_path_rules()) {
            return Err(PolicyError::Config(format!(
                "workspace is required: tool '{}' declares path rules",
                name
            )));
        }
        return Ok(PathBuf::new());
    }

    if !policy.workspace.has_root() {
        return Err(PolicyError::Config(format!(
            "workspace must be an absolute path, got '{}'",
            policy.workspace.display()
        )));
    }

    let lexical = normalize_lexical(&policy.workspace);
    match policy.path_resolution {
        PathResolution::Lexical => Ok(lexical),
        PathResolution::Strict => std::fs::canonicalize(&lexical).map_err(|e| {
            PolicyError::Config(format!(
                "strict path resolution needs an existing workspace: '{}': {}",
                lexical.display(),
                e
            ))
        }),
    }
}

fn compile_tool(
    name: &str,
    rules: &ToolPolicy,
    configured: &Path,
    workspace: &Path,
) -> Result<CompiledToolPolicy, PolicyError> {
    let path = |raw: &String| {
        let anchored = anchor_path_pattern(raw, configured, workspace);
        PathPattern::new(&anchored).map_err(|reason| invalid(name, "path", raw, reason))
    };
    let command = |raw: &String| {
        CommandPattern::new(raw).map_err(|reason| invalid(name, "command", raw, reason))
    };
    let domain = |raw: &String| {
        DomainPattern::new(raw).map_err(|reason| invalid(name, "domain", raw, reason))
    };

    Ok(CompiledToolPolicy {
        enabled: rules.enabled,
        allow: rules.allow.iter().map(path).collect::<Result<_, _>>()?,
        deny: rules.deny.iter().map(path).collect::<Result<_, _>>()?,
        allowlist: rules.allowlist.iter().map(command).collect::<Result<_, _>>()?,
        denylist: rules.denylist.iter().map(command).collect::<Result<_, _>>()?,
        allow_domains: rules
            .allow_domains
            .iter()
            .map(domain)
            .collect::<Result<_, _>>()?,
    })
}

/// Make a path pattern absolute and consistent with the effective workspace.
///
/// Relative patterns (`src/**`) are joined onto the workspace. Absolute
/// patterns written against the configured workspace are rebased when
/// strict mode canonicalized it to a different location.
fn anchor_path_pattern(raw: &str, configured: &Path, workspace: &Path) -> String {
    let pattern = Path::new(raw);
    if !pattern.has_root() {
        if workspace.as_os_str().is_empty() {
            return raw.to_string();
        }
        return workspace.join(pattern).to_string_lossy().into_owned();
    }
    if configured != workspace && !configured.as_os_str().is_empty() {
        if let Ok(rest) = pattern.strip_prefix(configured) {
            return workspace.join(rest).to_string_lossy().into_owned();
        }
    }
    raw.to_string()
}

fn invalid(tool: &str, kind: &'static str, pattern: &str, reason: String) -> PolicyError {
    PolicyError::InvalidPattern {
        tool: tool.to_string(),
        kind,
        pattern: pattern.to_string(),
        reason,
    }
}
