// engine.rs: Policy evaluation engine.
//
// The PolicyEngine is the single chokepoint for tool authorization. Each
// check is a pure function of the store and its inputs:
//
//   check_tool:    enabled?
//   check_path:    resolve → enabled? → deny rules → allow rules → fallback
//   check_domain:  enabled? → host syntax → allow_domains (no match = deny)
//   check_command: enabled? → denylist → allowlist (no match = deny)
//
// Deny rules are always evaluated before allow rules, so declaration
// order never matters. Nothing is cached between calls.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::pattern::{normalize_domain, PathPattern};
use crate::policy::Policy;
use crate::resolve::resolve_path;
use crate::store::{CompiledToolPolicy, PolicyStore};

/// The kind of resource a check is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Tool,
    Path,
    Domain,
    Command,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Tool => "tool",
            ResourceKind::Path => "path",
            ResourceKind::Domain => "domain",
            ResourceKind::Command => "command",
        })
    }
}

/// The outcome of one policy check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    /// Whether the action may proceed.
    pub allowed: bool,
    /// Human-readable explanation, used in error messages and logs.
    pub reason: String,
    /// The resource as it was evaluated: the resolved path, the
    /// normalized domain, or the trimmed command.
    pub resource: String,
    /// The pattern that decided the outcome, if one did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Decision {
    fn allow(resource: impl Into<String>, reason: impl Into<String>, rule: Option<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            resource: resource.into(),
            rule,
        }
    }

    fn deny(resource: impl Into<String>, reason: impl Into<String>, rule: Option<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            resource: resource.into(),
            rule,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Evaluates path, domain, and command requests against a [`PolicyStore`].
///
/// The engine holds no mutable state, so one instance can be shared by
/// every concurrently running tool call.
#[derive(Debug)]
pub struct PolicyEngine {
    store: PolicyStore,
    /// `<workspace>/**`, used when default-deny is off and a tool has no
    /// allow rules.
    workspace_scope: Option<PathPattern>,
}

impl PolicyEngine {
    pub fn new(store: PolicyStore) -> Self {
        let workspace = store.workspace();
        let workspace_scope = if workspace.as_os_str().is_empty() {
            None
        } else {
            PathPattern::new(&format!("{}/**", workspace.display())).ok()
        };
        Self {
            store,
            workspace_scope,
        }
    }

    /// Validate `policy` and build an engine over it.
    pub fn from_policy(policy: Policy) -> Result<Self, PolicyError> {
        Ok(Self::new(PolicyStore::new(policy)?))
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    /// The normalized workspace root (empty if none is configured).
    pub fn workspace(&self) -> &Path {
        self.store.workspace()
    }

    /// True only when the policy has an entry for `tool` with `enabled: true`.
    pub fn is_enabled(&self, tool: &str) -> bool {
        self.store.tool(tool).is_some_and(|t| t.enabled)
    }

    /// Decide whether `tool` may be invoked at all, before its arguments
    /// are looked at.
    pub fn check_tool(&self, tool: &str) -> Decision {
        let decision = match self.enabled_rules(tool) {
            Ok(_) => Decision::allow(tool, format!("tool '{}' is enabled", tool), None),
            Err(reason) => Decision::deny(tool, reason, None),
        };
        log_decision(tool, ResourceKind::Tool, &decision);
        decision
    }

    /// Decide whether `tool` may touch `path`.
    pub fn check_path(&self, tool: &str, path: impl AsRef<Path>) -> Decision {
        let requested = path.as_ref();
        let decision = self.evaluate_path(tool, requested);
        log_decision(tool, ResourceKind::Path, &decision);
        decision
    }

    fn evaluate_path(&self, tool: &str, requested: &Path) -> Decision {
        // Step 1: resolve before any matching so `..` cannot slip past a pattern.
        let resolved = match resolve_path(
            self.store.workspace(),
            requested,
            self.store.path_resolution(),
        ) {
            Ok(p) => p,
            Err(reason) => {
                return Decision::deny(requested.to_string_lossy(), reason, None);
            }
        };
        let resource = resolved.to_string_lossy().into_owned();

        // Step 2: the tool must exist and be enabled.
        let rules = match self.enabled_rules(tool) {
            Ok(rules) => rules,
            Err(reason) => return Decision::deny(resource, reason, None),
        };

        // Step 3: deny wins, whatever the allow rules say.
        if let Some(rule) = rules.deny.iter().find(|p| p.matches(&resolved)) {
            return Decision::deny(
                resource,
                format!("denied by deny rule '{}'", rule),
                Some(rule.to_string()),
            );
        }

        // Step 4: explicit allow.
        if let Some(rule) = rules.allow.iter().find(|p| p.matches(&resolved)) {
            return Decision::allow(
                resource,
                format!("allowed by rule '{}'", rule),
                Some(rule.to_string()),
            );
        }

        // Step 5: fallback. A non-empty allow list always requires a match.
        if self.store.default_deny() || !rules.allow.is_empty() {
            return Decision::deny(resource, "no matching allow rule", None);
        }
        match &self.workspace_scope {
            Some(scope) if scope.matches(&resolved) => Decision::allow(
                resource,
                "inside workspace (default-deny off, no allow rules)",
                Some(scope.to_string()),
            ),
            Some(_) => Decision::deny(
                resource,
                "outside workspace (default-deny off, no allow rules)",
                None,
            ),
            None => Decision::deny(resource, "no workspace configured", None),
        }
    }

    /// Decide whether `tool` may contact `domain`.
    pub fn check_domain(&self, tool: &str, domain: &str) -> Decision {
        let normalized = normalize_domain(domain);
        let decision = self.evaluate_domain(tool, normalized);
        log_decision(tool, ResourceKind::Domain, &decision);
        decision
    }

    fn evaluate_domain(&self, tool: &str, domain: String) -> Decision {
        let rules = match self.enabled_rules(tool) {
            Ok(rules) => rules,
            Err(reason) => return Decision::deny(domain, reason, None),
        };
        if domain.is_empty() {
            return Decision::deny(domain, "empty domain", None);
        }
        // Only a bare host may be matched. URL fragments such as
        // `evil.com#.trusted.com` would otherwise satisfy `*.trusted.com`.
        let domain = match url::Host::parse(&domain) {
            Ok(host) => host.to_string(),
            Err(e) => {
                let reason = format!("'{}' is not a valid host name: {}", domain, e);
                return Decision::deny(domain, reason, None);
            }
        };

        match rules.allow_domains.iter().find(|p| p.matches(&domain)) {
            Some(rule) => Decision::allow(
                domain,
                format!("allowed by domain rule '{}'", rule),
                Some(rule.to_string()),
            ),
            None => {
                let reason = format!("domain '{}' matches no allow_domains rule", domain);
                Decision::deny(domain, reason, None)
            }
        }
    }

    /// Decide whether `tool` may run `command`.
    pub fn check_command(&self, tool: &str, command: &str) -> Decision {
        let decision = self.evaluate_command(tool, command.trim());
        log_decision(tool, ResourceKind::Command, &decision);
        decision
    }

    fn evaluate_command(&self, tool: &str, command: &str) -> Decision {
        let rules = match self.enabled_rules(tool) {
            Ok(rules) => rules,
            Err(reason) => return Decision::deny(command, reason, None),
        };
        if command.is_empty() {
            return Decision::deny(command, "empty command", None);
        }

        if let Some(rule) = rules.denylist.iter().find(|p| p.matches(command)) {
            return Decision::deny(
                command,
                format!("denied by denylist rule '{}'", rule),
                Some(rule.to_string()),
            );
        }
        match rules.allowlist.iter().find(|p| p.matches(command)) {
            Some(rule) => Decision::allow(
                command,
                format!("allowed by allowlist rule '{}'", rule),
                Some(rule.to_string()),
            ),
            None => Decision::deny(command, "no matching allowlist rule", None),
        }
    }

    fn enabled_rules(&self, tool: &str) -> Result<&CompiledToolPolicy, String> {
        match self.store.tool(tool) {
            Some(rules) if rules.enabled => Ok(rules),
            Some(_) => Err(format!("tool '{}' is disabled", tool)),
            None => Err(format!("tool '{}' is disabled (no policy entry)", tool)),
        }
    }
}

fn log_decision(tool: &str, kind: ResourceKind, decision: &Decision) {
    if decision.allowed {
        tracing::debug!(
            tool,
            kind = %kind,
            resource = %decision.resource,
            reason = %decision.reason,
            "policy allowed"
        );
    } else {
        tracing::info!(
            tool,
            kind = %kind,
            resource = %decision.resource,
            reason = %decision.reason,
            "policy denied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ToolPolicy;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn engine(policy: Policy) -> PolicyEngine {
        PolicyEngine::from_policy(policy).unwrap()
    }

    fn path_tool(allow: &[&str], deny: &[&str]) -> ToolPolicy {
        ToolPolicy {
            enabled: true,
            allow: strings(allow),
            deny: strings(deny),
            ..ToolPolicy::default()
        }
    }

    #[test]
    fn deny_rule_beats_allow_rule() {
        let engine = engine(
            Policy::new("/ws").with_tool("read", path_tool(&["/ws/**"], &["/ws/.ssh/*"])),
        );

        let decision = engine.check_path("read", "/ws/.ssh/id_rsa");
        assert!(!decision.allowed);
        assert!(decision.reason.contains("deny rule"));
        assert_eq!(decision.rule.as_deref(), Some("/ws/.ssh/*"));

        assert!(engine.check_path("read", "/ws/src/main.rs").allowed);
    }

    #[test]
    fn deny_wins_regardless_of_declaration_order() {
        // Same rules, allow listed after deny in the document.
        let engine = engine(
            Policy::new("/ws").with_tool("read", path_tool(&["/ws/.ssh/*", "/ws/**"], &["/ws/.ssh/*"])),
        );
        assert!(!engine.check_path("read", "/ws/.ssh/id_rsa").allowed);
    }

    #[test]
    fn traversal_is_resolved_before_matching() {
        let engine = engine(Policy::new("/ws").with_tool("read", path_tool(&["/ws/**"], &[])));

        let decision = engine.check_path("read", "/ws/../secret.txt");
        assert!(!decision.allowed);
        assert_eq!(decision.resource, "/secret.txt");
        assert_eq!(decision.reason, "no matching allow rule");

        let sneaky = engine.check_path("read", "/ws/a/b/../../../etc/passwd");
        assert!(!sneaky.allowed);
        assert_eq!(sneaky.resource, "/etc/passwd");
    }

    #[test]
    fn relative_paths_resolve_inside_workspace() {
        let engine = engine(Policy::new("/ws").with_tool("read", path_tool(&["src/**"], &[])));
        let decision = engine.check_path("read", "src/lib.rs");
        assert!(decision.allowed);
        assert_eq!(decision.resource, "/ws/src/lib.rs");
        assert!(!engine.check_path("read", "../ws2/src/lib.rs").allowed);
    }

    #[test]
    fn disabled_and_unknown_tools_are_denied() {
        let engine = engine(
            Policy::new("/ws")
                .with_tool("read", path_tool(&["/ws/**"], &[]))
                .with_tool(
                    "write",
                    ToolPolicy {
                        enabled: false,
                        ..path_tool(&["/ws/**"], &[])
                    },
                ),
        );

        let disabled = engine.check_path("write", "/ws/a.txt");
        assert!(!disabled.allowed);
        assert!(disabled.reason.contains("disabled"));

        let unknown = engine.check_path("delete", "/ws/a.txt");
        assert!(!unknown.allowed);
        assert!(unknown.reason.contains("no policy entry"));

        assert!(engine.is_enabled("read"));
        assert!(!engine.is_enabled("write"));
        assert!(!engine.is_enabled("delete"));
    }

    #[test]
    fn default_deny_denies_tool_missing_from_map() {
        let engine = engine(Policy::new("/ws").with_tool("read", path_tool(&["/ws/**"], &[])));
        assert!(!engine.check_path("write", "/ws/out.txt").allowed);
    }

    #[test]
    fn missing_tool_is_denied_even_without_default_deny() {
        let engine = engine(
            Policy::new("/ws")
                .with_default_deny(false)
                .with_tool("read", path_tool(&[], &[])),
        );
        let decision = engine.check_path("write", "/ws/out.txt");
        assert!(!decision.allowed);
        assert!(decision.reason.contains("disabled"));
    }

    #[test]
    fn empty_allow_without_default_deny_is_workspace_scoped() {
        let engine = engine(
            Policy::new("/ws")
                .with_default_deny(false)
                .with_tool("read", path_tool(&[], &["/ws/.git/**"])),
        );

        let inside = engine.check_path("read", "/ws/notes.md");
        assert!(inside.allowed);
        assert!(inside.reason.contains("inside workspace"));

        assert!(engine.check_path("read", "/ws").allowed);
        assert!(!engine.check_path("read", "/etc/passwd").allowed);
        assert!(!engine.check_path("read", "/ws/../etc/passwd").allowed);
        assert!(!engine.check_path("read", "/ws/.git/config").allowed);
    }

    #[test]
    fn empty_allow_with_default_deny_denies_everything() {
        let engine = engine(Policy::new("/ws").with_tool("read", path_tool(&[], &[])));
        let decision = engine.check_path("read", "/ws/notes.md");
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "no matching allow rule");
    }

    #[test]
    fn non_empty_allow_requires_match_without_default_deny() {
        let engine = engine(
            Policy::new("/ws")
                .with_default_deny(false)
                .with_tool("read", path_tool(&["/ws/docs/**"], &[])),
        );
        assert!(engine.check_path("read", "/ws/docs/a.md").allowed);
        assert!(!engine.check_path("read", "/ws/src/a.rs").allowed);
    }

    #[test]
    fn domain_rules() {
        let engine = engine(Policy::new("/ws").with_tool(
            "web_fetch",
            ToolPolicy {
                enabled: true,
                allow_domains: strings(&["api.example.com", "*.trusted.com"]),
                ..ToolPolicy::default()
            },
        ));

        assert!(engine.check_domain("web_fetch", "api.example.com").allowed);
        assert!(engine.check_domain("web_fetch", "sub.trusted.com").allowed);
        assert!(engine.check_domain("web_fetch", "trusted.com").allowed);
        assert!(engine.check_domain("web_fetch", "API.Example.com.").allowed);
        assert!(!engine.check_domain("web_fetch", "evil.com").allowed);
        assert!(!engine.check_domain("web_fetch", "example.com").allowed);
        assert!(!engine.check_domain("web_fetch", "").allowed);
        assert!(!engine.check_domain("read", "api.example.com").allowed);
    }

    #[test]
    fn domain_input_must_be_a_bare_host() {
        let engine = engine(Policy::new("/ws").with_tool(
            "web_fetch",
            ToolPolicy {
                enabled: true,
                allow_domains: strings(&["*.trusted.com", "127.0.0.1"]),
                ..ToolPolicy::default()
            },
        ));

        for input in [
            "evil.com#.trusted.com",
            "evil.com/.trusted.com",
            "user@evil.com:.trusted.com",
            "evil.com .trusted.com",
            "evil.com?.trusted.com",
        ] {
            let decision = engine.check_domain("web_fetch", input);
            assert!(!decision.allowed, "{} was allowed", input);
            assert!(decision.reason.contains("not a valid host name"), "{}", decision.reason);
        }

        assert!(engine.check_domain("web_fetch", "127.0.0.1").allowed);
        assert!(engine.check_domain("web_fetch", "a.b.trusted.com").allowed);
        assert!(!engine.check_domain("web_fetch", "[::1]").allowed);
    }

    #[test]
    fn check_tool_reports_enablement() {
        let engine = engine(
            Policy::new("/ws")
                .with_tool("read", ToolPolicy::enabled())
                .with_tool("write", ToolPolicy::default()),
        );

        let read = engine.check_tool("read");
        assert!(read.allowed);
        assert_eq!(read.resource, "read");

        let write = engine.check_tool("write");
        assert!(!write.allowed);
        assert_eq!(write.reason, "tool 'write' is disabled");

        let bash = engine.check_tool("bash");
        assert!(!bash.allowed);
        assert!(bash.reason.contains("no policy entry"));
    }

    #[test]
    fn command_rules() {
        let engine = engine(Policy::new("/ws").with_tool(
            "bash",
            ToolPolicy {
                enabled: true,
                allowlist: strings(&["ls *", "cat *"]),
                denylist: strings(&["rm *", "sudo *", "*;*"]),
                ..ToolPolicy::default()
            },
        ));

        assert!(engine.check_command("bash", "ls .").allowed);
        assert!(engine.check_command("bash", "  ls .  ").allowed);

        let rm = engine.check_command("bash", "rm -rf /");
        assert!(!rm.allowed);
        assert_eq!(rm.rule.as_deref(), Some("rm *"));

        let chained = engine.check_command("bash", "ls; rm -rf /");
        assert!(!chained.allowed);
        assert_eq!(chained.rule.as_deref(), Some("*;*"));

        assert!(!engine.check_command("bash", "sudo cat /etc/shadow").allowed);
        assert!(!engine.check_command("bash", "whoami").allowed);
        assert!(!engine.check_command("bash", "").allowed);
    }

    #[test]
    fn repeated_checks_are_identical() {
        let engine = engine(
            Policy::new("/ws")
                .with_tool("read", path_tool(&["/ws/**"], &["/ws/.ssh/*"]))
                .with_tool(
                    "bash",
                    ToolPolicy {
                        enabled: true,
                        allowlist: strings(&["ls *"]),
                        ..ToolPolicy::default()
                    },
                ),
        );

        let first = (
            engine.check_path("read", "/ws/.ssh/id_rsa"),
            engine.check_path("read", "/ws/a.txt"),
            engine.check_command("bash", "ls -la"),
        );
        for _ in 0..100 {
            let again = (
                engine.check_path("read", "/ws/.ssh/id_rsa"),
                engine.check_path("read", "/ws/a.txt"),
                engine.check_command("bash", "ls -la"),
            );
            assert_eq!(first, again);
        }
    }

    #[test]
    fn decision_serialization() {
        let engine = engine(Policy::new("/ws").with_tool("read", path_tool(&["/ws/**"], &[])));
        let json = serde_json::to_value(engine.check_path("read", "/ws/a")).unwrap();
        assert_eq!(json["allowed"], true);
        assert_eq!(json["resource"], "/ws/a");
        assert_eq!(json["rule"], "/ws/**");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_lexical_vs_strict() {
        use crate::policy::PathResolution;

        let outside = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        let ws_root = std::fs::canonicalize(ws.path()).unwrap();
        std::fs::write(outside.path().join("secret.txt"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path(), ws_root.join("link")).unwrap();

        let policy = Policy::new(&ws_root).with_tool("read", path_tool(&["**"], &[]));

        // Lexical mode matches the link by its in-workspace name.
        let lexical = engine(policy.clone());
        assert!(lexical.check_path("read", "link/secret.txt").allowed);

        // Strict mode follows it out of the workspace.
        let strict = engine(policy.with_path_resolution(PathResolution::Strict));
        let decision = strict.check_path("read", "link/secret.txt");
        assert!(!decision.allowed);
        assert!(strict.check_path("read", "plain.txt").allowed);
    }
}
