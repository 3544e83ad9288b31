// error.rs: Error types for tool dispatch and execution.
//
// Callers tell "blocked by policy" apart from everything else by looking
// for the substring "denied" in the message. Only `PolicyDenied` may
// contain it; the constructors below keep it out of the other variants.

use thiserror::Error;

/// Errors returned by [`Tool::execute`](crate::Tool::execute) and the registry.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool with this name is registered.
    #[error("tool '{name}' is not available")]
    Unavailable { name: String },

    /// Arguments were missing or malformed. Nothing was checked or run.
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The policy engine refused the request. Nothing was run.
    #[error("{tool}: {kind} '{resource}' denied by policy: {reason}")]
    PolicyDenied {
        tool: String,
        kind: tg_policy::ResourceKind,
        resource: String,
        reason: String,
    },

    /// The underlying action (I/O, process, network) failed.
    #[error("tool '{tool}' failed: {reason}")]
    Execution { tool: String, reason: String },
}

impl ToolError {
    /// `name` comes from the caller, so it is scrubbed like any other text.
    pub fn unavailable(name: &str) -> Self {
        Self::Unavailable {
            name: scrub(name.to_string()),
        }
    }

    pub fn invalid_arguments(tool: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: scrub(tool.to_string()),
            reason: scrub(reason.into()),
        }
    }

    pub fn denied(tool: &str, kind: tg_policy::ResourceKind, decision: &tg_policy::Decision) -> Self {
        Self::PolicyDenied {
            tool: tool.to_string(),
            kind,
            resource: decision.resource.clone(),
            reason: decision.reason.clone(),
        }
    }

    pub fn execution(tool: &str, reason: impl Into<String>) -> Self {
        Self::Execution {
            tool: scrub(tool.to_string()),
            reason: scrub(reason.into()),
        }
    }

    /// Wrap an I/O error from the underlying action.
    pub fn io(tool: &str, context: &str, err: &std::io::Error) -> Self {
        Self::execution(tool, format!("{}: {}", context, err))
    }

    /// True for policy denials.
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::PolicyDenied { .. })
    }

    /// Only execution failures may succeed on a later attempt with the
    /// same arguments.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

/// Rephrase OS and library messages so non-policy errors never carry the
/// word reserved for policy denials ("Permission denied (os error 13)").
/// Matching ignores ASCII case.
fn scrub(text: String) -> String {
    const WORD: &str = "denied";
    let lower = text.to_ascii_lowercase();
    if !lower.contains(WORD) {
        return text;
    }
    let mut out = String::with_capacity(text.len() + 4);
    let mut rest = 0;
    for (at, _) in lower.match_indices(WORD) {
        out.push_str(&text[rest..at]);
        let capital = text[at..].starts_with(|c: char| c.is_ascii_uppercase());
        out.push_str(if capital { "Refused" } else { "refused" });
        rest = at + WORD.len();
    }
    out.push_str(&text[rest..]);
    out
}
