// config.rs: Loading a Policy from a file.
//
// The format is picked from the extension: `.yaml`/`.yml`, `.toml`, or
// `.json`. A relative `workspace` is resolved against the directory the
// file lives in, so a policy can sit next to the project it governs.

use std::path::Path;

use crate::engine::PolicyEngine;
use crate::error::PolicyError;
use crate::policy::Policy;

/// Read and parse a policy file without validating it.
pub fn load_policy(path: impl AsRef<Path>) -> Result<Policy, PolicyError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let parse_error = |reason: String| PolicyError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let mut policy: Policy = match extension.as_deref() {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string()))?
        }
        Some("toml") => toml::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
        Some("json") => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
        _ => {
            return Err(PolicyError::Config(format!(
                "unsupported policy file extension for {} (expected .yaml, .yml, .toml, or .json)",
                path.display()
            )))
        }
    };

    if !policy.workspace.as_os_str().is_empty() && !policy.workspace.has_root() {
        if let Some(dir) = path.parent() {
            let base = if dir.as_os_str().is_empty() {
                std::env::current_dir().map_err(|source| PolicyError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
            } else {
                dir.to_path_buf()
            };
            policy.workspace = base.join(&policy.workspace);
        }
    }

    tracing::debug!(path = %path.display(), tools = policy.tools.len(), "policy file loaded");
    Ok(policy)
}

/// Load, validate, and compile a policy file into an engine.
pub fn load_engine(path: impl AsRef<Path>) -> Result<PolicyEngine, PolicyError> {
    PolicyEngine::from_policy(load_policy(path)?)
}
