// resolve.rs: Turning a requested path into the form patterns are matched against.
//
// Every path check resolves first. Prefix comparisons on raw input are
// defeated by `..` segments, so matching only ever sees absolute paths
// with `.` and `..` already collapsed.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::policy::PathResolution;

/// Collapse `.` and `..` components without consulting the filesystem.
///
/// `..` at the root stays at the root (`/../etc` → `/etc`).
pub fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Resolve `requested` against `workspace` using the given mode.
///
/// Relative paths are joined onto the workspace. An empty workspace can
/// only resolve absolute paths.
pub fn resolve_path(
    workspace: &Path,
    requested: &Path,
    mode: PathResolution,
) -> Result<PathBuf, String> {
    if requested.as_os_str().is_empty() {
        return Err("empty path".to_string());
    }

    let absolute = if requested.has_root() {
        requested.to_path_buf()
    } else if workspace.as_os_str().is_empty() {
        return Err(format!(
            "cannot resolve relative path '{}' without a workspace",
            requested.display()
        ));
    } else {
        workspace.join(requested)
    };

    match mode {
        PathResolution::Lexical => Ok(normalize_lexical(&absolute)),
        PathResolution::Strict => resolve_strict(&absolute)
            .map_err(|e| format!("cannot resolve '{}': {}", absolute.display(), e.kind())),
    }
}

/// Canonicalize the longest existing prefix, then append the rest.
///
/// Components after the existing prefix do not exist yet, so they cannot
/// be symlinks and are collapsed lexically.
fn resolve_strict(absolute: &Path) -> io::Result<PathBuf> {
    let components: Vec<Component<'_>> = absolute.components().collect();
    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        match std::fs::canonicalize(&prefix) {
            Ok(mut resolved) => {
                resolved.extend(&components[split..]);
                return Ok(normalize_lexical(&resolved));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(normalize_lexical(absolute))
}
