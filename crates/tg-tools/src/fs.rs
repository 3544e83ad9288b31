// fs.rs: Filesystem tools (read, write, edit, list).
//
// Each tool resolves its `path` argument through the policy engine and
// then acts on the *resolved* path the decision was made about, never on
// the raw argument. A denied path returns before any file is opened.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tg_policy::{PolicyEngine, PolicyHandle, ResourceKind};

use crate::error::ToolError;
use crate::tool::{authorize_tool, parse_args, schema_for, truncate_utf8, Tool, ToolContext};

/// Check `path` for `tool` and return the resolved path on approval.
fn authorize_path(engine: &PolicyEngine, tool: &str, path: &str) -> Result<PathBuf, ToolError> {
    if path.trim().is_empty() {
        return Err(ToolError::invalid_arguments(tool, "path must not be empty"));
    }
    let decision = engine.check_path(tool, path);
    if !decision.allowed {
        return Err(ToolError::denied(tool, ResourceKind::Path, &decision));
    }
    Ok(PathBuf::from(decision.resource))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

// ── read ─────────────────────────────────────────────────────────

/// Parameters for `read`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadParams {
    /// File to read, absolute or relative to the workspace.
    pub path: String,
    /// First line to return, 1-based. Defaults to 1.
    #[serde(default)]
    pub offset: Option<usize>,
    /// Maximum number of lines to return.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Reads a UTF-8 text file.
#[derive(Debug, Clone)]
pub struct ReadTool {
    policy: PolicyHandle,
}

impl ReadTool {
    pub const NAME: &'static str = "read";

    pub fn new(policy: PolicyHandle) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Read a text file. Supports an optional 1-based line offset and line limit."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<ReadParams>()
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let engine = self.policy.current();
        authorize_tool(&engine, Self::NAME)?;
        let params: ReadParams = parse_args(Self::NAME, args)?;
        if params.offset == Some(0) {
            return Err(ToolError::invalid_arguments(Self::NAME, "offset is 1-based"));
        }
        let path = authorize_path(&engine, Self::NAME, &params.path)?;

        tracing::debug!(call_id = %ctx.call_id, path = %path.display(), "read");
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::io(Self::NAME, &format!("reading {}", display(&path)), &e))?;
        let text = String::from_utf8(bytes).map_err(|_| {
            ToolError::execution(Self::NAME, format!("{} is not valid UTF-8", display(&path)))
        })?;

        let total_lines = text.lines().count();
        let mut content = if params.offset.is_some() || params.limit.is_some() {
            let skip = params.offset.unwrap_or(1) - 1;
            let take = params.limit.unwrap_or(usize::MAX);
            text.lines().skip(skip).take(take).collect::<Vec<_>>().join("\n")
        } else {
            text
        };
        let truncated = truncate_utf8(&mut content, ctx.max_output_bytes);

        Ok(serde_json::json!({
            "path": display(&path),
            "content": content,
            "total_lines": total_lines,
            "truncated": truncated,
        }))
    }
}

// ── write ────────────────────────────────────────────────────────

/// Parameters for `write`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteParams {
    /// File to write, absolute or relative to the workspace.
    pub path: String,
    /// Full new content of the file.
    pub content: String,
}

/// Creates or overwrites a file, creating parent directories as needed.
#[derive(Debug, Clone)]
pub struct WriteTool {
    policy: PolicyHandle,
}

impl WriteTool {
    pub const NAME: &'static str = "write";

    pub fn new(policy: PolicyHandle) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Write a file, replacing any existing content. Parent directories are created."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<WriteParams>()
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let engine = self.policy.current();
        authorize_tool(&engine, Self::NAME)?;
        let params: WriteParams = parse_args(Self::NAME, args)?;
        let path = authorize_path(&engine, Self::NAME, &params.path)?;

        tracing::debug!(call_id = %ctx.call_id, path = %path.display(), bytes = params.content.len(), "write");
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::io(Self::NAME, &format!("creating {}", display(parent)), &e)
            })?;
        }
        tokio::fs::write(&path, params.content.as_bytes())
            .await
            .map_err(|e| ToolError::io(Self::NAME, &format!("writing {}", display(&path)), &e))?;

        Ok(serde_json::json!({
            "path": display(&path),
            "bytes_written": params.content.len(),
        }))
    }
}

// ── edit ─────────────────────────────────────────────────────────

/// Parameters for `edit`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct EditParams {
    /// File to edit, absolute or relative to the workspace.
    pub path: String,
    /// Exact text to replace.
    pub old_string: String,
    /// Replacement text.
    pub new_string: String,
    /// Replace every occurrence instead of requiring a unique match.
    #[serde(default)]
    pub replace_all: bool,
}

/// Exact string replacement inside an existing file.
#[derive(Debug, Clone)]
pub struct EditTool {
    policy: PolicyHandle,
}

impl EditTool {
    pub const NAME: &'static str = "edit";

    pub fn new(policy: PolicyHandle) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Replace an exact string in a file. The string must occur exactly once unless replace_all is set."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<EditParams>()
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let engine = self.policy.current();
        authorize_tool(&engine, Self::NAME)?;
        let params: EditParams = parse_args(Self::NAME, args)?;
        if params.old_string.is_empty() {
            return Err(ToolError::invalid_arguments(Self::NAME, "old_string must not be empty"));
        }
        if params.old_string == params.new_string {
            return Err(ToolError::invalid_arguments(
                Self::NAME,
                "old_string and new_string are identical",
            ));
        }
        let path = authorize_path(&engine, Self::NAME, &params.path)?;

        tracing::debug!(call_id = %ctx.call_id, path = %path.display(), "edit");
        let original = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::io(Self::NAME, &format!("reading {}", display(&path)), &e))?;

        let occurrences = original.matches(params.old_string.as_str()).count();
        if occurrences == 0 {
            return Err(ToolError::execution(
                Self::NAME,
                format!("old_string not found in {}", display(&path)),
            ));
        }
        if occurrences > 1 && !params.replace_all {
            return Err(ToolError::execution(
                Self::NAME,
                format!(
                    "old_string occurs {} times in {}; add context or set replace_all",
                    occurrences,
                    display(&path)
                ),
            ));
        }

        let updated = if params.replace_all {
            original.replace(&params.old_string, &params.new_string)
        } else {
            original.replacen(&params.old_string, &params.new_string, 1)
        };
        tokio::fs::write(&path, updated.as_bytes())
            .await
            .map_err(|e| ToolError::io(Self::NAME, &format!("writing {}", display(&path)), &e))?;

        Ok(serde_json::json!({
            "path": display(&path),
            "replacements": occurrences,
        }))
    }
}

// ── list ─────────────────────────────────────────────────────────

/// Parameters for `list`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListParams {
    /// Directory to list. Defaults to the workspace root.
    #[serde(default = "default_list_path")]
    pub path: String,
}

fn default_list_path() -> String {
    ".".to_string()
}

/// One directory entry in a `list` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

/// Lists a directory's immediate entries.
#[derive(Debug, Clone)]
pub struct ListTool {
    policy: PolicyHandle,
}

impl ListTool {
    pub const NAME: &'static str = "list";

    pub fn new(policy: PolicyHandle) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ListTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "List the entries of a directory, sorted by name."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<ListParams>()
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let engine = self.policy.current();
        authorize_tool(&engine, Self::NAME)?;
        let params: ListParams = parse_args(Self::NAME, args)?;
        let path = authorize_path(&engine, Self::NAME, &params.path)?;

        tracing::debug!(call_id = %ctx.call_id, path = %path.display(), "list");
        let listing_error =
            |e: std::io::Error| ToolError::io(Self::NAME, &format!("listing {}", display(&path)), &e);
        let mut reader = tokio::fs::read_dir(&path).await.map_err(listing_error)?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(listing_error)? {
            let kind = match entry.file_type().await {
                Ok(t) if t.is_symlink() => EntryKind::Symlink,
                Ok(t) if t.is_dir() => EntryKind::Dir,
                Ok(t) if t.is_file() => EntryKind::File,
                _ => EntryKind::Other,
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(serde_json::json!({
            "path": display(&path),
            "entries": entries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tg_policy::{Policy, PolicyEngine, ToolPolicy};

    /// Scratch workspace where every fs tool may touch everything except `secret/`.
    fn setup() -> (TempDir, PolicyHandle) {
        let dir = tempfile::tempdir().unwrap();
        let rules = ToolPolicy {
            enabled: true,
            allow: vec!["**".to_string()],
            deny: vec!["secret/**".to_string()],
            ..ToolPolicy::default()
        };
        let mut policy = Policy::new(dir.path());
        for name in ["read", "write", "edit", "list"] {
            policy = policy.with_tool(name, rules.clone());
        }
        let handle = PolicyHandle::new(PolicyEngine::from_policy(policy).unwrap());
        (dir, handle)
    }

    fn ctx() -> ToolContext {
        ToolContext::default()
    }

    #[tokio::test]
    async fn read_returns_content_and_line_window() {
        let (dir, policy) = setup();
        fs::write(dir.path().join("a.txt"), "one\ntwo\nthree\n").unwrap();
        let tool = ReadTool::new(policy);

        let all = tool.execute(&ctx(), serde_json::json!({"path": "a.txt"})).await.unwrap();
        assert_eq!(all["content"], "one\ntwo\nthree\n");
        assert_eq!(all["total_lines"], 3);

        let window = tool
            .execute(&ctx(), serde_json::json!({"path": "a.txt", "offset": 2, "limit": 1}))
            .await
            .unwrap();
        assert_eq!(window["content"], "two");
    }

    #[tokio::test]
    async fn read_truncates_to_context_limit() {
        let (dir, policy) = setup();
        fs::write(dir.path().join("big.txt"), "x".repeat(100)).unwrap();
        let small = ToolContext {
            max_output_bytes: 10,
            ..ToolContext::default()
        };
        let out = ReadTool::new(policy)
            .execute(&small, serde_json::json!({"path": "big.txt"}))
            .await
            .unwrap();
        assert_eq!(out["content"].as_str().unwrap().len(), 10);
        assert_eq!(out["truncated"], true);
    }

    #[tokio::test]
    async fn read_denied_inside_deny_rule() {
        let (dir, policy) = setup();
        fs::create_dir(dir.path().join("secret")).unwrap();
        fs::write(dir.path().join("secret/key"), "k").unwrap();

        let err = ReadTool::new(policy)
            .execute(&ctx(), serde_json::json!({"path": "secret/key"}))
            .await
            .unwrap_err();
        assert!(err.is_denied());
        assert!(err.to_string().contains("denied"));
    }

    #[tokio::test]
    async fn read_missing_file_is_execution_error() {
        let (_dir, policy) = setup();
        let err = ReadTool::new(policy)
            .execute(&ctx(), serde_json::json!({"path": "nope.txt"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution { .. }));
        assert!(!err.to_string().contains("denied"));
    }

    #[tokio::test]
    async fn parameter_errors_are_not_denials() {
        let (_dir, policy) = setup();
        let tool = ReadTool::new(policy);

        let missing = tool.execute(&ctx(), serde_json::json!({})).await.unwrap_err();
        assert!(matches!(missing, ToolError::InvalidArguments { .. }));
        assert!(!missing.to_string().contains("denied"));

        let wrong_type = tool.execute(&ctx(), serde_json::json!({"path": 5})).await.unwrap_err();
        assert!(matches!(wrong_type, ToolError::InvalidArguments { .. }));

        let zero = tool
            .execute(&ctx(), serde_json::json!({"path": "a", "offset": 0}))
            .await
            .unwrap_err();
        assert!(matches!(zero, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn write_creates_parents() {
        let (dir, policy) = setup();
        let out = WriteTool::new(policy)
            .execute(&ctx(), serde_json::json!({"path": "src/new/mod.rs", "content": "fn x() {}"}))
            .await
            .unwrap();
        assert_eq!(out["bytes_written"], 9);
        assert_eq!(
            fs::read_to_string(dir.path().join("src/new/mod.rs")).unwrap(),
            "fn x() {}"
        );
    }

    #[tokio::test]
    async fn denied_write_has_no_side_effects() {
        let (dir, policy) = setup();
        let tool = WriteTool::new(policy);

        let err = tool
            .execute(&ctx(), serde_json::json!({"path": "secret/new/file", "content": "x"}))
            .await
            .unwrap_err();
        assert!(err.is_denied());
        assert!(!dir.path().join("secret").exists());

        let escape = tool
            .execute(&ctx(), serde_json::json!({"path": "../escaped.txt", "content": "x"}))
            .await
            .unwrap_err();
        assert!(escape.is_denied());
        assert!(!dir.path().parent().unwrap().join("escaped.txt").exists());
    }

    #[tokio::test]
    async fn edit_requires_unique_match() {
        let (dir, policy) = setup();
        let file = dir.path().join("lib.rs");
        fs::write(&file, "let a = 1;\nlet b = 1;\n").unwrap();
        let tool = EditTool::new(policy);

        let ambiguous = tool
            .execute(
                &ctx(),
                serde_json::json!({"path": "lib.rs", "old_string": "= 1", "new_string": "= 2"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(ambiguous, ToolError::Execution { .. }));
        assert_eq!(fs::read_to_string(&file).unwrap(), "let a = 1;\nlet b = 1;\n");

        let unique = tool
            .execute(
                &ctx(),
                serde_json::json!({"path": "lib.rs", "old_string": "let a = 1", "new_string": "let a = 3"}),
            )
            .await
            .unwrap();
        assert_eq!(unique["replacements"], 1);

        let all = tool
            .execute(
                &ctx(),
                serde_json::json!({"path": "lib.rs", "old_string": "let", "new_string": "const", "replace_all": true}),
            )
            .await
            .unwrap();
        assert_eq!(all["replacements"], 2);
        assert_eq!(fs::read_to_string(&file).unwrap(), "const a = 3;\nconst b = 1;\n");
    }

    #[tokio::test]
    async fn edit_validates_arguments_before_path_check() {
        let (_dir, policy) = setup();
        let err = EditTool::new(policy)
            .execute(
                &ctx(),
                serde_json::json!({"path": "secret/x", "old_string": "", "new_string": "y"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn list_sorts_entries() {
        let (dir, policy) = setup();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();

        let out = ListTool::new(policy).execute(&ctx(), serde_json::json!({})).await.unwrap();
        let entries: Vec<DirEntry> = serde_json::from_value(out["entries"].clone()).unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry {
                    name: "a".to_string(),
                    kind: EntryKind::Dir
                },
                DirEntry {
                    name: "b.txt".to_string(),
                    kind: EntryKind::File
                },
            ]
        );
    }
}
