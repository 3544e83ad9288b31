// bash.rs: Shell command tool.
//
// The whole command string is checked against the policy's denylist and
// allowlist before anything is spawned. The command runs under `sh -c`
// with the workspace as its working directory, no inherited stdin, and
// is killed when the context timeout expires.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tg_policy::{PolicyHandle, ResourceKind};
use tokio::process::Command;

use crate::error::ToolError;
use crate::tool::{authorize_tool, parse_args, schema_for, truncate_utf8, Tool, ToolContext};

/// Hard ceiling on a caller-supplied timeout.
const MAX_TIMEOUT_SECS: u64 = 1800;

/// Parameters for `bash`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BashParams {
    /// The command line to run with `sh -c`.
    pub command: String,
    /// Timeout in seconds. Defaults to the call context's timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Output of a finished command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BashOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub truncated: bool,
}

/// Runs an allowlisted shell command inside the workspace.
#[derive(Debug, Clone)]
pub struct BashTool {
    policy: PolicyHandle,
    shell: String,
}

impl BashTool {
    pub const NAME: &'static str = "bash";

    pub fn new(policy: PolicyHandle) -> Self {
        Self {
            policy,
            shell: "sh".to_string(),
        }
    }

    /// Use a different POSIX shell binary (it must accept `-c`).
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Run a shell command in the workspace. Returns stdout, stderr, and the exit code."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_for::<BashParams>()
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let engine = self.policy.current();
        authorize_tool(&engine, Self::NAME)?;
        let params: BashParams = parse_args(Self::NAME, args)?;
        if params.command.trim().is_empty() {
            return Err(ToolError::invalid_arguments(Self::NAME, "command must not be empty"));
        }
        if params.timeout_secs == Some(0) {
            return Err(ToolError::invalid_arguments(Self::NAME, "timeout_secs must be positive"));
        }

        let decision = engine.check_command(Self::NAME, &params.command);
        if !decision.allowed {
            return Err(ToolError::denied(Self::NAME, ResourceKind::Command, &decision));
        }

        let timeout = params
            .timeout_secs
            .map(|s| Duration::from_secs(s.min(MAX_TIMEOUT_SECS)))
            .unwrap_or(ctx.timeout);

        tracing::debug!(
            call_id = %ctx.call_id,
            command = %params.command,
            timeout_secs = timeout.as_secs(),
            "bash"
        );
        let output = run(
            &self.shell,
            &params.command,
            engine.workspace(),
            timeout,
            ctx.max_output_bytes,
        )
        .await?;
        serde_json::to_value(&output).map_err(|e| ToolError::execution(Self::NAME, e.to_string()))
    }
}

async fn run(
    shell: &str,
    command: &str,
    workdir: &Path,
    timeout: Duration,
    max_output_bytes: usize,
) -> Result<BashOutput, ToolError> {
    let mut cmd = Command::new(shell);
    cmd.arg("-c").arg(command);
    if !workdir.as_os_str().is_empty() {
        cmd.current_dir(workdir);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| ToolError::io(BashTool::NAME, "spawning shell", &e))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ToolError::io(BashTool::NAME, "waiting for command", &e)),
        Err(_) => {
            tracing::warn!(command, "bash timeout");
            return Err(ToolError::execution(
                BashTool::NAME,
                format!("command timed out after {}s", timeout.as_secs_f32()),
            ));
        }
    };

    let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let truncated_out = truncate_utf8(&mut stdout, max_output_bytes);
    let truncated_err = truncate_utf8(&mut stderr, max_output_bytes);

    Ok(BashOutput {
        stdout,
        stderr,
        exit_code: output.status.code().unwrap_or(-1),
        truncated: truncated_out || truncated_err,
    })
}
