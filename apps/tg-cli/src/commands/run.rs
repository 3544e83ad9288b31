// run.rs: Invoke one built-in tool through the registry.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use tg_policy::PolicyHandle;
use tg_tools::{ToolContext, ToolRegistry};

pub fn execute(policy: &Path, tool: &str, args: &str, timeout_secs: u64) -> anyhow::Result<ExitCode> {
    let args: serde_json::Value =
        serde_json::from_str(args).context("--args must be a JSON object")?;
    let engine = super::load(policy)?;
    let registry = ToolRegistry::with_builtin_tools(PolicyHandle::new(engine));
    let ctx = ToolContext::with_timeout(Duration::from_secs(timeout_secs));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    tracing::info!(tool, call_id = %ctx.call_id, "running tool");
    match runtime.block_on(registry.call(tool, &ctx, args)) {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_denied() => {
            eprintln!("{}", e);
            Ok(ExitCode::from(super::EXIT_DENIED))
        }
        Err(e) => Err(e.into()),
    }
}
