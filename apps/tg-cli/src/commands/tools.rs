// tools.rs: Print the definitions a planner would be shown.

use std::path::Path;
use std::process::ExitCode;

use tg_policy::PolicyHandle;
use tg_tools::ToolRegistry;

pub fn execute(policy: &Path) -> anyhow::Result<ExitCode> {
    let engine = super::load(policy)?;
    let registry = ToolRegistry::with_builtin_tools(PolicyHandle::new(engine));
    println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
    Ok(ExitCode::SUCCESS)
}
