// validate.rs: Load a policy file and print a summary of it.

use std::path::Path;
use std::process::ExitCode;

pub fn execute(policy: &Path) -> anyhow::Result<ExitCode> {
    let engine = super::load(policy)?;
    let store = engine.store();

    println!("Policy OK: {}", policy.display());
    println!("  workspace:       {}", store.workspace().display());
    println!("  default_deny:    {}", store.default_deny());
    println!("  path_resolution: {:?}", store.path_resolution());

    let names: Vec<&str> = store.tool_names().collect();
    if names.is_empty() {
        println!("  tools:           (none; every tool is denied)");
        return Ok(ExitCode::SUCCESS);
    }
    println!("  tools:");
    for name in names {
        let Some(rules) = store.tool(name) else {
            continue;
        };
        let state = if rules.enabled { "enabled" } else { "disabled" };
        println!(
            "    {:<12} {:<8} allow={} deny={} allowlist={} denylist={} allow_domains={}",
            name,
            state,
            rules.allow.len(),
            rules.deny.len(),
            rules.allowlist.len(),
            rules.denylist.len(),
            rules.allow_domains.len(),
        );
    }
    Ok(ExitCode::SUCCESS)
}
