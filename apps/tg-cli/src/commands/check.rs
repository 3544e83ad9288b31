// check.rs: Evaluate one request against the policy without running anything.

use std::path::Path;
use std::process::ExitCode;

use clap::Subcommand;
use tg_policy::Decision;

#[derive(Subcommand)]
pub enum CheckCommands {
    /// May <tool> touch this path?
    Path {
        tool: String,
        /// Absolute, or relative to the policy workspace.
        path: String,
    },
    /// May <tool> contact this domain?
    Domain { tool: String, domain: String },
    /// May <tool> run this command line?
    Command { tool: String, command: String },
}

pub fn execute(cmd: &CheckCommands, policy: &Path) -> anyhow::Result<ExitCode> {
    let engine = super::load(policy)?;

    let decision = match cmd {
        CheckCommands::Path { tool, path } => engine.check_path(tool, path),
        CheckCommands::Domain { tool, domain } => engine.check_domain(tool, domain),
        CheckCommands::Command { tool, command } => engine.check_command(tool, command),
    };

    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(exit_code(&decision))
}

fn exit_code(decision: &Decision) -> ExitCode {
    if decision.allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(super::EXIT_DENIED)
    }
}
