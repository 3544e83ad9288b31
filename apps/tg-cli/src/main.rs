//! # tg-cli
//!
//! Command-line front end for toolgate policies.
//!
//! - `toolgate validate`: load a policy file and summarize it
//! - `toolgate check path|domain|command <tool> <value>`: print one decision
//! - `toolgate tools`: print the definitions the policy exposes
//! - `toolgate run <tool> --args '<json>'`: invoke a built-in tool
//!
//! `check` and `run` exit with status 2 when the policy denies the request.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Policy-gated tools for autonomous agents.
#[derive(Parser)]
#[command(name = "toolgate", version, about)]
struct Cli {
    /// Policy file (.yaml, .yml, .toml or .json).
    #[arg(long, global = true, default_value = "toolgate.yaml")]
    policy: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the policy and report what it enables.
    Validate,
    /// Evaluate a single request against the policy.
    Check {
        #[command(subcommand)]
        command: commands::check::CheckCommands,
    },
    /// Print the tool definitions the policy exposes, as JSON.
    Tools,
    /// Invoke a built-in tool under the policy.
    Run {
        /// Tool name (read, write, edit, list, bash, web_fetch).
        tool: String,
        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Timeout for the call, in seconds.
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tg_policy=warn".parse()?)
                .add_directive("tg_tools=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Validate => commands::validate::execute(&cli.policy),
        Commands::Check { command } => commands::check::execute(command, &cli.policy),
        Commands::Tools => commands::tools::execute(&cli.policy),
        Commands::Run {
            tool,
            args,
            timeout,
        } => commands::run::execute(&cli.policy, tool, args, *timeout),
    }
}
