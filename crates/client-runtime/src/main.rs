//! Media Client: interactive command line for the media platform.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use client_runtime::{
    load_config, spawn_terminal_reader, ClientRuntime, Console, ConsolePrompter, InputQueue,
    Terminal,
};
use mc_04_command_gateway::help_lines;
use mc_telemetry::{init_telemetry, TelemetryConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Media Client: browse, tag and transfer media from the command line
#[derive(Parser, Debug)]
#[command(name = "media-client")]
#[command(about = "Interactive client for the media platform")]
struct Args {
    /// TOML configuration file (defaults to $MC_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log more: -v for info, -vv for debug
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _telemetry = init_telemetry(TelemetryConfig::from_env().with_verbosity(args.verbose))
        .context("Failed to initialize logging")?;

    let config = load_config(args.config.as_deref(), |key| std::env::var(key).ok())
        .context("Failed to load configuration")?;

    let runtime = ClientRuntime::new(config)?;
    runtime.start()?;

    let terminal = Arc::new(Terminal::stdout());
    let (input, sender, requests) = InputQueue::new();
    spawn_terminal_reader(sender.clone(), requests).context("Failed to start terminal reader")?;
    runtime.spawn_interrupt_forwarder(sender);

    let prompter = Arc::new(ConsolePrompter::new(Arc::clone(&input), Arc::clone(&terminal)));
    let mut console = Console::new(runtime.gateway(prompter), input, Arc::clone(&terminal));
    runtime.spawn_prompt_refresher(
        console.gateway().interactive_lock(),
        console.label(),
        Arc::clone(&terminal),
    );

    terminal.print_line("Commands:");
    for usage in help_lines() {
        terminal.print_line(&format!("  {usage}"));
    }

    console.run();

    info!("Leaving");
    runtime.shutdown();
    Ok(())
}
