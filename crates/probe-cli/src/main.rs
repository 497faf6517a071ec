mod cli;
mod commands;
mod config;
mod logging;
mod output;

use crate::cli::{Args, Command};
use crate::commands::CommandContext;
use crate::config::load_probe_config;
use crate::logging::init_tracing;
use crate::output::StylePolicy;
use clap::Parser;
use probe_core::providers::StaticDiscovery;
use system_utils::path::expand_tilde;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let log_dir = args
        .log_dir
        .as_deref()
        .map(|dir| expand_tilde(&dir.to_string_lossy()));
    let _log_guard = init_tracing(log_dir.as_deref(), args.log_level.as_deref())?;

    let config = load_probe_config(&expand_tilde(&args.config.to_string_lossy()))?;
    let ctx = CommandContext {
        discovery: StaticDiscovery::new(config.instances()?),
        queries: args.queries.clone(),
        style: StylePolicy::detect(args.no_color),
    };

    match &args.command {
        Command::Discover(discover) => commands::discover::run(&ctx, discover).await,
        Command::Trace(trace) => commands::trace::run(&ctx, trace).await,
        Command::Exec(exec) => commands::exec::run(&ctx, exec).await,
    }
}
