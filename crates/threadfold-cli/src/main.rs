#![forbid(unsafe_code)]

mod cmd;
mod mastodon;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::io;
use std::path::PathBuf;
use threadfold_core::ErrorCode;
use threadfold_core::config::resolve_config;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "threadfold: an author's reply threads with untouched branches folded",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Instance base URL (overrides config and `THREADFOLD_INSTANCE`).
    #[arg(long, global = true, value_name = "URL")]
    instance: Option<String>,

    /// Read configuration from this file instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Serve statuses from a JSON array on disk instead of the network.
    #[arg(long, global = true, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Statuses requested per page.
    #[arg(long, global = true, value_name = "N")]
    page_limit: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Load an author's threads once and print them")]
    Show(cmd::show::ShowArgs),

    #[command(about = "Page through an author's threads interactively")]
    Browse(cmd::browse::BrowseArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("THREADFOLD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "threadfold=debug,info"
        } else {
            "threadfold=info,warn"
        })
    });

    let format = env::var("THREADFOLD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let config = match resolve_config(cli.config.as_deref(), cli.instance.as_deref(), cli.json) {
        Ok(config) => config,
        Err(err) => {
            let fallback = if cli.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            };
            render_error(
                &mut io::stderr().lock(),
                fallback,
                &CliError::with_code(format!("{err:#}"), ErrorCode::ConfigParseError),
            )?;
            std::process::exit(1);
        }
    };

    let session = cmd::Session {
        mode: OutputMode::from_resolved(&config.resolved_output),
        config,
        replay: cli.replay,
        page_limit: cli.page_limit,
    };

    let command_result = match cli.command {
        Commands::Show(ref args) => cmd::show::run_show(args, &session),
        Commands::Browse(ref args) => cmd::browse::run_browse(args, &session),
    };

    if let Err(err) = command_result {
        render_error(
            &mut io::stderr().lock(),
            session.mode,
            &CliError::from_anyhow(&err),
        )?;
        std::process::exit(1);
    }

    Ok(())
}
