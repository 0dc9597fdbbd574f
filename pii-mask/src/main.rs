// pii-mask/src/main.rs
//! pii-mask entry point.
//!
//! Loads `.env`, parses arguments, resolves the configuration and dispatches
//! to a subcommand. Validation failures exit with 2, everything else with 1.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io;
use std::process::ExitCode;

use pii_mask::cli::{Cli, Commands, MaskCommand};
use pii_mask::commands::{self, mask::MaskOptions};
use pii_mask::logger;
use pii_mask::ui;
use pii_mask::utils::{config::load_config, input::read_input};
use pii_mask_core::stats::spawn_logging_sink;
use pii_mask_core::{MaskingConfig, MaskingService, StatsPublisher};

/// Events buffered for the `--stats` sink before new ones are dropped.
const STATS_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logger::init_logger(logger::level_from_flags(cli.debug, cli.quiet));
    info!("pii-mask started. Version: {}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error_msg(format!("{:#}", err));
            ExitCode::from(commands::exit_code_for(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Mask(args) => run_mask(config, args).await,
        Commands::Patterns(args) => {
            let stdout = io::stdout();
            commands::patterns::run_patterns(&config, args.json, &mut stdout.lock())
        }
    }
}

async fn run_mask(config: MaskingConfig, args: MaskCommand) -> Result<()> {
    let input = read_input(args.text.as_deref(), args.input_file.as_deref())?;

    let mut builder = MaskingService::builder(config);
    let sink = if args.stats {
        let (publisher, rx) = StatsPublisher::channel(STATS_CHANNEL_CAPACITY);
        builder = builder.stats(publisher);
        Some(spawn_logging_sink(rx))
    } else {
        None
    };
    let service = builder.build().context("Failed to start the masking service")?;

    let opts = MaskOptions {
        input,
        json: args.json,
        lines: args.lines,
    };
    let outcome = {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        commands::mask::run_mask(&service, &opts, &mut writer).await
    };

    service.shutdown();
    // Dropping the service closes the stats channel so the sink can finish.
    drop(service);
    if let Some(sink) = sink {
        let recorded = sink.await.context("Stats sink task failed")?;
        ui::info_msg(format!("{} stats event(s) recorded.", recorded));
    }
    outcome
}
