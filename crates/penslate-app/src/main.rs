//! Main application entry point (native).

use clap::Parser;
use penslate_app::{AppError, CliArgs, RunSummary, ScriptRunner, script};
use penslate_core::{CanvasConfig, CanvasController, FileImageStorage};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting Penslate");

    let args = CliArgs::parse();
    match pollster::block_on(run(args)) {
        Ok(summary) if summary.failures == 0 => {
            log::info!(
                "Finished: {} commands, {} events, {} strokes",
                summary.commands,
                summary.events,
                summary.strokes
            );
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            log::error!("{} of {} commands failed", summary.failures, summary.commands);
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<RunSummary, AppError> {
    let config = match &args.config {
        Some(path) => CanvasConfig::load(path)?,
        None => CanvasConfig::default(),
    };
    let commands = script::load(&args.script)?;

    let storage = FileImageStorage::new(args.images_dir())?;
    log::debug!("Resolving images against {}", storage.base_path().display());

    let mut runner = ScriptRunner::new(CanvasController::new(config)?, storage);
    Ok(runner.run(&commands).await)
}
