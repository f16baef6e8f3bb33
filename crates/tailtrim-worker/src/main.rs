//! Tail trimmer binary.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use tailtrim_media::{check_ffmpeg, check_ffprobe, discover_inputs, ensure_dir_writable};
use tailtrim_worker::{
    init_tracing, is_fatal_error, process_file, render_table, write_json_report, BatchExecutor,
    BatchReport, Cli, ProcessingContext, TrimmerConfig, WorkerError,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("tailtrim: {:#}", e);
            if is_fatal_error(&e) {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let log_path = init_tracing(cli.log_level, cli.log_file.as_deref()).await?;
    if let Some(path) = &log_path {
        info!("Logging to {}", path.display());
    }

    let mut config = TrimmerConfig::from_cli(&cli)?;
    info!("Trimmer config: {:?}", config);

    let ffmpeg = check_ffmpeg().map_err(WorkerError::from)?;
    let ffprobe = check_ffprobe().map_err(WorkerError::from)?;
    info!("Using {} and {}", ffmpeg.display(), ffprobe.display());

    if config.trim_enabled {
        config.output_dir = ensure_dir_writable(&config.output_dir, true)
            .await
            .map_err(WorkerError::from)
            .context("output directory is not usable")?;
    }

    let discovery = discover_inputs(
        &config.input.path,
        config.input.recursive,
        &config.input.extensions,
    )
    .map_err(WorkerError::from)?;
    for (path, reason) in &discovery.skipped {
        warn!("Skipped {}: {}", path.display(), reason);
    }
    if discovery.files.is_empty() {
        return Err(WorkerError::no_inputs(format!(
            "no .{} files in {}",
            config.input.extensions.join("/."),
            config.input.path.display()
        ))
        .into());
    }

    let executor = BatchExecutor::new(config.max_concurrent_files);
    let ctrl_c = executor.listen_for_ctrl_c();

    let ctx = Arc::new(ProcessingContext::new(config));
    let task_ctx = Arc::clone(&ctx);
    let reports = executor
        .run(discovery.files, move |path| {
            process_file(Arc::clone(&task_ctx), path)
        })
        .await;
    ctrl_c.abort();

    println!("{}", render_table(&reports));

    if let Some(path) = &ctx.config.report_json {
        write_json_report(path, &BatchReport::new(&reports, ctx.config.trim_enabled))
            .await
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!("Wrote report to {}", path.display());
    }

    Ok(())
}
