// AzLearn - Azure service client walkthroughs
// Copyright (c) 2025 AzLearn Contributors
// Licensed under the MIT License

use azlearn::cli::{Cli, Commands};
use azlearn::config::{AzLearnConfig, LoggingConfig};
use azlearn::logging::init_logging;
use clap::Parser;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    // This is optional - if .env doesn't exist, it's silently ignored
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging settings come from the file when it loads; commands report
    // configuration problems themselves once logging is up
    let file_config: Option<AzLearnConfig> = cli
        .loader()
        .and_then(|loader| loader.load())
        .ok()
        .map(|layered| layered.into_config());
    let (log_level, logging_config) = match file_config {
        Some(config) => (config.application.log_level, config.logging),
        None => ("info".to_string(), LoggingConfig::default()),
    };
    let log_level = cli.log_level.clone().unwrap_or(log_level);

    let logging_guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "AzLearn - Azure service client walkthroughs"
    );

    // Create shutdown signal channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    tokio::spawn(async move {
        wait_for_signal().await;
        println!("\n⚠️  Shutdown signal received, finishing the current call...");
        let _ = shutdown_tx.send(true);
    });

    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5 // Fatal error exit code
        }
    };

    // The guard must flush before process::exit skips destructors
    drop(logging_guard);
    process::exit(exit_code);
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                    }
                }
                return;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to create SIGTERM handler, listening for Ctrl+C only"
                );
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown..."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            // Never resolve so a broken handler does not cancel the command
            std::future::pending::<()>().await;
        }
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    if let Commands::Init(args) = &cli.command {
        return args.execute().await;
    }

    let loader = match cli.loader() {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Invalid --set override: {e}");
            return Ok(2); // Configuration error exit code
        }
    };

    match &cli.command {
        Commands::Documents(args) => args.execute(&loader, shutdown_signal).await,
        Commands::Blobs(args) => args.execute(&loader, shutdown_signal).await,
        Commands::Secrets(args) => args.execute(&loader, shutdown_signal).await,
        Commands::Schedule(args) => args.execute(&loader, shutdown_signal).await,
        Commands::ValidateConfig(args) => args.execute(&loader).await,
        Commands::Init(args) => args.execute().await,
    }
}
