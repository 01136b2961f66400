//! simsearch CLI and REST API entry point.
//!
//! Parses CLI arguments, loads configuration, wires services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use simsearch_observe::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "simsearch", &mut std::io::stdout());
        return Ok(());
    }

    let mut tracing_options = TracingOptions::for_verbosity(cli.verbose, cli.quiet);
    if let Commands::Serve { log_json: true, .. } = &cli.command {
        tracing_options.format = LogFormat::Json;
    }
    init_tracing(&tracing_options).map_err(|e| anyhow::anyhow!("failed to set up logging: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Serve { port, host, .. } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            tracing::info!(%addr, project = %state.target.project, dataset = %state.target.dataset, "server listening");
            if !cli.quiet {
                println!(
                    "  {} simsearch API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let shutdown = state.shutdown.clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown_signal().await;
                    // Background preparation runs stop at their next poll
                    shutdown.cancel();
                })
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Prep { file, years } => {
            cli::prep::prepare(&state, &file, &years, cli.json, cli.quiet).await?;
        }

        Commands::Names { file, years } => {
            cli::prep::names(&state, &file, &years, cli.json)?;
        }

        Commands::Search {
            table,
            plot,
            matches,
        } => {
            cli::search::search(&state, &table, plot, matches, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled in main"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
