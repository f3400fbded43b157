//! `wordspy` — realtime room and game-state server

use clap::Parser;

use wordspy::cli::args::Cli;
use wordspy::cli::commands;
use wordspy::error::ExitCode;
use wordspy::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_format = match &cli.command {
        wordspy::cli::args::Commands::Serve(args) => args.log_format.into(),
        _ => wordspy::observability::LogFormat::Human,
    };
    if !cli.quiet {
        init_logging(log_format, cli.verbose, cli.color);
    }

    // Spawn signal handler for graceful shutdown
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }

        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
            _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
        }
    });

    let result = commands::dispatch(cli).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
