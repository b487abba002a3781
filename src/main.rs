use std::io;
use anyhow::Context;
use clap::Parser;
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

use uci_client::dispatcher::QueryDispatcher;
use uci_client::input::command_line::Cli;
use uci_client::query::QueryOutcome;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // Bad input never reaches the engine
    let query = cli.query.to_query()?;
    let config = cli.engine_config()?;

    let dispatcher = QueryDispatcher::start(&config)
        .with_context(|| format!("failed to start engine {}", config.program.display()))?;

    let tokio_runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("failed to create tokio runtime")?;

    let outcome = tokio_runtime.block_on(dispatcher.submit(query));
    let shutdown = dispatcher.shutdown();

    let outcome = outcome.context("engine query failed")?;
    match cli.json {
        true => println!("{}", serde_json::to_string_pretty(&outcome)?),
        false => println!("{}", render(&outcome)),
    }

    shutdown.context("engine did not shut down cleanly")?;
    Ok(())
}

fn render(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::BestMove(text) | QueryOutcome::Fen(text) | QueryOutcome::Checkers(text) => text.clone(),
        QueryOutcome::LegalMoves(moves) => moves.iter().sorted().join(" "),
    }
}
