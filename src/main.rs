//! mailsweep - Entry point for the command-line cleaner

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use mailsweep::cli::Cli;
use mailsweep::services::DecisionGate;
use mailsweep::{load_accounts, AccountService, AutoApprove, ImapConnector, PromptGate, RunOptions};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let accounts = load_accounts(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if accounts.is_empty() {
        tracing::warn!(config = %cli.config.display(), "no usable accounts configured");
        return Ok(ExitCode::SUCCESS);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;

    let options = RunOptions {
        chunk_size: cli.chunk_size,
        skip_days: cli.skip_days,
        ..RunOptions::default()
    };

    let (summaries, totals) = runtime.block_on(async {
        let service = AccountService::new(ImapConnector, options);
        let mut gate: Box<dyn DecisionGate> = if cli.force {
            Box::new(AutoApprove)
        } else {
            Box::new(PromptGate::stdio())
        };
        service.run_all(&accounts, gate.as_mut()).await
    });

    for summary in &summaries {
        println!("{}", summary);
    }
    println!("{}", totals);

    if totals.aborted > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
