mod command;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use clap::{Args, Parser, Subcommand};
use rebound_core::ports::{LogSink, StdoutSink, TracingSink};
use rebound_core::{AsyncRetrier, ConfigError, PolicyError, RetryConfig, RetryOn};
use thiserror::Error;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::{FailureKind, RunReport, run_once};

#[derive(Parser)]
#[command(name = "rebound")]
#[command(about = "Run a command again, with exponential backoff, until it succeeds", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "rebound=info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command, retrying it on failure
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// TOML file with max_attempts, initial_delay_ms and backoff_multiplier
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Total attempts, the first run included
    #[arg(short = 'n', long)]
    attempts: Option<u32>,

    /// Delay before the first retry, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Factor applied to the delay after each failure
    #[arg(long)]
    multiplier: Option<f64>,

    /// Failure kinds that trigger a retry
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [FailureKind::Spawn, FailureKind::Exit])]
    retry_on: Vec<FailureKind>,

    /// Print a JSON report on stdout; retry messages go to the log instead
    #[arg(long)]
    json: bool,

    /// The command to run
    #[arg(required = true, num_args = 1.., last = true)]
    command: Vec<String>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("failed to render report: {0}")]
    Report(#[from] serde_json::Error),
}

impl RunArgs {
    fn retry_config(&self) -> Result<RetryConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => RetryConfig::load(path)?,
            None => RetryConfig::default(),
        };
        if let Some(attempts) = self.attempts {
            config.max_attempts = attempts;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.initial_delay_ms = delay_ms;
        }
        if let Some(multiplier) = self.multiplier {
            config.backoff_multiplier = multiplier;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Run(args) => match run(args).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %e, "rebound failed");
                eprintln!("rebound: {e}");
                ExitCode::from(2)
            }
        },
    }
}

async fn run(args: RunArgs) -> Result<ExitCode, CliError> {
    let config = args.retry_config()?;
    let policy = config.into_policy(RetryOn::only(args.retry_on.iter().copied()))?;
    tracing::debug!(?policy, "retry policy ready");

    // Ctrl-C stops waiting for the next attempt; a running command is left alone.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, no further attempts");
            let _ = cancel_tx.send(true);
        }
    });

    let sink: Arc<dyn LogSink> = if args.json {
        Arc::new(TracingSink)
    } else {
        Arc::new(StdoutSink)
    };

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let program = args.command.first().cloned().unwrap_or_default();
    let retrier = AsyncRetrier::new(program, policy, move |argv: &Vec<String>| {
        let counter = Arc::clone(&counter);
        let argv = argv.clone();
        async move {
            counter.fetch_add(1, Ordering::Relaxed);
            run_once(&argv).await
        }
    })
    .with_sink(sink)
    .with_cancellation(cancel_rx);

    let result = retrier.invoke(args.command.clone()).await;
    let report = RunReport::new(args.command, attempts.load(Ordering::Relaxed), &result);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if let Err(e) = &result {
        tracing::info!(attempts = report.attempts, error = %e, "command did not succeed");
    }

    Ok(ExitCode::from(u8::try_from(report.exit_code).unwrap_or(1)))
}
