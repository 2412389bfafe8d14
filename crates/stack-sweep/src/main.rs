//! stack-sweep CLI

use anyhow::{Result, bail};
use clap::Parser;
use stack_sweep::aws::{
    AwsContext, CloudFormationClient, DynamoDbClient, FromAwsContext, S3Client,
    classify_anyhow_error,
};
use stack_sweep::cli::Args;
use stack_sweep::config::{OutputFormat, SweepConfig};
use stack_sweep::orchestrator::{ConsoleReporter, LogReporter, SweepReporter, Sweeper};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "info,aws_config=warn,aws_sdk=warn,aws_smithy=warn";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(suggestion) = classify_anyhow_error(e).and_then(|aws| aws.suggestion()) {
        let _ = writeln!(stderr, "\n\x1b[36mHint:\x1b[0m {suggestion}");
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only narration or the JSON report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config: SweepConfig = args.into();
    config.validate()?;

    if let Some(profile) = &config.aws.profile {
        info!(profile = %profile, "Using AWS profile");
    }

    let aws = AwsContext::load(&config.aws).await;
    let stacks = CloudFormationClient::from_context(&aws);
    let buckets = S3Client::from_context(&aws);
    let tables = DynamoDbClient::from_context(&aws);

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current resource");
            cancel_clone.cancel();
        }
    });

    let format = config.flags.format;
    let reporter: Box<dyn SweepReporter> = match format {
        OutputFormat::Text => Box::new(ConsoleReporter::stdout()),
        OutputFormat::Json => Box::new(LogReporter::new()),
    };

    let report = Sweeper::new(&stacks, &buckets, &tables, reporter.as_ref(), cancel)
        .run(&config)
        .await?;

    match format {
        OutputFormat::Text => report.print_summary(),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if report.cancelled {
        bail!("Sweep was cancelled");
    }
    if report.failure_count() > 0 {
        bail!(
            "{} failure(s) recorded across {} stack(s)",
            report.failure_count(),
            report.stacks_matched()
        );
    }
    Ok(())
}
