//! Command-line interface

use crate::config::{
    AwsConfig, FailurePolicy, FilterConfig, OutputFormat, RuntimeFlags, SweepConfig,
};
use clap::{ArgAction, Parser};
use stack_sweep_common::RunMode;
use stack_sweep_common::defaults::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "stack-sweep")]
#[command(about = "Empty the S3 buckets and DynamoDB tables of tagged CloudFormation stacks")]
#[command(version)]
pub struct Args {
    /// Tags a stack must all carry (key:value)
    #[arg(long, num_args = 1.., required = true)]
    pub tags: Vec<String>,

    /// Tags that protect a bucket or table; any one is enough (key:value)
    #[arg(long, num_args = 1..)]
    pub tags_exclude: Vec<String>,

    /// Report what would be cleared without deleting anything
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_bool,
    )]
    pub dry_run: bool,

    /// AWS region (defaults to the SDK's region resolution)
    #[arg(long)]
    pub region: Option<String>,

    /// AWS profile to use
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Record failures and keep sweeping instead of stopping at the first one
    #[arg(long)]
    pub continue_on_error: bool,

    /// Also delete object versions and delete markers from versioned buckets
    #[arg(long)]
    pub include_versions: bool,

    /// Total attempts per AWS call when throttled or disconnected
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Timeout for a single AWS operation, in seconds
    #[arg(long)]
    pub operation_timeout: Option<u64>,

    /// Format of the final summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Lenient boolean: yes/true/t/y/1 and no/false/f/n/0, any case
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        _ => Err(format!("boolean value expected, got '{value}'")),
    }
}

impl From<Args> for SweepConfig {
    fn from(args: Args) -> Self {
        Self {
            filters: FilterConfig {
                include: args.tags,
                exclude: args.tags_exclude,
            },
            aws: AwsConfig {
                region: args.region,
                profile: args.profile,
                max_attempts: args.max_attempts,
                operation_timeout: args.operation_timeout.map(Duration::from_secs),
                connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            },
            flags: RuntimeFlags {
                mode: RunMode::from_dry_run(args.dry_run),
                failure_policy: if args.continue_on_error {
                    FailurePolicy::Continue
                } else {
                    FailurePolicy::FailFast
                },
                include_versions: args.include_versions,
                format: args.format,
            },
        }
    }
}
