//! Configuration types for a sweep

use crate::clear::ClearSettings;
use crate::error::ConfigError;
use stack_sweep_common::{ExclusionFilter, InclusionFilter, RunMode, TagSet};
use std::time::Duration;

/// Tag tokens selecting stacks and protecting resources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    /// `key:value` tokens a stack must all carry
    pub include: Vec<String>,
    /// `key:value` tokens any one of which protects a resource
    pub exclude: Vec<String>,
}

impl FilterConfig {
    pub fn inclusion(&self) -> InclusionFilter {
        InclusionFilter::new(TagSet::from_tokens(self.include.iter().cloned()))
    }

    pub fn exclusion(&self) -> ExclusionFilter {
        ExclusionFilter::new(TagSet::from_tokens(self.exclude.iter().cloned()))
    }
}

/// AWS connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    /// AWS region (falls back to the SDK's default resolution)
    pub region: Option<String>,
    /// AWS profile name (overrides default credential resolution)
    pub profile: Option<String>,
    /// Total attempts per provider call
    pub max_attempts: u32,
    /// Per-operation timeout, including retries inside one attempt
    pub operation_timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

/// What to do when one resource or stack fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the sweep on the first error
    #[default]
    FailFast,
    /// Record the failure and carry on with the next resource
    Continue,
}

/// Format of the final summary on stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// Narration while sweeping, then a summary table
    #[default]
    Text,
    /// Only the JSON report on stdout; progress goes to the log
    Json,
}

/// Runtime behavior flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFlags {
    pub mode: RunMode,
    pub failure_policy: FailurePolicy,
    /// Also delete object versions and delete markers
    pub include_versions: bool,
    pub format: OutputFormat,
}

/// Configuration for a sweep
///
/// Composed of focused sub-configs, built from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    pub filters: FilterConfig,
    pub aws: AwsConfig,
    pub flags: RuntimeFlags,
}

impl SweepConfig {
    /// Reject configurations that must fail before any provider call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filters.include.is_empty() {
            return Err(ConfigError::NoInclusionTags);
        }
        if let Some(token) = self
            .filters
            .include
            .iter()
            .chain(&self.filters.exclude)
            .find(|t| !t.contains(':'))
        {
            return Err(ConfigError::MalformedTagToken(token.clone()));
        }
        if self.aws.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        Ok(())
    }

    pub fn mode(&self) -> RunMode {
        self.flags.mode
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.flags.failure_policy
    }

    pub fn clear_settings(&self) -> ClearSettings {
        ClearSettings {
            include_versions: self.flags.include_versions,
            ..ClearSettings::default()
        }
    }
}
