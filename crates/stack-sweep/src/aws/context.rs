//! Shared AWS configuration context
//!
//! Provides `AwsContext` for loading AWS SDK configuration once and
//! creating the CloudFormation, S3 and DynamoDB clients from the same config.

use crate::aws::retry::RetryPolicy;
use crate::config::AwsConfig;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;
use tracing::debug;

/// Shared AWS configuration context for creating service clients.
///
/// # Example
/// ```ignore
/// let aws = AwsContext::load(&config.aws).await;
///
/// let stacks = CloudFormationClient::from_context(&aws);
/// let buckets = S3Client::from_context(&aws);
/// let tables = DynamoDbClient::from_context(&aws);
/// ```
#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    retry: RetryPolicy,
}

impl AwsContext {
    /// Load AWS configuration from the environment, config files and the
    /// optional region/profile overrides.
    ///
    /// SDK retries are disabled: [`RetryPolicy`] wraps each call instead.
    pub async fn load(settings: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeout_config(settings));
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;

        debug!(
            region = ?config.region().map(|r| r.as_ref().to_string()),
            profile = ?settings.profile,
            max_attempts = settings.max_attempts,
            "Loaded AWS configuration"
        );

        Self {
            config: Arc::new(config),
            retry: RetryPolicy::with_max_attempts(settings.max_attempts),
        }
    }

    /// Get the underlying SDK config for direct client construction.
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// The resolved region, if any source provided one.
    pub fn region(&self) -> Option<&str> {
        self.config.region().map(|r| r.as_ref())
    }

    /// Retry policy shared by every client built from this context.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Create a CloudFormation client from this context.
    pub fn cloudformation_client(&self) -> aws_sdk_cloudformation::Client {
        aws_sdk_cloudformation::Client::new(self.sdk_config())
    }

    /// Create an S3 client from this context.
    pub fn s3_client(&self) -> aws_sdk_s3::Client {
        aws_sdk_s3::Client::new(self.sdk_config())
    }

    /// Create a DynamoDB client from this context.
    pub fn dynamodb_client(&self) -> aws_sdk_dynamodb::Client {
        aws_sdk_dynamodb::Client::new(self.sdk_config())
    }
}

/// Connect timeout always, operation timeout only when configured
fn timeout_config(settings: &AwsConfig) -> TimeoutConfig {
    let mut builder = TimeoutConfig::builder().connect_timeout(settings.connect_timeout);
    builder.set_operation_timeout(settings.operation_timeout);
    builder.build()
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
