//! CloudFormation stack listing

use crate::aws::context::AwsContext;
use crate::aws::retry::RetryPolicy;
use crate::aws::{FromAwsContext, SdkValue};
use crate::discovery::StackDescriptor;
use crate::pagination::Page;
use anyhow::{Context, Result};
use aws_sdk_cloudformation::Client;
use stack_sweep_common::{ResourceDescriptor, ResourceKind, TagSet};
use tracing::debug;

/// Stack operations consumed by discovery and resolution.
///
/// Note: tokens are passed as `Option<String>` rather than `Option<&str>` to
/// work around mockall lifetime limitations.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait StackOperations: Send + Sync {
    /// One page of the account's stacks, with each stack's tags
    async fn describe_stacks(&self, next_token: Option<String>) -> Result<Page<StackDescriptor>>;

    /// Every resource of one stack (single call, no pagination)
    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<ResourceDescriptor>>;
}

/// CloudFormation client for stack discovery
pub struct CloudFormationClient {
    client: Client,
    retry: RetryPolicy,
}

impl FromAwsContext for CloudFormationClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.cloudformation_client(),
            retry: ctx.retry_policy().clone(),
        }
    }
}

impl StackOperations for CloudFormationClient {
    async fn describe_stacks(&self, next_token: Option<String>) -> Result<Page<StackDescriptor>> {
        let response = self
            .retry
            .run("DescribeStacks", || {
                self.client
                    .describe_stacks()
                    .set_next_token(next_token.clone())
                    .send()
            })
            .await
            .context("Failed to describe stacks")?;

        let stacks: Vec<StackDescriptor> = response
            .stacks()
            .iter()
            .filter_map(|stack| {
                let name = stack.stack_name().optional()?;
                let tags = TagSet::from_pairs(stack.tags().iter().filter_map(|t| {
                    Some((t.key().optional()?, t.value().optional()?))
                }));
                Some(StackDescriptor::new(name, tags))
            })
            .collect();

        debug!(
            count = stacks.len(),
            has_next = response.next_token().is_some(),
            "Described stack page"
        );

        Ok(Page::new(stacks, response.next_token().map(str::to_string)))
    }

    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<ResourceDescriptor>> {
        let response = self
            .retry
            .run("DescribeStackResources", || {
                self.client
                    .describe_stack_resources()
                    .stack_name(stack_name)
                    .send()
            })
            .await
            .with_context(|| format!("Failed to describe resources of stack '{stack_name}'"))?;

        // Resources still being created have no physical id yet
        let resources = response
            .stack_resources()
            .iter()
            .filter_map(|resource| {
                let physical_id = resource.physical_resource_id()?;
                Some(ResourceDescriptor {
                    kind: ResourceKind::from_provider_type(
                        resource.resource_type().optional().unwrap_or_default(),
                    ),
                    physical_id: physical_id.to_string(),
                    logical_id: resource
                        .logical_resource_id()
                        .optional()
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect();

        Ok(resources)
    }
}
