//! S3 bucket tagging, listing and batch deletion

use crate::aws::context::AwsContext;
use crate::aws::error::AwsError;
use crate::aws::retry::RetryPolicy;
use crate::aws::{FromAwsContext, SdkValue};
use crate::error::ProviderLogicError;
use crate::pagination::Page;
use anyhow::{Context, Result};
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use stack_sweep_common::Tag;
use tracing::debug;

/// One object (or one object version) in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub key: String,
    /// Set when listing versions; `None` addresses the current object
    pub version_id: Option<String>,
}

impl ObjectId {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: None,
        }
    }

    pub fn versioned(key: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: Some(version_id.into()),
        }
    }
}

/// Continuation for `ListObjectVersions`, which pages on a key/version pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionMarker {
    pub key_marker: String,
    pub version_id_marker: Option<String>,
}

/// A key that `DeleteObjects` reported as not deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub code: Option<String>,
    pub message: Option<String>,
}

impl std::fmt::Display for DeleteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.key,
            self.code.as_deref().unwrap_or("UnknownError")
        )?;
        if let Some(message) = &self.message {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

/// Bucket operations consumed by the resolver and the bucket clearer.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait BucketOperations: Send + Sync {
    /// The bucket's own tags; empty when the bucket has no tag set
    async fn bucket_tags(&self, bucket: &str) -> Result<Vec<Tag>>;

    /// One page of current objects
    async fn list_objects(&self, bucket: &str, token: Option<String>) -> Result<Page<ObjectId>>;

    /// One page of object versions and delete markers
    async fn list_object_versions(
        &self,
        bucket: &str,
        marker: Option<VersionMarker>,
    ) -> Result<Page<ObjectId, VersionMarker>>;

    /// Delete up to 1000 objects; returns the keys the provider refused
    async fn delete_objects(&self, bucket: &str, ids: &[ObjectId]) -> Result<Vec<DeleteFailure>>;
}

/// S3 client for bucket clearing
pub struct S3Client {
    client: Client,
    retry: RetryPolicy,
}

impl FromAwsContext for S3Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.s3_client(),
            retry: ctx.retry_policy().clone(),
        }
    }
}

impl BucketOperations for S3Client {
    async fn bucket_tags(&self, bucket: &str) -> Result<Vec<Tag>> {
        let result = self
            .retry
            .run("GetBucketTagging", || {
                self.client.get_bucket_tagging().bucket(bucket).send()
            })
            .await
            .map(|response| {
                response
                    .tag_set()
                    .iter()
                    .filter_map(|t| Some(Tag::new(t.key().optional()?, t.value().optional()?)))
                    .collect()
            });

        tags_or_empty(bucket, result)
    }

    async fn list_objects(&self, bucket: &str, token: Option<String>) -> Result<Page<ObjectId>> {
        let response = self
            .retry
            .run("ListObjectsV2", || {
                self.client
                    .list_objects_v2()
                    .bucket(bucket)
                    .set_continuation_token(token.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to list objects in bucket '{bucket}'"))?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|object| object.key().optional().map(ObjectId::new))
            .collect();

        Ok(Page::new(
            objects,
            response.next_continuation_token().map(str::to_string),
        ))
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        marker: Option<VersionMarker>,
    ) -> Result<Page<ObjectId, VersionMarker>> {
        let (key_marker, version_id_marker) = match marker {
            Some(m) => (Some(m.key_marker), m.version_id_marker),
            None => (None, None),
        };

        let response = self
            .retry
            .run("ListObjectVersions", || {
                self.client
                    .list_object_versions()
                    .bucket(bucket)
                    .set_key_marker(key_marker.clone())
                    .set_version_id_marker(version_id_marker.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to list object versions in bucket '{bucket}'"))?;

        let versions = response.versions().iter().filter_map(|v| {
            Some(ObjectId::versioned(
                v.key().optional()?,
                v.version_id().optional()?,
            ))
        });
        let markers = response.delete_markers().iter().filter_map(|m| {
            Some(ObjectId::versioned(
                m.key().optional()?,
                m.version_id().optional()?,
            ))
        });
        let ids = versions.chain(markers).collect();

        let next = next_version_marker(
            bucket,
            response.is_truncated().unwrap_or(false),
            response.next_key_marker(),
            response.next_version_id_marker(),
        )?;

        Ok(Page::new(ids, next))
    }

    async fn delete_objects(&self, bucket: &str, ids: &[ObjectId]) -> Result<Vec<DeleteFailure>> {
        let identifiers = ids
            .iter()
            .map(|id| {
                ObjectIdentifier::builder()
                    .key(&id.key)
                    .set_version_id(id.version_id.clone())
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to build object identifiers")?;

        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()
            .context("Failed to build delete request")?;

        let response = self
            .retry
            .run("DeleteObjects", || {
                self.client
                    .delete_objects()
                    .bucket(bucket)
                    .delete(delete.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to delete objects in bucket '{bucket}'"))?;

        debug!(bucket = %bucket, requested = ids.len(), failed = response.errors().len(), "Deleted object batch");

        Ok(response
            .errors()
            .iter()
            .map(|e| DeleteFailure {
                key: e.key().optional().unwrap_or_default().to_string(),
                code: e.code().optional().map(str::to_string),
                message: e.message().optional().map(str::to_string),
            })
            .collect())
    }
}

/// An untagged bucket answers GetBucketTagging with `NoSuchTagSet`; that is
/// an empty tag list, not a failure.
fn tags_or_empty(bucket: &str, result: Result<Vec<Tag>, AwsError>) -> Result<Vec<Tag>> {
    match result {
        Ok(tags) => Ok(tags),
        Err(AwsError::NoTagSet) => {
            debug!(bucket = %bucket, "Bucket has no tag set");
            Ok(Vec::new())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to get tags of bucket '{bucket}'")),
    }
}

/// Where the next ListObjectVersions page starts, if there is one
fn next_version_marker(
    bucket: &str,
    truncated: bool,
    next_key_marker: Option<&str>,
    next_version_id_marker: Option<&str>,
) -> Result<Option<VersionMarker>, ProviderLogicError> {
    if !truncated {
        return Ok(None);
    }
    let Some(key) = next_key_marker else {
        return Err(ProviderLogicError::MissingVersionMarker {
            bucket: bucket.to_string(),
        });
    };
    Ok(Some(VersionMarker {
        key_marker: key.to_string(),
        version_id_marker: next_version_id_marker.map(str::to_string),
    }))
}
