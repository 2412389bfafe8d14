//! AWS client modules
//!
//! This module provides wrappers around AWS SDK clients for:
//! - CloudFormation: stack and stack-resource listing
//! - S3: bucket tags, object listing and batch deletion
//! - DynamoDB: table metadata, tags, key scans and batch deletes
//!
//! Each client implements an `*Operations` trait; the sweep logic depends on
//! the traits only.

pub mod cloudformation;
pub mod context;
pub mod dynamodb;
pub mod error;
pub mod retry;
pub mod s3;

pub use cloudformation::{CloudFormationClient, StackOperations};
pub use context::AwsContext;
pub use dynamodb::{DynamoDbClient, ItemKey, KeyValue, TableInfo, TableOperations};
pub use error::{AwsError, classify_anyhow_error, classify_aws_error};
pub use retry::RetryPolicy;
pub use s3::{BucketOperations, DeleteFailure, ObjectId, S3Client, VersionMarker};

/// Construct a service client from a pre-loaded [`AwsContext`].
pub trait FromAwsContext {
    fn from_context(ctx: &AwsContext) -> Self;
}

/// SDK accessors return a plain reference for required members and an
/// `Option` for optional ones. Normalizes both to `Option<&T>`.
pub(crate) trait SdkValue<'a, T: ?Sized> {
    fn optional(self) -> Option<&'a T>;
}

impl<'a, T: ?Sized> SdkValue<'a, T> for &'a T {
    fn optional(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> SdkValue<'a, T> for Option<&'a T> {
    fn optional(self) -> Option<&'a T> {
        self
    }
}
