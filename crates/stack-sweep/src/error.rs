//! Typed errors for provider logic and configuration
//!
//! Provider communication failures are classified in [`crate::aws::error`].
//! The errors here describe responses that were delivered but cannot be
//! acted upon, and configurations rejected before any provider call.

use thiserror::Error;

/// The provider answered, but the answer is unusable
#[derive(Debug, Error)]
pub enum ProviderLogicError {
    /// A listing handed back a continuation token it had already issued
    #[error("Provider repeated continuation token {token}; refusing to loop")]
    RepeatedContinuationToken { token: String },

    /// DescribeTable returned no key schema
    #[error("Table '{table}' has no primary key schema")]
    MissingKeySchema { table: String },

    /// DescribeTable returned no ARN
    #[error("Table '{table}' has no ARN")]
    MissingTableArn { table: String },

    /// A scanned item lacks a key attribute or uses a non-key type
    #[error("Item in table '{table}' has no usable value for key attribute '{attribute}'")]
    MalformedKey { table: String, attribute: String },

    /// BatchWriteItem kept returning unprocessed deletes
    #[error("{count} key(s) in table '{table}' were still unprocessed after {attempts} attempts")]
    UnprocessedKeys {
        table: String,
        count: usize,
        attempts: u32,
    },

    /// ListObjectVersions was truncated but gave no marker to resume from
    #[error("Version listing of bucket '{bucket}' is truncated but has no next key marker")]
    MissingVersionMarker { bucket: String },

    /// DeleteObjects reported per-key failures
    #[error("{count} object(s) in bucket '{bucket}' could not be deleted (first: {first})")]
    ObjectsNotDeleted {
        bucket: String,
        count: usize,
        first: String,
    },
}

/// Invalid command-line configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No inclusion tags: refusing to sweep every stack in the account
    #[error("at least one inclusion tag (--tags) is required")]
    NoInclusionTags,

    /// A token without `:` can never match a `key:value` tag
    #[error("tag token '{0}' is not of the form key:value")]
    MalformedTagToken(String),

    /// max_attempts must allow at least the initial call
    #[error("max_attempts must be at least 1")]
    InvalidMaxAttempts,
}
