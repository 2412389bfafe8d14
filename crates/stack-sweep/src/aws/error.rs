//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// AWS error categories for retry and tag-lookup logic
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Bucket exists but has no tag set (S3 reports this as an error)
    #[error("No tag set")]
    NoTagSet,

    /// Rate limit exceeded (retryable with backoff)
    #[error("Rate limit exceeded: {message}")]
    Throttled { message: String },

    /// Service-side transient failure (retryable with backoff)
    #[error("Service unavailable: {message}")]
    Unavailable { message: String },

    /// Request never got a response: timeout or connection failure (retryable)
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// Credentials are missing, expired or lack permission
    #[error("Access denied: {message}")]
    AccessDenied { code: String, message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AwsError::Throttled { .. } | AwsError::Unavailable { .. } | AwsError::Transport { .. }
        )
    }

    /// The provider error code, when one was returned
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::AccessDenied { code, .. } => Some(code),
            AwsError::Sdk { code, .. } => code.as_deref(),
            AwsError::NoTagSet => Some("NoSuchTagSet"),
            _ => None,
        }
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        self.code().and_then(suggestion_for_code).or_else(|| match self {
            AwsError::Throttled { .. } => Some(THROTTLING_SUGGESTION.to_string()),
            AwsError::Transport { .. } => Some(
                "Check network connectivity, or raise --operation-timeout for slow links."
                    .to_string(),
            ),
            _ => None,
        })
    }
}

impl<E, R> From<SdkError<E, R>> for AwsError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    fn from(err: SdkError<E, R>) -> Self {
        match &err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => AwsError::Transport {
                message: DisplayErrorContext(&err).to_string(),
            },
            _ => {
                let message = err
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
                classify_aws_error(err.code(), Some(&message))
            }
        }
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchBucket",
    "NoSuchKey",
    "NotFound",
    "ResourceNotFoundException",
];

/// Known AWS error codes for a missing tag set
const NO_TAG_SET_CODES: &[&str] = &["NoSuchTagSet", "NoSuchTagSetError"];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "RequestThrottledException",
    "SlowDown",
    "ProvisionedThroughputExceededException",
    "TooManyRequestsException",
];

/// Known AWS error codes for transient service failures
const UNAVAILABLE_CODES: &[&str] = &[
    "InternalError",
    "InternalServerError",
    "ServiceUnavailable",
    "ServiceUnavailableException",
];

/// Known AWS error codes for credential/permission failures
const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "ExpiredToken",
    "ExpiredTokenException",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
];

const THROTTLING_SUGGESTION: &str =
    "AWS API rate limit hit. Raise --max-attempts to retry with backoff.";

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if NO_TAG_SET_CODES.contains(&c) => AwsError::NoTagSet,
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled { message },
        Some(c) if UNAVAILABLE_CODES.contains(&c) => AwsError::Unavailable { message },
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => AwsError::AccessDenied {
            code: c.to_string(),
            message,
        },
        // CloudFormation reports missing stacks as a validation error
        Some("ValidationError") if message.contains("does not exist") => {
            AwsError::NotFound { message }
        }
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Find the classified AWS error in an anyhow error chain, if any.
pub fn classify_anyhow_error(error: &anyhow::Error) -> Option<&AwsError> {
    error.chain().find_map(|cause| cause.downcast_ref::<AwsError>())
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "AccessDenied",
        "Check that the credentials allow cloudformation:Describe*, s3:GetBucketTagging, \
         s3:ListBucket, s3:DeleteObject, dynamodb:DescribeTable, dynamodb:ListTagsOfResource, \
         dynamodb:Scan and dynamodb:BatchWriteItem.",
    ),
    (
        "AccessDeniedException",
        "Check that the credentials allow cloudformation:Describe*, s3:GetBucketTagging, \
         s3:ListBucket, s3:DeleteObject, dynamodb:DescribeTable, dynamodb:ListTagsOfResource, \
         dynamodb:Scan and dynamodb:BatchWriteItem.",
    ),
    (
        "ExpiredToken",
        "Your session credentials have expired. Refresh them (e.g. `aws sso login`).",
    ),
    (
        "ExpiredTokenException",
        "Your session credentials have expired. Refresh them (e.g. `aws sso login`).",
    ),
    (
        "InvalidClientTokenId",
        "The access key is not valid for this account. Check --profile / AWS_PROFILE.",
    ),
    (
        "UnrecognizedClientException",
        "The access key is not valid for this account. Check --profile / AWS_PROFILE.",
    ),
    ("Throttling", THROTTLING_SUGGESTION),
    ("ThrottlingException", THROTTLING_SUGGESTION),
    ("ProvisionedThroughputExceededException", THROTTLING_SUGGESTION),
    ("SlowDown", THROTTLING_SUGGESTION),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<String> {
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| (*s).to_string())
}
