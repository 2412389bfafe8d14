//! Provider limits and default configuration values
//!
//! These constants keep the clearers and the CLI in agreement.

/// Maximum keys per S3 `DeleteObjects` request
pub const S3_DELETE_BATCH_LIMIT: usize = 1000;

/// Maximum write requests per DynamoDB `BatchWriteItem` call
pub const DYNAMODB_BATCH_WRITE_LIMIT: usize = 25;

/// How many times unprocessed batch items are resent before giving up
pub const DEFAULT_UNPROCESSED_RETRIES: u32 = 5;

/// Default total attempts per provider call (1 = no retries)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default first backoff delay between attempts, in milliseconds
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 200;

/// Default cap on backoff delay, in milliseconds
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Default connect timeout for provider calls, in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
