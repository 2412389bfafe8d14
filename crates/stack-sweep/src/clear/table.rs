//! Emptying DynamoDB tables

use super::{ClearOutcome, ClearSettings};
use crate::aws::{ItemKey, RetryPolicy, TableOperations};
use crate::error::ProviderLogicError;
use crate::pagination::PageCursor;
use anyhow::Result;
use stack_sweep_common::defaults::DYNAMODB_BATCH_WRITE_LIMIT;
use stack_sweep_common::{ClearCandidate, RunMode};
use tracing::{debug, info, warn};

/// Deletes every item of a table by primary key.
pub struct TableClearer<'a, T> {
    tables: &'a T,
    unprocessed_retries: u32,
    backoff: RetryPolicy,
}

impl<'a, T: TableOperations> TableClearer<'a, T> {
    pub fn new(tables: &'a T, settings: &ClearSettings) -> Self {
        Self {
            tables,
            unprocessed_retries: settings.unprocessed_retries,
            backoff: settings.unprocessed_backoff.clone(),
        }
    }

    pub async fn clear(&self, table: &str, mode: RunMode) -> Result<ClearOutcome> {
        let info = self.tables.describe_table(table).await?;
        if info.key_attributes.is_empty() {
            return Err(ProviderLogicError::MissingKeySchema {
                table: table.to_string(),
            }
            .into());
        }
        let key_attributes = info.key_attributes;

        let tables = self.tables;
        let mut cursor = PageCursor::new();
        let mut total = 0u64;

        while let Some(keys) = cursor
            .next_page(|start| tables.scan_keys(table, &key_attributes, start))
            .await?
        {
            total += keys.len() as u64;
            if mode.is_dry_run() {
                continue;
            }
            for batch in keys.chunks(DYNAMODB_BATCH_WRITE_LIMIT) {
                self.delete_batch(table, batch.to_vec()).await?;
            }
        }

        info!(
            table = %table,
            items = total,
            scan_pages = cursor.pages(),
            mode = %mode,
            "Table cleared"
        );
        Ok(ClearOutcome::new(ClearCandidate::table(table), total, mode))
    }

    /// Delete one batch, resending whatever comes back unprocessed.
    async fn delete_batch(&self, table: &str, mut keys: Vec<ItemKey>) -> Result<()> {
        let mut delays = self.backoff.delays();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let unprocessed = self.tables.batch_delete(table, &keys).await?;
            if unprocessed.is_empty() {
                debug!(table = %table, attempts, "Deleted item batch");
                return Ok(());
            }

            if attempts > self.unprocessed_retries {
                return Err(ProviderLogicError::UnprocessedKeys {
                    table: table.to_string(),
                    count: unprocessed.len(),
                    attempts,
                }
                .into());
            }

            let delay = delays.next().unwrap_or(self.backoff.max_delay);
            warn!(
                table = %table,
                unprocessed = unprocessed.len(),
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "Batch delete left items unprocessed, resending"
            );
            tokio::time::sleep(delay).await;
            keys = unprocessed;
        }
    }
}
