//! Emptying S3 buckets

use super::{ClearOutcome, ClearSettings};
use crate::aws::{BucketOperations, ObjectId};
use crate::error::ProviderLogicError;
use crate::pagination::{Page, PageCursor};
use anyhow::Result;
use stack_sweep_common::defaults::S3_DELETE_BATCH_LIMIT;
use stack_sweep_common::{ClearCandidate, RunMode};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use tracing::{debug, info};

/// Deletes every object of a bucket, page by page.
pub struct BucketClearer<'a, B> {
    buckets: &'a B,
    include_versions: bool,
}

impl<'a, B: BucketOperations> BucketClearer<'a, B> {
    pub fn new(buckets: &'a B, settings: &ClearSettings) -> Self {
        Self {
            buckets,
            include_versions: settings.include_versions,
        }
    }

    pub async fn clear(&self, bucket: &str, mode: RunMode) -> Result<ClearOutcome> {
        let buckets = self.buckets;
        let items = if self.include_versions {
            self.drain(bucket, mode, |marker| {
                buckets.list_object_versions(bucket, marker)
            })
            .await?
        } else {
            self.drain(bucket, mode, |token| buckets.list_objects(bucket, token))
                .await?
        };

        info!(
            bucket = %bucket,
            objects = items,
            versions = self.include_versions,
            mode = %mode,
            "Bucket cleared"
        );
        Ok(ClearOutcome::new(ClearCandidate::bucket(bucket), items, mode))
    }

    /// Walk a listing and delete each page as it arrives.
    async fn drain<C, F, Fut>(&self, bucket: &str, mode: RunMode, mut list: F) -> Result<u64>
    where
        C: Clone + Eq + Hash + Debug,
        F: FnMut(Option<C>) -> Fut,
        Fut: Future<Output = Result<Page<ObjectId, C>>>,
    {
        let mut cursor = PageCursor::new();
        let mut total = 0u64;

        while let Some(ids) = cursor.next_page(&mut list).await? {
            total += ids.len() as u64;
            if mode.is_dry_run() || ids.is_empty() {
                continue;
            }

            for batch in ids.chunks(S3_DELETE_BATCH_LIMIT) {
                let failures = self.buckets.delete_objects(bucket, batch).await?;
                if let Some(first) = failures.first() {
                    return Err(ProviderLogicError::ObjectsNotDeleted {
                        bucket: bucket.to_string(),
                        count: failures.len(),
                        first: first.to_string(),
                    }
                    .into());
                }
                debug!(bucket = %bucket, batch = batch.len(), "Deleted objects");
            }
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::DeleteFailure;
    use crate::aws::VersionMarker;
    use crate::aws::s3::MockBucketOperations;
    use mockall::predicate::eq;

    fn objects(prefix: &str, n: usize) -> Vec<ObjectId> {
        (0..n).map(|i| ObjectId::new(format!("{prefix}{i}"))).collect()
    }

    #[tokio::test]
    async fn test_dry_run_never_deletes() {
        for n in [0usize, 1, 1000] {
            let mut mock = MockBucketOperations::new();
            mock.expect_list_objects()
                .returning(move |_, _| Ok(Page::last(objects("k", n))));
            mock.expect_delete_objects().never();

            let clearer = BucketClearer::new(&mock, &ClearSettings::default());
            let outcome = clearer.clear("b1", RunMode::DryRun).await.unwrap();

            assert_eq!(outcome.items, n as u64);
            assert_eq!(outcome.mode, RunMode::DryRun);
            assert_eq!(outcome.candidate, ClearCandidate::bucket("b1"));
        }
    }

    #[tokio::test]
    async fn test_empty_bucket_issues_no_delete() {
        let mut mock = MockBucketOperations::new();
        mock.expect_list_objects()
            .returning(|_, _| Ok(Page::last(vec![])));
        mock.expect_delete_objects().never();

        let clearer = BucketClearer::new(&mock, &ClearSettings::default());
        let outcome = clearer.clear("empty", RunMode::Execute).await.unwrap();
        assert_eq!(outcome.items, 0);
    }

    #[tokio::test]
    async fn test_deletes_every_page() {
        let mut mock = MockBucketOperations::new();
        mock.expect_list_objects()
            .with(eq("b1"), eq(None::<String>))
            .returning(|_, _| Ok(Page::new(objects("a", 3), Some("next".into()))));
        mock.expect_list_objects()
            .with(eq("b1"), eq(Some("next".to_string())))
            .returning(|_, _| Ok(Page::last(objects("b", 2))));
        mock.expect_delete_objects()
            .withf(|bucket, ids| bucket == "b1" && ids == objects("a", 3).as_slice())
            .times(1)
            .returning(|_, _| Ok(vec![]));
        mock.expect_delete_objects()
            .withf(|bucket, ids| bucket == "b1" && ids == objects("b", 2).as_slice())
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let clearer = BucketClearer::new(&mock, &ClearSettings::default());
        let outcome = clearer.clear("b1", RunMode::Execute).await.unwrap();
        assert_eq!(outcome.items, 5);
    }

    #[tokio::test]
    async fn test_delete_batches_are_capped() {
        let mut mock = MockBucketOperations::new();
        mock.expect_list_objects()
            .returning(|_, _| Ok(Page::last(objects("k", 2500))));
        mock.expect_delete_objects()
            .withf(|_, ids| ids.len() <= S3_DELETE_BATCH_LIMIT)
            .times(3)
            .returning(|_, _| Ok(vec![]));

        let clearer = BucketClearer::new(&mock, &ClearSettings::default());
        let outcome = clearer.clear("big", RunMode::Execute).await.unwrap();
        assert_eq!(outcome.items, 2500);
    }

    #[tokio::test]
    async fn test_per_key_failures_surface() {
        let mut mock = MockBucketOperations::new();
        mock.expect_list_objects()
            .returning(|_, _| Ok(Page::last(objects("k", 2))));
        mock.expect_delete_objects().returning(|_, _| {
            Ok(vec![DeleteFailure {
                key: "k1".into(),
                code: Some("AccessDenied".into()),
                message: None,
            }])
        });

        let clearer = BucketClearer::new(&mock, &ClearSettings::default());
        let err = clearer.clear("b1", RunMode::Execute).await.unwrap_err();

        match err.downcast_ref::<ProviderLogicError>() {
            Some(ProviderLogicError::ObjectsNotDeleted { count, first, .. }) => {
                assert_eq!(*count, 1);
                assert_eq!(first, "k1: AccessDenied");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_versions_listing_when_enabled() {
        let mut mock = MockBucketOperations::new();
        mock.expect_list_objects().never();
        mock.expect_list_object_versions()
            .with(eq("v"), eq(None::<VersionMarker>))
            .returning(|_, _| {
                Ok(Page::new(
                    vec![ObjectId::versioned("a", "1"), ObjectId::versioned("a", "2")],
                    Some(VersionMarker {
                        key_marker: "a".into(),
                        version_id_marker: Some("2".into()),
                    }),
                ))
            });
        mock.expect_list_object_versions()
            .with(
                eq("v"),
                eq(Some(VersionMarker {
                    key_marker: "a".into(),
                    version_id_marker: Some("2".into()),
                })),
            )
            .returning(|_, _| Ok(Page::last(vec![ObjectId::versioned("b", "9")])));
        mock.expect_delete_objects()
            .times(2)
            .returning(|_, _| Ok(vec![]));

        let settings = ClearSettings {
            include_versions: true,
            ..ClearSettings::default()
        };
        let clearer = BucketClearer::new(&mock, &settings);
        let outcome = clearer.clear("v", RunMode::Execute).await.unwrap();
        assert_eq!(outcome.items, 3);
    }
}
