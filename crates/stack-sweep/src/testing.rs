//! In-memory provider for sweep tests
//!
//! [`FakeCloud`] implements all three operation traits over a small mutable
//! model of stacks, buckets and tables, and records every call so tests can
//! assert on what was (and was not) sent.

use crate::aws::{
    BucketOperations, DeleteFailure, ItemKey, KeyValue, ObjectId, StackOperations, TableInfo,
    TableOperations, VersionMarker,
};
use crate::discovery::StackDescriptor;
use crate::orchestrator::{SweepEvent, SweepReporter};
use crate::pagination::Page;
use anyhow::{Result, bail};
use stack_sweep_common::{ResourceDescriptor, ResourceKind, Tag, TagSet};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

const PAGE_SIZE: usize = 2;

/// Provider calls that change data
const MUTATING_CALLS: &[&str] = &["DeleteObjects", "BatchWriteItem"];

#[derive(Default)]
struct FakeBucket {
    tags: Vec<Tag>,
    objects: BTreeSet<String>,
}

#[derive(Default)]
struct FakeTable {
    tags: Vec<Tag>,
    items: BTreeSet<String>,
}

#[derive(Default)]
struct State {
    stacks: Vec<(StackDescriptor, Vec<ResourceDescriptor>)>,
    buckets: BTreeMap<String, FakeBucket>,
    tables: BTreeMap<String, FakeTable>,
    broken: HashSet<String>,
    calls: Vec<String>,
}

/// Fake CloudFormation + S3 + DynamoDB.
///
/// Tables have a single string key attribute `id`. Listings page two
/// entries at a time, keyed on the last entry seen, so deleting while
/// paging behaves like the real services.
#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

fn tags(pairs: &[(&str, &str)]) -> Vec<Tag> {
    pairs.iter().map(|(k, v)| Tag::new(*k, *v)).collect()
}

fn item_key(id: &str) -> ItemKey {
    ItemKey::new().with("id", KeyValue::S(id.to_string()))
}

fn page_after<'a>(
    entries: impl Iterator<Item = &'a String>,
    after: Option<&str>,
) -> (Vec<String>, Option<String>) {
    let mut rest = entries.filter(|e| after.is_none_or(|a| e.as_str() > a));
    let page: Vec<String> = rest.by_ref().take(PAGE_SIZE).cloned().collect();
    let next = if rest.next().is_some() {
        page.last().cloned()
    } else {
        None
    };
    (page, next)
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack owning the named resources (`b:` bucket, `t:` table,
    /// anything else an unrelated resource)
    pub fn stack(self, name: &str, stack_tags: &[(&str, &str)], resources: &[&str]) -> Self {
        let descriptor = StackDescriptor::new(name, TagSet::from_tags(&tags(stack_tags)));
        let resources = resources
            .iter()
            .map(|r| {
                let (kind, id) = match r.split_once(':') {
                    Some(("b", id)) => (ResourceKind::Bucket, id),
                    Some(("t", id)) => (ResourceKind::Table, id),
                    _ => (ResourceKind::Other("AWS::SQS::Queue".into()), *r),
                };
                ResourceDescriptor {
                    kind,
                    physical_id: id.to_string(),
                    logical_id: format!("{id}Resource"),
                }
            })
            .collect();
        self.lock().stacks.push((descriptor, resources));
        self
    }

    pub fn bucket(self, name: &str, bucket_tags: &[(&str, &str)], objects: usize) -> Self {
        self.lock().buckets.insert(
            name.to_string(),
            FakeBucket {
                tags: tags(bucket_tags),
                objects: (0..objects).map(|i| format!("obj-{i:04}")).collect(),
            },
        );
        self
    }

    pub fn table(self, name: &str, table_tags: &[(&str, &str)], items: usize) -> Self {
        self.lock().tables.insert(
            name.to_string(),
            FakeTable {
                tags: tags(table_tags),
                items: (0..items).map(|i| format!("item-{i:04}")).collect(),
            },
        );
        self
    }

    /// Make every call touching `resource` fail
    pub fn broken(self, resource: &str) -> Self {
        self.lock().broken.insert(resource.to_string());
        self
    }

    pub fn objects_in(&self, bucket: &str) -> usize {
        self.lock().buckets.get(bucket).map_or(0, |b| b.objects.len())
    }

    pub fn items_in(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, |t| t.items.len())
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| MUTATING_CALLS.iter().any(|m| c.starts_with(m)))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Record a call and fail it if its resource is broken
    fn call(&self, operation: &str, resource: &str) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(format!("{operation}:{resource}"));
        if state.broken.contains(resource) {
            bail!("{operation} failed for '{resource}': Access Denied");
        }
        Ok(state)
    }
}

impl StackOperations for FakeCloud {
    async fn describe_stacks(&self, next_token: Option<String>) -> Result<Page<StackDescriptor>> {
        let state = self.call("DescribeStacks", next_token.as_deref().unwrap_or("-"))?;
        let start: usize = next_token.as_deref().map_or(Ok(0), str::parse::<usize>)?;
        let end = (start + PAGE_SIZE).min(state.stacks.len());
        let stacks = state.stacks[start..end]
            .iter()
            .map(|(s, _)| s.clone())
            .collect();
        let next = (end < state.stacks.len()).then(|| end.to_string());
        Ok(Page::new(stacks, next))
    }

    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<ResourceDescriptor>> {
        let state = self.call("DescribeStackResources", stack_name)?;
        match state.stacks.iter().find(|(s, _)| s.name == stack_name) {
            Some((_, resources)) => Ok(resources.clone()),
            None => bail!("Stack with id {stack_name} does not exist"),
        }
    }
}

impl BucketOperations for FakeCloud {
    async fn bucket_tags(&self, bucket: &str) -> Result<Vec<Tag>> {
        let state = self.call("GetBucketTagging", bucket)?;
        Ok(state
            .buckets
            .get(bucket)
            .map(|b| b.tags.clone())
            .unwrap_or_default())
    }

    async fn list_objects(&self, bucket: &str, token: Option<String>) -> Result<Page<ObjectId>> {
        let state = self.call("ListObjectsV2", bucket)?;
        let Some(b) = state.buckets.get(bucket) else {
            bail!("NoSuchBucket: {bucket}");
        };
        let (keys, next) = page_after(b.objects.iter(), token.as_deref());
        Ok(Page::new(keys.into_iter().map(ObjectId::new).collect(), next))
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        marker: Option<VersionMarker>,
    ) -> Result<Page<ObjectId, VersionMarker>> {
        let state = self.call("ListObjectVersions", bucket)?;
        let Some(b) = state.buckets.get(bucket) else {
            bail!("NoSuchBucket: {bucket}");
        };
        let (keys, next) = page_after(b.objects.iter(), marker.as_ref().map(|m| m.key_marker.as_str()));
        Ok(Page::new(
            keys.into_iter().map(|k| ObjectId::versioned(k, "v1")).collect(),
            next.map(|key_marker| VersionMarker {
                key_marker,
                version_id_marker: Some("v1".into()),
            }),
        ))
    }

    async fn delete_objects(&self, bucket: &str, ids: &[ObjectId]) -> Result<Vec<DeleteFailure>> {
        let mut state = self.call("DeleteObjects", bucket)?;
        if let Some(b) = state.buckets.get_mut(bucket) {
            for id in ids {
                b.objects.remove(&id.key);
            }
        }
        Ok(Vec::new())
    }
}

impl TableOperations for FakeCloud {
    async fn describe_table(&self, table: &str) -> Result<TableInfo> {
        let state = self.call("DescribeTable", table)?;
        if !state.tables.contains_key(table) {
            bail!("ResourceNotFoundException: {table}");
        }
        Ok(TableInfo {
            arn: format!("arn:aws:dynamodb:us-east-1:123456789012:table/{table}"),
            key_attributes: vec!["id".into()],
        })
    }

    async fn list_tags(&self, arn: &str, token: Option<String>) -> Result<Page<Tag>> {
        let table = arn.rsplit('/').next().unwrap_or(arn);
        let state = self.call("ListTagsOfResource", table)?;
        let all = state
            .tables
            .get(table)
            .map(|t| t.tags.clone())
            .unwrap_or_default();
        // One tag per page, so multi-page tag listings are exercised
        let index: usize = token.as_deref().map_or(Ok(0), str::parse::<usize>)?;
        let page = all.get(index).cloned().into_iter().collect();
        let next = (index + 1 < all.len()).then(|| (index + 1).to_string());
        Ok(Page::new(page, next))
    }

    async fn scan_keys(
        &self,
        table: &str,
        key_attributes: &[String],
        start: Option<ItemKey>,
    ) -> Result<Page<ItemKey, ItemKey>> {
        let state = self.call("Scan", table)?;
        assert_eq!(key_attributes, &["id".to_string()][..]);
        let Some(t) = state.tables.get(table) else {
            bail!("ResourceNotFoundException: {table}");
        };
        let after = start.as_ref().and_then(|k| match k.get("id") {
            Some(KeyValue::S(id)) => Some(id.clone()),
            _ => None,
        });
        let (ids, next) = page_after(t.items.iter(), after.as_deref());
        Ok(Page::new(
            ids.iter().map(|id| item_key(id)).collect(),
            next.map(|id| item_key(&id)),
        ))
    }

    async fn batch_delete(&self, table: &str, keys: &[ItemKey]) -> Result<Vec<ItemKey>> {
        let mut state = self.call("BatchWriteItem", table)?;
        if let Some(t) = state.tables.get_mut(table) {
            for key in keys {
                if let Some(KeyValue::S(id)) = key.get("id") {
                    t.items.remove(id);
                }
            }
        }
        Ok(Vec::new())
    }
}

/// Reporter that keeps every event, optionally cancelling after N clears
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<SweepEvent>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_after(clears: usize, token: CancellationToken) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cancel_after: Some((clears, token)),
        }
    }

    pub fn events(&self) -> Vec<SweepEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Physical ids of cleared resources, in order
    pub fn cleared(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SweepEvent::ResourceCleared { outcome, .. } => Some(outcome.candidate.physical_id),
                _ => None,
            })
            .collect()
    }
}

impl SweepReporter for RecordingReporter {
    fn report(&self, event: &SweepEvent) {
        let mut events = self.events.lock().unwrap();
        events.push(event.clone());
        if let Some((limit, token)) = &self.cancel_after {
            let clears = events
                .iter()
                .filter(|e| matches!(e, SweepEvent::ResourceCleared { .. }))
                .count();
            if clears >= *limit {
                token.cancel();
            }
        }
    }
}
