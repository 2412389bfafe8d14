//! DynamoDB table metadata, key scans and batch deletes

use crate::aws::context::AwsContext;
use crate::aws::retry::RetryPolicy;
use crate::aws::{FromAwsContext, SdkValue};
use crate::error::ProviderLogicError;
use crate::pagination::Page;
use anyhow::{Context, Result};
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, WriteRequest};
use stack_sweep_common::Tag;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A primary-key attribute value. Keys can only be strings, numbers or binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    S(String),
    N(String),
    B(Vec<u8>),
}

impl KeyValue {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::S(s) => Some(KeyValue::S(s.clone())),
            AttributeValue::N(n) => Some(KeyValue::N(n.clone())),
            AttributeValue::B(b) => Some(KeyValue::B(b.as_ref().to_vec())),
            _ => None,
        }
    }

    fn to_attribute(&self) -> AttributeValue {
        match self {
            KeyValue::S(s) => AttributeValue::S(s.clone()),
            KeyValue::N(n) => AttributeValue::N(n.clone()),
            KeyValue::B(b) => AttributeValue::B(Blob::new(b.clone())),
        }
    }
}

/// A table item's primary key: key attribute name to value.
///
/// Only key attributes are carried; item payloads are never read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ItemKey(BTreeMap<String, KeyValue>);

impl ItemKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: impl Into<String>, value: KeyValue) -> Self {
        self.0.insert(attribute.into(), value);
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&KeyValue> {
        self.0.get(attribute)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extract exactly `key_attributes` from a scanned item.
    ///
    /// Returns the name of the first attribute that is absent or not a
    /// key type.
    pub fn from_item(
        item: &HashMap<String, AttributeValue>,
        key_attributes: &[String],
    ) -> Result<Self, String> {
        key_attributes
            .iter()
            .map(|name| {
                item.get(name)
                    .and_then(KeyValue::from_attribute)
                    .map(|value| (name.clone(), value))
                    .ok_or_else(|| name.clone())
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(ItemKey)
    }

    fn to_attributes(&self) -> HashMap<String, AttributeValue> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_attribute()))
            .collect()
    }
}

/// What the clearer and resolver need from `DescribeTable`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub arn: String,
    /// Partition key first, then the sort key if any
    pub key_attributes: Vec<String>,
}

/// Table operations consumed by the resolver and the table clearer.
///
/// Note: start keys are passed as owned `Option<ItemKey>` to work around
/// mockall lifetime limitations.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait TableOperations: Send + Sync {
    /// ARN and key schema of a table
    async fn describe_table(&self, table: &str) -> Result<TableInfo>;

    /// One page of a table's tags, addressed by ARN
    async fn list_tags(&self, arn: &str, token: Option<String>) -> Result<Page<Tag>>;

    /// One page of item keys, projecting only `key_attributes`
    async fn scan_keys(
        &self,
        table: &str,
        key_attributes: &[String],
        start: Option<ItemKey>,
    ) -> Result<Page<ItemKey, ItemKey>>;

    /// Delete up to 25 keys; returns the keys left unprocessed
    async fn batch_delete(&self, table: &str, keys: &[ItemKey]) -> Result<Vec<ItemKey>>;
}

/// DynamoDB client for table clearing
pub struct DynamoDbClient {
    client: Client,
    retry: RetryPolicy,
}

impl FromAwsContext for DynamoDbClient {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.dynamodb_client(),
            retry: ctx.retry_policy().clone(),
        }
    }
}

/// Placeholder names for the key attributes, so reserved words are safe
fn projection(key_attributes: &[String]) -> (String, HashMap<String, String>) {
    let names: HashMap<String, String> = key_attributes
        .iter()
        .enumerate()
        .map(|(i, name)| (format!("#k{i}"), name.clone()))
        .collect();
    let expression = (0..key_attributes.len())
        .map(|i| format!("#k{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    (expression, names)
}

impl TableOperations for DynamoDbClient {
    async fn describe_table(&self, table: &str) -> Result<TableInfo> {
        let response = self
            .retry
            .run("DescribeTable", || {
                self.client.describe_table().table_name(table).send()
            })
            .await
            .with_context(|| format!("Failed to describe table '{table}'"))?;

        let description = response.table();
        let arn = description
            .and_then(|d| d.table_arn())
            .ok_or_else(|| ProviderLogicError::MissingTableArn {
                table: table.to_string(),
            })?;
        let key_attributes = description
            .map(|d| d.key_schema())
            .unwrap_or_default()
            .iter()
            .filter_map(|k| k.attribute_name().optional().map(str::to_string))
            .collect();

        Ok(TableInfo {
            arn: arn.to_string(),
            key_attributes,
        })
    }

    async fn list_tags(&self, arn: &str, token: Option<String>) -> Result<Page<Tag>> {
        let response = self
            .retry
            .run("ListTagsOfResource", || {
                self.client
                    .list_tags_of_resource()
                    .resource_arn(arn)
                    .set_next_token(token.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to list tags of '{arn}'"))?;

        let tags = response
            .tags()
            .iter()
            .filter_map(|t| Some(Tag::new(t.key().optional()?, t.value().optional()?)))
            .collect();

        Ok(Page::new(tags, response.next_token().map(str::to_string)))
    }

    async fn scan_keys(
        &self,
        table: &str,
        key_attributes: &[String],
        start: Option<ItemKey>,
    ) -> Result<Page<ItemKey, ItemKey>> {
        let (expression, names) = projection(key_attributes);
        let start = start.map(|key| key.to_attributes());

        let response = self
            .retry
            .run("Scan", || {
                self.client
                    .scan()
                    .table_name(table)
                    .projection_expression(expression.clone())
                    .set_expression_attribute_names(Some(names.clone()))
                    .set_exclusive_start_key(start.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to scan table '{table}'"))?;

        let malformed = |attribute: String| ProviderLogicError::MalformedKey {
            table: table.to_string(),
            attribute,
        };

        let keys = response
            .items()
            .iter()
            .map(|item| ItemKey::from_item(item, key_attributes).map_err(malformed))
            .collect::<Result<Vec<_>, _>>()?;

        let next = response
            .last_evaluated_key()
            .filter(|key| !key.is_empty())
            .map(|key| ItemKey::from_item(key, key_attributes).map_err(malformed))
            .transpose()?;

        debug!(table = %table, count = keys.len(), has_next = next.is_some(), "Scanned key page");

        Ok(Page::new(keys, next))
    }

    async fn batch_delete(&self, table: &str, keys: &[ItemKey]) -> Result<Vec<ItemKey>> {
        let requests = keys
            .iter()
            .map(|key| {
                DeleteRequest::builder()
                    .set_key(Some(key.to_attributes()))
                    .build()
                    .map(|delete| WriteRequest::builder().delete_request(delete).build())
            })
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to build delete requests")?;

        let response = self
            .retry
            .run("BatchWriteItem", || {
                self.client
                    .batch_write_item()
                    .request_items(table, requests.clone())
                    .send()
            })
            .await
            .with_context(|| format!("Failed to batch delete items in table '{table}'"))?;

        let key_attributes: Vec<String> = keys
            .first()
            .map(|k| k.0.keys().cloned().collect())
            .unwrap_or_default();

        let unprocessed = response
            .unprocessed_items()
            .and_then(|items| items.get(table))
            .map(|requests| unprocessed_keys(table, requests, &key_attributes))
            .transpose()?
            .unwrap_or_default();

        Ok(unprocessed)
    }
}

/// Keys of the delete requests BatchWriteItem handed back.
///
/// A request whose key cannot be read is an error, never dropped: its item
/// would otherwise count as deleted.
fn unprocessed_keys(
    table: &str,
    requests: &[WriteRequest],
    key_attributes: &[String],
) -> Result<Vec<ItemKey>, ProviderLogicError> {
    let no_key = HashMap::new();
    requests
        .iter()
        .map(|request| {
            let key = request
                .delete_request()
                .and_then(|d| d.key().optional())
                .unwrap_or(&no_key);
            ItemKey::from_item(key, key_attributes).map_err(|attribute| {
                ProviderLogicError::MalformedKey {
                    table: table.to_string(),
                    attribute,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pairs: &[(&str, AttributeValue)]) -> HashMap<String, AttributeValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn delete_request(key: HashMap<String, AttributeValue>) -> WriteRequest {
        WriteRequest::builder()
            .delete_request(DeleteRequest::builder().set_key(Some(key)).build().unwrap())
            .build()
    }

    #[test]
    fn test_unprocessed_keys_are_parsed() {
        let requests = vec![
            delete_request(item(&[("pk", AttributeValue::S("a".into()))])),
            delete_request(item(&[("pk", AttributeValue::S("b".into()))])),
        ];

        let keys = unprocessed_keys("orders", &requests, &["pk".into()]).unwrap();

        assert_eq!(
            keys,
            vec![
                ItemKey::new().with("pk", KeyValue::S("a".into())),
                ItemKey::new().with("pk", KeyValue::S("b".into())),
            ]
        );
    }

    #[test]
    fn test_unreadable_unprocessed_key_is_an_error() {
        let requests = vec![
            delete_request(item(&[("pk", AttributeValue::S("a".into()))])),
            delete_request(item(&[("other", AttributeValue::S("b".into()))])),
        ];

        let err = unprocessed_keys("orders", &requests, &["pk".into()]).unwrap_err();

        assert!(matches!(
            err,
            ProviderLogicError::MalformedKey { ref table, ref attribute }
                if table == "orders" && attribute == "pk"
        ));
    }

    #[test]
    fn test_unprocessed_put_request_is_an_error() {
        let requests = vec![WriteRequest::builder().build()];

        assert!(unprocessed_keys("orders", &requests, &["pk".into()]).is_err());
    }

    #[test]
    fn test_item_key_keeps_only_key_attributes() {
        let scanned = item(&[
            ("pk", AttributeValue::S("user#1".into())),
            ("sk", AttributeValue::N("7".into())),
            ("payload", AttributeValue::S("ignored".into())),
        ]);
        let key = ItemKey::from_item(&scanned, &["pk".into(), "sk".into()]).unwrap();

        assert_eq!(key.len(), 2);
        assert_eq!(key.get("pk"), Some(&KeyValue::S("user#1".into())));
        assert_eq!(key.get("sk"), Some(&KeyValue::N("7".into())));
        assert!(key.get("payload").is_none());
    }

    #[test]
    fn test_item_key_reports_missing_attribute() {
        let scanned = item(&[("pk", AttributeValue::S("a".into()))]);
        let err = ItemKey::from_item(&scanned, &["pk".into(), "sk".into()]).unwrap_err();
        assert_eq!(err, "sk");
    }

    #[test]
    fn test_item_key_rejects_non_key_types() {
        let scanned = item(&[("pk", AttributeValue::Bool(true))]);
        assert!(ItemKey::from_item(&scanned, &["pk".into()]).is_err());
    }

    #[test]
    fn test_binary_keys_convert_back() {
        let key = ItemKey::new().with("id", KeyValue::B(vec![0, 1, 2]));
        let attributes = key.to_attributes();
        assert_eq!(
            attributes.get("id"),
            Some(&AttributeValue::B(Blob::new(vec![0, 1, 2])))
        );
    }

    #[test]
    fn test_projection_uses_placeholders() {
        let (expression, names) = projection(&["pk".into(), "name".into()]);
        assert_eq!(expression, "#k0, #k1");
        assert_eq!(names.get("#k1").map(String::as_str), Some("name"));
    }
}
