//! Stack resource types and clearing order

use serde::Serialize;

/// CloudFormation type string for S3 buckets
pub const BUCKET_RESOURCE_TYPE: &str = "AWS::S3::Bucket";

/// CloudFormation type string for DynamoDB tables
pub const TABLE_RESOURCE_TYPE: &str = "AWS::DynamoDB::Table";

/// Kind of a stack-owned resource, as far as clearing is concerned
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Object-storage bucket (S3)
    Bucket,
    /// Wide-column table (DynamoDB)
    Table,
    /// Anything else; never cleared
    Other(String),
}

impl ResourceKind {
    /// Map a provider resource type string to a kind
    pub fn from_provider_type(resource_type: &str) -> Self {
        match resource_type {
            BUCKET_RESOURCE_TYPE => ResourceKind::Bucket,
            TABLE_RESOURCE_TYPE => ResourceKind::Table,
            other => ResourceKind::Other(other.to_string()),
        }
    }

    /// Short lowercase name for logs and JSON output
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Bucket => "bucket",
            ResourceKind::Table => "table",
            ResourceKind::Other(t) => t,
        }
    }

    /// Capitalized label for operator narration
    pub fn label(&self) -> &str {
        match self {
            ResourceKind::Bucket => "Bucket",
            ResourceKind::Table => "Table",
            ResourceKind::Other(t) => t,
        }
    }

    /// Whether this kind is ever cleared
    pub fn is_clearable(&self) -> bool {
        self.clear_priority().is_some()
    }

    /// Clearing order within a stack (lower clears first)
    ///
    /// - 0: buckets
    /// - 1: tables
    ///
    /// Other kinds have no priority and are skipped.
    pub fn clear_priority(&self) -> Option<u8> {
        match self {
            ResourceKind::Bucket => Some(0),
            ResourceKind::Table => Some(1),
            ResourceKind::Other(_) => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource as listed by the stack-resource API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    /// Provider-side identifier (bucket name, table name, ...)
    pub physical_id: String,
    /// Template-side name of the resource
    pub logical_id: String,
}

/// A resource that survived exclusion filtering
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClearCandidate {
    pub kind: ResourceKind,
    pub physical_id: String,
}

impl ClearCandidate {
    pub fn bucket(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Bucket,
            physical_id: name.into(),
        }
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Table,
            physical_id: name.into(),
        }
    }
}

impl std::fmt::Display for ClearCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.kind, self.physical_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_mapping() {
        assert_eq!(
            ResourceKind::from_provider_type("AWS::S3::Bucket"),
            ResourceKind::Bucket
        );
        assert_eq!(
            ResourceKind::from_provider_type("AWS::DynamoDB::Table"),
            ResourceKind::Table
        );
        assert_eq!(
            ResourceKind::from_provider_type("AWS::SQS::Queue"),
            ResourceKind::Other("AWS::SQS::Queue".to_string())
        );
    }

    #[test]
    fn test_buckets_clear_before_tables() {
        assert!(
            ResourceKind::Bucket.clear_priority() < ResourceKind::Table.clear_priority(),
            "Buckets must be cleared before tables"
        );
    }

    #[test]
    fn test_other_kinds_are_not_clearable() {
        assert!(!ResourceKind::Other("AWS::Lambda::Function".into()).is_clearable());
        assert!(ResourceKind::Bucket.is_clearable());
        assert!(ResourceKind::Table.is_clearable());
    }

    #[test]
    fn test_candidate_display() {
        assert_eq!(ClearCandidate::bucket("b1").to_string(), "bucket 'b1'");
        assert_eq!(ClearCandidate::table("t1").to_string(), "table 't1'");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ResourceKind::Bucket).unwrap();
        assert_eq!(json, "\"bucket\"");
    }
}
