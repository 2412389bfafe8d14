//! stack-sweep - empty the data stores of tagged CloudFormation stacks
//!
//! Finds every stack carrying all of the inclusion tags, then deletes the
//! objects of its S3 buckets and the items of its DynamoDB tables. Buckets
//! and tables carrying any exclusion tag are left alone. The resources
//! themselves are never deleted.

pub mod aws;
pub mod clear;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod orchestrator;
pub mod pagination;
pub mod resolver;

#[cfg(test)]
mod testing;
