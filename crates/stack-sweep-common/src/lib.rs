//! stack-sweep-common - Provider-independent types
//!
//! Tag matching, resource kinds and run modes used by the sweeper, kept free of
//! AWS SDK dependencies.
//!
//! ## Modules
//!
//! - [`defaults`]: Provider limits and default configuration values
//! - [`resource`]: Resource kinds, descriptors and clear candidates
//! - [`run_mode`]: Execute vs. dry-run
//! - [`tags`]: Tag tokens, tag sets and the inclusion/exclusion filters

pub mod defaults;
pub mod resource;
pub mod run_mode;
pub mod tags;

pub use resource::{ClearCandidate, ResourceDescriptor, ResourceKind};
pub use run_mode::RunMode;
pub use tags::{ExclusionFilter, InclusionFilter, Tag, TagSet, TagToken};
