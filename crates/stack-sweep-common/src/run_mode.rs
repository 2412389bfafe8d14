//! Execute vs. preview mode
//!
//! The mode is chosen once from the command line and passed explicitly to
//! every clearing call.

use serde::Serialize;

/// Whether mutating provider calls are issued
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Delete data
    #[default]
    #[strum(serialize = "execute")]
    Execute,
    /// Enumerate and report, delete nothing
    #[strum(serialize = "dry-run")]
    DryRun,
}

impl RunMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            RunMode::DryRun
        } else {
            RunMode::Execute
        }
    }

    pub fn is_dry_run(self) -> bool {
        self == RunMode::DryRun
    }
}
