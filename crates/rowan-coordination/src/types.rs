//! Shared types for coordination operations.

use serde::Deserialize;
use serde::Serialize;

/// A claimed identifier together with the label of its current owner.
///
/// Created by a successful claim; removed by the store when the owning
/// lease expires or is revoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    /// The claimed identifier.
    pub key: String,
    /// Opaque label identifying the owner, e.g. a hostname.
    pub value: String,
}
