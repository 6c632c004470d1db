//! Beneficiary identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable internal identifier for a beneficiary.
///
/// Upstream identity claims rotate; this id never does. Everything durable
/// (grants, crosswalks, tokens) keys off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeneficiaryId(Uuid);

impl BeneficiaryId {
    /// Creates a new random beneficiary identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a beneficiary identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BeneficiaryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BeneficiaryId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
