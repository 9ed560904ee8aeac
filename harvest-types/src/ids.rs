//! Identifier types used throughout the data layer.
//!
//! Remote services hand out ids in whatever shape they like (Mongo object ids,
//! Firestore document keys, plain integers). We keep them as opaque strings.
//! Records that arrive without any id get a UUID v5 derived from their content,
//! which keeps the id stable across repeated normalization of the same payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Namespace for content-derived entity ids.
const DERIVED_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_43c2_8d5e_4b7a_9c31_0e2d_57f8_a9b4);

/// Unique, stable identifier for an entity held by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wraps a remote identifier. Surrounding whitespace is trimmed.
    ///
    /// Returns an error for empty or whitespace-only input.
    pub fn new(id: impl AsRef<str>) -> crate::Result<Self> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidId(id.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Derives a deterministic id from a content key.
    ///
    /// The same key always yields the same id.
    #[must_use]
    pub fn derived(key: &str) -> Self {
        Self(Uuid::new_v5(&DERIVED_ID_NAMESPACE, key.as_bytes()).to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
