//! A single asserted fact about an identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The right a claim grants over its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Right {
    /// The value uniquely identifies the subject.
    Identity,
    /// The subject possesses the value.
    PossessProperty,
}

/// Typed claim value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimValue {
    String(String),
    Bytes(Vec<u8>),
    Timestamp(OffsetDateTime),
    /// SHA-256 certificate thumbprint.
    Thumbprint([u8; 32]),
    /// Platform security identifier (e.g. `S-1-5-21-...`).
    Sid(String),
}

impl ClaimValue {
    /// Returns the value as a string slice when it is textual.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Sid(s) => Some(s),
            Self::Bytes(_) | Self::Timestamp(_) | Self::Thumbprint(_) => None,
        }
    }
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Sid(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Timestamp(t) => write!(f, "{t}"),
            Self::Thumbprint(t) => {
                for byte in t {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<OffsetDateTime> for ClaimValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::Timestamp(value)
    }
}

/// Immutable `(type, value, right)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Claim {
    claim_type: String,
    value: ClaimValue,
    right: Right,
}

impl Claim {
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<ClaimValue>, right: Right) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            right,
        }
    }

    /// Claim with [`Right::Identity`].
    #[must_use]
    pub fn identity(claim_type: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        Self::new(claim_type, value, Right::Identity)
    }

    /// Claim with [`Right::PossessProperty`].
    #[must_use]
    pub fn possess(claim_type: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        Self::new(claim_type, value, Right::PossessProperty)
    }

    #[inline]
    #[must_use]
    pub fn claim_type(&self) -> &str {
        &self.claim_type
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> &ClaimValue {
        &self.value
    }

    #[inline]
    #[must_use]
    pub fn right(&self) -> Right {
        self.right
    }
}
