//! Key material and key references.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::certificate::PublicKey;

/// Symmetric key bytes, wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey(Vec<u8>);

impl SymmetricKey {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw key bytes. Callers must not log or persist them.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey(<{} bytes redacted>)", self.0.len())
    }
}

/// Concrete key material returned by key resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityKey {
    Symmetric(SymmetricKey),
    Asymmetric(PublicKey),
}

impl SecurityKey {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Symmetric(_) => "symmetric",
            Self::Asymmetric(_) => "asymmetric",
        }
    }
}

/// Opaque pointer to key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyReference {
    /// The key itself.
    ByValue(SecurityKey),
    /// Identifier local to the token collection being searched.
    ByLocalId(String),
    /// Key bytes wrapped under the key that `inner` resolves to.
    ByEncryptedKey {
        wrapped: Vec<u8>,
        algorithm: String,
        inner: Box<KeyReference>,
    },
}

impl KeyReference {
    #[must_use]
    pub fn encrypted(
        wrapped: impl Into<Vec<u8>>,
        algorithm: impl Into<String>,
        inner: KeyReference,
    ) -> Self {
        Self::ByEncryptedKey {
            wrapped: wrapped.into(),
            algorithm: algorithm.into(),
            inner: Box::new(inner),
        }
    }
}

// Never renders key bytes.
impl fmt::Display for KeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByValue(key) => write!(f, "by-value({})", key.kind()),
            Self::ByLocalId(id) => write!(f, "local-id({id})"),
            Self::ByEncryptedKey {
                algorithm, inner, ..
            } => write!(f, "encrypted-key({algorithm}, {inner})"),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_symmetric_bytes() {
        let key = SymmetricKey::new(vec![0xde, 0xad, 0xbe, 0xef]);
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("222"));
        assert!(!rendered.contains("dead"));
        assert!(rendered.contains("4 bytes"));
    }

    #[test]
    fn display_shows_structure_without_material() {
        let reference = KeyReference::encrypted(
            vec![1, 2, 3],
            "aes256-kw",
            KeyReference::ByValue(SecurityKey::Symmetric(SymmetricKey::new(vec![9; 32]))),
        );
        assert_eq!(
            reference.to_string(),
            "encrypted-key(aes256-kw, by-value(symmetric))"
        );
    }
}
