use std::collections::HashSet;

use token_auth_sdk::platform::KeyUnwrapper;
use token_auth_sdk::{SecurityKey, SymmetricKey, UnwrapError};

/// Key unwrapper for test fixtures.
///
/// Wrapping is an XOR with the repeated unwrapping key, so [`wrap`] and
/// [`KeyUnwrapper::unwrap_key`] are the same transform. Only the configured
/// algorithm URIs are accepted.
pub struct StaticKeyUnwrapper {
    algorithms: HashSet<String>,
}

impl StaticKeyUnwrapper {
    #[must_use]
    pub fn new(algorithms: impl IntoIterator<Item = String>) -> Self {
        Self {
            algorithms: algorithms.into_iter().collect(),
        }
    }
}

/// Wraps `key` under `wrapping_key` the way [`StaticKeyUnwrapper`] expects.
#[must_use]
pub fn wrap(wrapping_key: &SymmetricKey, key: &[u8]) -> Vec<u8> {
    xor(wrapping_key.expose(), key)
}

fn xor(key: &[u8], data: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

impl KeyUnwrapper for StaticKeyUnwrapper {
    fn unwrap_key(
        &self,
        algorithm: &str,
        unwrapping_key: &SecurityKey,
        wrapped: &[u8],
    ) -> Result<SymmetricKey, UnwrapError> {
        if !self.algorithms.contains(algorithm) {
            return Err(UnwrapError {
                reason: format!("unsupported algorithm '{algorithm}'"),
            });
        }
        let SecurityKey::Symmetric(key) = unwrapping_key else {
            return Err(UnwrapError {
                reason: format!("{} keys cannot unwrap", unwrapping_key.kind()),
            });
        };
        if key.is_empty() || wrapped.is_empty() {
            return Err(UnwrapError {
                reason: "empty key material".to_owned(),
            });
        }
        Ok(SymmetricKey::new(xor(key.expose(), wrapped)))
    }
}
