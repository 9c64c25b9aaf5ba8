//! Key resolution over in-memory token collections.

use std::sync::Arc;

use token_auth_sdk::platform::KeyUnwrapper;
use token_auth_sdk::{
    KeyReference, KeyResolver, ResolutionError, SecurityKey, SecurityToken, Thumbprint,
    WrappedKeyToken,
};

/// Maximum nesting of [`KeyReference::ByEncryptedKey`] layers.
pub const MAX_KEY_RESOLUTION_DEPTH: usize = 8;

/// Resolves references against a fixed token list.
///
/// Tokens are scanned in construction order and the first match wins.
pub struct TokenKeyResolver {
    tokens: Arc<[SecurityToken]>,
    local_id_capable: bool,
    unwrapper: Arc<dyn KeyUnwrapper>,
}

impl TokenKeyResolver {
    #[must_use]
    pub fn new(
        tokens: impl Into<Arc<[SecurityToken]>>,
        local_id_capable: bool,
        unwrapper: Arc<dyn KeyUnwrapper>,
    ) -> Self {
        Self {
            tokens: tokens.into(),
            local_id_capable,
            unwrapper,
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &[SecurityToken] {
        &self.tokens
    }

    fn find_by_local_id(&self, local_id: &str) -> Result<&SecurityToken, ResolutionError> {
        if !self.local_id_capable {
            return Err(ResolutionError::LocalIdDisabled {
                local_id: local_id.to_owned(),
            });
        }
        self.tokens
            .iter()
            .find(|t| t.id() == local_id)
            .ok_or_else(|| ResolutionError::NotFound {
                reference: format!("local-id({local_id})"),
            })
    }

    fn find_owner(&self, key: &SecurityKey) -> Option<&SecurityToken> {
        self.tokens.iter().find(|t| t.owns_key(key))
    }

    fn key_at(&self, reference: &KeyReference, depth: usize) -> Result<SecurityKey, ResolutionError> {
        if depth > MAX_KEY_RESOLUTION_DEPTH {
            return Err(ResolutionError::DepthExceeded {
                max_depth: MAX_KEY_RESOLUTION_DEPTH,
            });
        }

        match reference {
            KeyReference::ByValue(key) => self
                .find_owner(key)
                .map(|_| key.clone())
                .ok_or_else(|| not_found(reference)),
            KeyReference::ByLocalId(local_id) => {
                let token = self.find_by_local_id(local_id)?;
                token.first_key().ok_or_else(|| ResolutionError::WrongKind {
                    reference: reference.to_string(),
                    expected: "key-owning token",
                    found: token.kind().to_string(),
                })
            }
            KeyReference::ByEncryptedKey {
                wrapped,
                algorithm,
                inner,
            } => {
                let unwrapping_key = self.key_at(inner, depth + 1)?;
                let key = self
                    .unwrapper
                    .unwrap_key(algorithm, &unwrapping_key, wrapped)
                    .map_err(|e| ResolutionError::UnwrapFailed {
                        algorithm: algorithm.clone(),
                        reason: e.reason,
                    })?;
                Ok(SecurityKey::Symmetric(key))
            }
        }
    }
}

impl KeyResolver for TokenKeyResolver {
    fn resolve_key(&self, reference: &KeyReference) -> Result<SecurityKey, ResolutionError> {
        let resolved = self.key_at(reference, 0);
        if let Err(e) = &resolved {
            tracing::debug!(reference = %reference, error = %e, "key resolution failed");
        }
        resolved
    }

    fn resolve_token(&self, reference: &KeyReference) -> Result<SecurityToken, ResolutionError> {
        match reference {
            KeyReference::ByValue(key) => self
                .find_owner(key)
                .cloned()
                .ok_or_else(|| not_found(reference)),
            KeyReference::ByLocalId(local_id) => self.find_by_local_id(local_id).cloned(),
            KeyReference::ByEncryptedKey {
                wrapped, algorithm, ..
            } => {
                let SecurityKey::Symmetric(key) = self.resolve_key(reference)? else {
                    return Err(ResolutionError::WrongKind {
                        reference: reference.to_string(),
                        expected: "symmetric key",
                        found: "asymmetric key".to_owned(),
                    });
                };
                // Content-derived id keeps repeated resolutions identical.
                Ok(SecurityToken::WrappedKey(WrappedKeyToken {
                    id: format!("wrapped-{}", Thumbprint::of(wrapped)),
                    key,
                    algorithm: algorithm.clone(),
                    wrapped: wrapped.clone(),
                }))
            }
        }
    }
}

/// Tries several resolvers in order; the first success wins.
///
/// When every resolver fails, the first error other than `NotFound` is
/// returned, so a real failure is not masked by a later miss.
pub struct AggregateKeyResolver {
    resolvers: Vec<Arc<dyn KeyResolver>>,
}

impl AggregateKeyResolver {
    #[must_use]
    pub fn new(resolvers: Vec<Arc<dyn KeyResolver>>) -> Self {
        Self { resolvers }
    }

    fn first_success<T>(
        &self,
        reference: &KeyReference,
        resolve: impl Fn(&dyn KeyResolver) -> Result<T, ResolutionError>,
    ) -> Result<T, ResolutionError> {
        let mut failure: Option<ResolutionError> = None;
        for resolver in &self.resolvers {
            match resolve(resolver.as_ref()) {
                Ok(found) => return Ok(found),
                Err(ResolutionError::NotFound { .. }) => {}
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        Err(failure.unwrap_or_else(|| not_found(reference)))
    }
}

impl KeyResolver for AggregateKeyResolver {
    fn resolve_key(&self, reference: &KeyReference) -> Result<SecurityKey, ResolutionError> {
        self.first_success(reference, |r| r.resolve_key(reference))
    }

    fn resolve_token(&self, reference: &KeyReference) -> Result<SecurityToken, ResolutionError> {
        self.first_success(reference, |r| r.resolve_token(reference))
    }
}

fn not_found(reference: &KeyReference) -> ResolutionError {
    ResolutionError::NotFound {
        reference: reference.to_string(),
    }
}
