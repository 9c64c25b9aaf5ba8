use sectoken_claims::AuthorizationPolicy;

use crate::error::{ProviderError, ResolutionError, ValidationError};
use crate::keys::{KeyReference, SecurityKey};
use crate::token::SecurityToken;

/// Validates one category of credential into authorization policies.
///
/// Implementations are stateless after construction and safe to share
/// across threads.
pub trait TokenAuthenticator: Send + Sync {
    /// Stable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether `token` is a credential this authenticator handles.
    ///
    /// Must be cheap and must not fail; malformed input yields `false`.
    fn can_validate(&self, token: &SecurityToken) -> bool;

    /// Authenticator-specific validation. Only called when
    /// [`Self::can_validate`] returned `true`.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] describing the first failed check.
    fn validate_token(
        &self,
        token: &SecurityToken,
    ) -> Result<Vec<AuthorizationPolicy>, ValidationError>;

    /// Validates `token`.
    ///
    /// Calling this for a credential the authenticator does not accept is a
    /// caller bug and yields [`ValidationError::UnsupportedCredential`]. An
    /// empty policy list is never returned as success.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] on any failed check.
    fn validate(
        &self,
        token: &SecurityToken,
    ) -> Result<Vec<AuthorizationPolicy>, ValidationError> {
        if !self.can_validate(token) {
            tracing::error!(
                authenticator = self.name(),
                kind = %token.kind(),
                "validate called for a credential the authenticator does not accept"
            );
            return Err(ValidationError::UnsupportedCredential {
                authenticator: self.name(),
                kind: token.kind(),
            });
        }

        let policies = self.validate_token(token)?;
        if policies.is_empty() {
            return Err(ValidationError::NoPolicies {
                authenticator: self.name(),
            });
        }
        Ok(policies)
    }
}

/// Acquires credentials on behalf of a caller.
pub trait TokenProvider: Send + Sync {
    /// # Errors
    /// Returns [`ProviderError`] if the credential cannot be obtained.
    fn get_token(&self) -> Result<SecurityToken, ProviderError>;

    fn supports_renewal(&self) -> bool {
        false
    }

    /// # Errors
    /// Returns [`ProviderError::RenewalNotSupported`] unless overridden.
    fn renew_token(&self, _token: &SecurityToken) -> Result<SecurityToken, ProviderError> {
        Err(ProviderError::RenewalNotSupported)
    }

    /// # Errors
    /// Returns [`ProviderError::CancellationNotSupported`] unless overridden.
    fn cancel_token(&self, _token: &SecurityToken) -> Result<(), ProviderError> {
        Err(ProviderError::CancellationNotSupported)
    }
}

/// Resolves [`KeyReference`]s to key material or to the owning token.
pub trait KeyResolver: Send + Sync {
    /// # Errors
    /// Returns [`ResolutionError`] if the reference cannot be resolved.
    fn resolve_key(&self, reference: &KeyReference) -> Result<SecurityKey, ResolutionError>;

    /// # Errors
    /// Returns [`ResolutionError`] if the reference cannot be resolved.
    fn resolve_token(&self, reference: &KeyReference) -> Result<SecurityToken, ResolutionError>;
}
