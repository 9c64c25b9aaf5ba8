//! Credentials consumed by authenticators and key resolvers.
//!
//! Tokens are immutable once built. Each carries an `id` that key
//! references can point at via [`crate::KeyReference::ByLocalId`].

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::assertion::Assertion;
use crate::certificate::Certificate;
use crate::keys::{SecurityKey, SymmetricKey};
use crate::models::{CredentialKind, ImpersonationLevel};
use crate::platform::PlatformIdentity;

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Username and password pair.
pub struct UserNameToken {
    pub id: String,
    pub user_name: String,
    pub password: SecretString,
}

impl UserNameToken {
    #[must_use]
    pub fn new(user_name: impl Into<String>, password: SecretString) -> Self {
        Self {
            id: fresh_id(),
            user_name: user_name.into(),
            password,
        }
    }
}

impl Clone for UserNameToken {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            user_name: self.user_name.clone(),
            password: SecretString::from(self.password.expose_secret().to_owned()),
        }
    }
}

impl fmt::Debug for UserNameToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserNameToken")
            .field("id", &self.id)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Certificate credential; the proof key is the certificate's public key.
#[derive(Debug, Clone)]
pub struct X509Token {
    pub id: String,
    pub certificate: Arc<Certificate>,
}

impl X509Token {
    #[must_use]
    pub fn new(certificate: impl Into<Arc<Certificate>>) -> Self {
        Self {
            id: fresh_id(),
            certificate: certificate.into(),
        }
    }

    #[must_use]
    pub fn proof_key(&self) -> SecurityKey {
        SecurityKey::Asymmetric(self.certificate.public_key().clone())
    }
}

/// Side of a Kerberos exchange a token was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KerberosRole {
    /// Obtained by a client to send to a service.
    Requestor,
    /// Received by a service from a client.
    Receiver,
}

#[derive(Debug, Clone)]
pub struct KerberosToken {
    pub id: String,
    pub role: KerberosRole,
    pub service_principal_name: String,
    pub ticket: Vec<u8>,
    pub impersonation_level: ImpersonationLevel,
    /// Ties the token to the exchange that produced it in logs.
    pub correlation_id: Uuid,
    pub channel_binding: Option<Vec<u8>>,
    pub session_key: Option<SymmetricKey>,
    /// Ticket lifetime; unknown for received tickets until the platform accepts them.
    pub valid_from: Option<OffsetDateTime>,
    pub valid_to: Option<OffsetDateTime>,
}

impl KerberosToken {
    /// Ticket received by a service, ready for validation.
    #[must_use]
    pub fn received(
        service_principal_name: impl Into<String>,
        ticket: Vec<u8>,
        channel_binding: Option<Vec<u8>>,
    ) -> Self {
        Self {
            id: fresh_id(),
            role: KerberosRole::Receiver,
            service_principal_name: service_principal_name.into(),
            ticket,
            impersonation_level: ImpersonationLevel::Identification,
            correlation_id: Uuid::new_v4(),
            channel_binding,
            session_key: None,
            valid_from: None,
            valid_to: None,
        }
    }
}

/// An already authenticated platform identity.
#[derive(Debug, Clone)]
pub struct WindowsToken {
    pub id: String,
    pub identity: PlatformIdentity,
    pub valid_from: OffsetDateTime,
    pub valid_to: OffsetDateTime,
}

impl WindowsToken {
    #[must_use]
    pub fn new(identity: PlatformIdentity, valid_from: OffsetDateTime, valid_to: OffsetDateTime) -> Self {
        Self {
            id: fresh_id(),
            identity,
            valid_from,
            valid_to,
        }
    }
}

/// Owns a symmetric key for key resolution.
#[derive(Debug, Clone)]
pub struct SymmetricToken {
    pub id: String,
    pub key: SymmetricKey,
}

impl SymmetricToken {
    #[must_use]
    pub fn new(id: impl Into<String>, key: SymmetricKey) -> Self {
        Self { id: id.into(), key }
    }
}

/// A symmetric key that was obtained by unwrapping `wrapped` with `algorithm`.
#[derive(Debug, Clone)]
pub struct WrappedKeyToken {
    pub id: String,
    pub key: SymmetricKey,
    pub algorithm: String,
    pub wrapped: Vec<u8>,
}

/// Tagged union of every credential the framework understands.
#[derive(Debug, Clone)]
pub enum SecurityToken {
    UserName(UserNameToken),
    X509(X509Token),
    Kerberos(KerberosToken),
    Windows(WindowsToken),
    Assertion(Arc<Assertion>),
    Symmetric(SymmetricToken),
    WrappedKey(WrappedKeyToken),
}

impl SecurityToken {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::UserName(t) => &t.id,
            Self::X509(t) => &t.id,
            Self::Kerberos(t) => &t.id,
            Self::Windows(t) => &t.id,
            Self::Assertion(a) => &a.id,
            Self::Symmetric(t) => &t.id,
            Self::WrappedKey(t) => &t.id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::UserName(_) => CredentialKind::UserName,
            Self::X509(_) => CredentialKind::X509,
            Self::Kerberos(_) => CredentialKind::Kerberos,
            Self::Windows(_) => CredentialKind::Windows,
            Self::Assertion(_) => CredentialKind::Assertion,
            Self::Symmetric(_) => CredentialKind::Symmetric,
            Self::WrappedKey(_) => CredentialKind::WrappedKey,
        }
    }

    /// Start of the cryptographic lifetime, for tokens that have one.
    #[must_use]
    pub fn valid_from(&self) -> Option<OffsetDateTime> {
        match self {
            Self::X509(t) => Some(t.certificate.not_before()),
            Self::Kerberos(t) => t.valid_from,
            Self::Windows(t) => Some(t.valid_from),
            Self::Assertion(a) => a.conditions.as_ref().and_then(|c| c.not_before),
            Self::UserName(_) | Self::Symmetric(_) | Self::WrappedKey(_) => None,
        }
    }

    #[must_use]
    pub fn valid_to(&self) -> Option<OffsetDateTime> {
        match self {
            Self::X509(t) => Some(t.certificate.not_after()),
            Self::Kerberos(t) => t.valid_to,
            Self::Windows(t) => Some(t.valid_to),
            Self::Assertion(a) => a.conditions.as_ref().and_then(|c| c.not_on_or_after),
            Self::UserName(_) | Self::Symmetric(_) | Self::WrappedKey(_) => None,
        }
    }

    /// First key owned by the token, if any.
    #[must_use]
    pub fn first_key(&self) -> Option<SecurityKey> {
        match self {
            Self::X509(t) => Some(t.proof_key()),
            Self::Kerberos(t) => t.session_key.clone().map(SecurityKey::Symmetric),
            Self::Assertion(a) => a.proof_key().cloned(),
            Self::Symmetric(t) => Some(SecurityKey::Symmetric(t.key.clone())),
            Self::WrappedKey(t) => Some(SecurityKey::Symmetric(t.key.clone())),
            Self::UserName(_) | Self::Windows(_) => None,
        }
    }

    /// Whether the token owns `key`.
    #[must_use]
    pub fn owns_key(&self, key: &SecurityKey) -> bool {
        self.first_key().is_some_and(|own| &own == key)
    }
}

impl From<UserNameToken> for SecurityToken {
    fn from(token: UserNameToken) -> Self {
        Self::UserName(token)
    }
}

impl From<X509Token> for SecurityToken {
    fn from(token: X509Token) -> Self {
        Self::X509(token)
    }
}

impl From<KerberosToken> for SecurityToken {
    fn from(token: KerberosToken) -> Self {
        Self::Kerberos(token)
    }
}

impl From<WindowsToken> for SecurityToken {
    fn from(token: WindowsToken) -> Self {
        Self::Windows(token)
    }
}

impl From<Assertion> for SecurityToken {
    fn from(assertion: Assertion) -> Self {
        Self::Assertion(Arc::new(assertion))
    }
}

impl From<SymmetricToken> for SecurityToken {
    fn from(token: SymmetricToken) -> Self {
        Self::Symmetric(token)
    }
}

impl From<WrappedKeyToken> for SecurityToken {
    fn from(token: WrappedKeyToken) -> Self {
        Self::WrappedKey(token)
    }
}
