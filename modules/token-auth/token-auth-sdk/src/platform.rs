//! Injected platform capabilities.
//!
//! The framework never talks to an OS directly. Certificate stores, chain
//! building, logon and Kerberos context setup are reached through these
//! traits, bundled into [`PlatformServices`] at construction time.
//!
//! Handles ([`StoreHandle`], [`CredentialHandle`]) are RAII guards:
//! implementations release the native resource in `Drop`, so every exit
//! path, including `?` and panics, releases it.

use std::fmt;
use std::sync::Arc;

use secrecy::SecretString;
use time::OffsetDateTime;

use crate::certificate::{Certificate, Thumbprint};
use crate::error::{CredentialRejected, PlatformError, UnwrapError};
use crate::keys::{SecurityKey, SymmetricKey};
use crate::models::{ImpersonationLevel, RevocationMode, RevocationScope, StoreName};

/// Source of "now" for every time check.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(OffsetDateTime);

impl FixedClock {
    #[must_use]
    pub const fn at(now: OffsetDateTime) -> Self {
        Self(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// An open certificate store. Closing happens on drop.
pub trait StoreHandle {
    fn contains(&self, thumbprint: &Thumbprint) -> bool;
}

pub trait CertificateStore: Send + Sync {
    /// Opens `store` for reading.
    ///
    /// # Errors
    /// Returns [`PlatformError`] if the store cannot be opened.
    fn open(&self, store: StoreName) -> Result<Box<dyn StoreHandle + '_>, PlatformError>;
}

/// Parameters for one chain build.
#[derive(Debug, Clone)]
pub struct ChainPolicy {
    /// Required extended key usage OIDs; empty means any.
    pub application_policies: Vec<String>,
    pub certificate_policies: Vec<String>,
    pub revocation_mode: RevocationMode,
    pub revocation_scope: RevocationScope,
    /// Intermediates supplied alongside the leaf.
    pub extra_certificates: Vec<Arc<Certificate>>,
    /// Restricts acceptable anchors to this store instead of the root store.
    pub trust_anchor_store: Option<StoreName>,
    pub verification_time: OffsetDateTime,
}

/// Non-success status reported for a chain element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    NotTimeValid,
    Revoked,
    RevocationStatusUnknown,
    OfflineRevocation,
    UntrustedRoot,
    PartialChain,
    NotValidForUsage,
    InvalidPolicyConstraints,
    Cyclic,
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotTimeValid => "certificate is outside its validity period",
            Self::Revoked => "certificate is revoked",
            Self::RevocationStatusUnknown => "revocation status is unknown",
            Self::OfflineRevocation => "revocation server is offline",
            Self::UntrustedRoot => "chain terminates in an untrusted root",
            Self::PartialChain => "chain could not be built to a root",
            Self::NotValidForUsage => "certificate is not valid for the requested usage",
            Self::InvalidPolicyConstraints => "certificate policy constraints are not met",
            Self::Cyclic => "chain contains a cycle",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChainElement {
    pub certificate: Arc<Certificate>,
    pub status: Vec<ChainStatus>,
}

/// Result of a completed chain build.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    /// Leaf first, anchor last.
    pub elements: Vec<ChainElement>,
    /// Chain-wide status.
    pub status: Vec<ChainStatus>,
}

impl ChainOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_empty() && self.elements.iter().all(|e| e.status.is_empty())
    }

    /// Human readable reasons for every non-success status, deduplicated.
    #[must_use]
    pub fn status_reasons(&self) -> Vec<String> {
        let mut reasons: Vec<String> = Vec::new();
        let all = self
            .status
            .iter()
            .chain(self.elements.iter().flat_map(|e| e.status.iter()));
        for status in all {
            let reason = status.to_string();
            if !reasons.contains(&reason) {
                reasons.push(reason);
            }
        }
        reasons
    }
}

pub trait ChainBuilder: Send + Sync {
    /// Builds a chain for `leaf` under `policy`.
    ///
    /// A chain that was built but is not trusted is reported through
    /// [`ChainOutcome::status`], not as an error.
    ///
    /// # Errors
    /// Returns [`PlatformError`] if chain building itself fails.
    fn build_chain(
        &self,
        leaf: &Certificate,
        policy: &ChainPolicy,
    ) -> Result<ChainOutcome, PlatformError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMembership {
    pub sid: String,
    pub name: Option<String>,
}

/// Authenticated platform account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformIdentity {
    pub sid: String,
    pub name: String,
    /// e.g. `"Kerberos"`, `"NTLM"`, `"Basic"`.
    pub authentication_type: String,
    pub groups: Vec<GroupMembership>,
}

pub trait PlatformLogon: Send + Sync {
    /// # Errors
    /// Returns [`PlatformError`] carrying the native logon status on failure.
    fn logon_user(
        &self,
        user_name: &str,
        password: &SecretString,
    ) -> Result<PlatformIdentity, PlatformError>;

    /// Accepts a service ticket presented by a client.
    ///
    /// # Errors
    /// Returns [`PlatformError`] if the ticket is rejected.
    fn accept_ticket(
        &self,
        ticket: &[u8],
        channel_binding: Option<&[u8]>,
    ) -> Result<PlatformIdentity, PlatformError>;

    /// Logs on the account a certificate maps to, without a password.
    ///
    /// # Errors
    /// Returns [`PlatformError`] if no account maps to the certificate.
    fn logon_certificate(&self, certificate: &Certificate)
    -> Result<PlatformIdentity, PlatformError>;
}

/// Explicit credential used to acquire an outbound Kerberos handle.
pub struct NetworkCredential {
    pub user_name: String,
    pub domain: Option<String>,
    pub password: SecretString,
}

impl fmt::Debug for NetworkCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredential")
            .field("user_name", &self.user_name)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Service ticket produced by context initialization.
#[derive(Debug, Clone)]
pub struct KerberosGrant {
    pub ticket: Vec<u8>,
    pub session_key: Option<SymmetricKey>,
    pub valid_from: OffsetDateTime,
    pub valid_to: OffsetDateTime,
}

/// Acquired outbound credentials. Released on drop.
pub trait CredentialHandle {
    /// # Errors
    /// Returns [`PlatformError`] if the target is unknown or credentials are refused.
    fn initialize_context(
        &self,
        service_principal_name: &str,
        level: ImpersonationLevel,
        channel_binding: Option<&[u8]>,
    ) -> Result<KerberosGrant, PlatformError>;
}

pub trait SecurityPackage: Send + Sync {
    /// Acquires outbound credentials; `None` uses the process identity.
    ///
    /// # Errors
    /// Returns [`PlatformError`] if no credentials are available.
    fn acquire_credentials(
        &self,
        credential: Option<&NetworkCredential>,
    ) -> Result<Box<dyn CredentialHandle + '_>, PlatformError>;
}

/// Application-supplied password check for custom username mode.
pub trait PasswordValidator: Send + Sync {
    /// # Errors
    /// Returns [`CredentialRejected`] if the pair is not valid.
    fn validate(&self, user_name: &str, password: &SecretString) -> Result<(), CredentialRejected>;
}

pub trait KeyUnwrapper: Send + Sync {
    /// Unwraps `wrapped` under `unwrapping_key` using `algorithm`.
    ///
    /// # Errors
    /// Returns [`UnwrapError`] if the algorithm is unsupported or the data is corrupt.
    fn unwrap_key(
        &self,
        algorithm: &str,
        unwrapping_key: &SecurityKey,
        wrapped: &[u8],
    ) -> Result<SymmetricKey, UnwrapError>;
}

/// What the hosting environment allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvironmentCapabilities {
    pub network: bool,
    pub store_write: bool,
}

impl EnvironmentCapabilities {
    #[must_use]
    pub fn allows_online_revocation(self) -> bool {
        self.network && self.store_write
    }
}

/// Every platform capability the framework consumes.
#[derive(Clone)]
pub struct PlatformServices {
    pub clock: Arc<dyn Clock>,
    pub stores: Arc<dyn CertificateStore>,
    pub chain_builder: Arc<dyn ChainBuilder>,
    pub logon: Arc<dyn PlatformLogon>,
    pub security_package: Arc<dyn SecurityPackage>,
    pub key_unwrapper: Arc<dyn KeyUnwrapper>,
    pub capabilities: EnvironmentCapabilities,
}

impl fmt::Debug for PlatformServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformServices")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
