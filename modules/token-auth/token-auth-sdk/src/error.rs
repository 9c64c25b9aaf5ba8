//! Failure taxonomy.
//!
//! No variant carries key bytes or passwords; they identify the failing
//! object by id, name, thumbprint or reference shape only.

use time::OffsetDateTime;

use crate::certificate::Thumbprint;
use crate::models::{CredentialKind, ImpersonationLevel};

/// Which side of a validity window was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimeViolation {
    #[error("not valid before {not_before} (now {now})")]
    NotYetValid {
        not_before: OffsetDateTime,
        now: OffsetDateTime,
    },
    #[error("expired at {expired_at} (now {now})")]
    Expired {
        expired_at: OffsetDateTime,
        now: OffsetDateTime,
    },
}

/// Why an audience restriction was not satisfied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudienceFailure {
    #[error("no allowed audiences are configured")]
    NoAllowedAudiences,
    #[error("assertion carries no audience restriction")]
    NoAudienceRestriction,
    #[error("none of the audiences {audiences:?} is allowed")]
    NoMatch { audiences: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `validate` was called for a credential the authenticator cannot handle.
    #[error("authenticator '{authenticator}' cannot validate {kind} credentials")]
    UnsupportedCredential {
        authenticator: &'static str,
        kind: CredentialKind,
    },

    #[error("assertion '{assertion_id}' is not signed")]
    MissingSignature { assertion_id: String },

    #[error("{subject} is outside its validity window: {violation}")]
    TimeInvalid {
        subject: String,
        violation: TimeViolation,
    },

    #[error("signer is not trusted: {reason}")]
    UntrustedSigner {
        reason: String,
        #[source]
        source: Option<Box<ValidationError>>,
    },

    #[error("audience restriction failed: {0}")]
    AudienceMismatch(AudienceFailure),

    #[error("certificate chain is not trusted: {}", status_reasons.join("; "))]
    ChainBuildFailure { status_reasons: Vec<String> },

    #[error("certificate {thumbprint} is not in the trusted people store")]
    NotInTrustedStore { thumbprint: Thumbprint },

    #[error("certificate {thumbprint} is in the disallowed store")]
    InDisallowedStore { thumbprint: Thumbprint },

    /// Both strategies of `TrustMode::Either` failed.
    #[error("certificate failed explicit trust ({explicit}) and chain trust ({chain})")]
    TrustFailures {
        explicit: Box<ValidationError>,
        chain: Box<ValidationError>,
    },

    #[error("credentials for '{user}' were rejected: {reason}")]
    InvalidCredentials { user: String, reason: String },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("platform operation '{operation}' failed with native code {native_code}")]
    PlatformExchangeFailure {
        operation: String,
        native_code: i32,
    },

    #[error("assertion '{assertion_id}' was already presented")]
    ReplayDetected { assertion_id: String },

    #[error("assertion from '{issuer}' has no id to check for replays")]
    MissingAssertionId { issuer: String },

    /// An authenticator produced no policies for a credential it accepted.
    #[error("authenticator '{authenticator}' produced no policies")]
    NoPolicies { authenticator: &'static str },

    /// Background work panicked or was aborted.
    #[error("operation faulted: {reason}")]
    OperationFaulted { reason: String },
}

impl From<PlatformError> for ValidationError {
    fn from(err: PlatformError) -> Self {
        Self::PlatformExchangeFailure {
            operation: err.operation,
            native_code: err.native_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("no key or token matches {reference}")]
    NotFound { reference: String },

    #[error("{reference} resolved to {found}, expected {expected}")]
    WrongKind {
        reference: String,
        expected: &'static str,
        found: String,
    },

    #[error("local id '{local_id}' cannot be resolved: collection is not local-id capable")]
    LocalIdDisabled { local_id: String },

    #[error("key reference nesting exceeds {max_depth}")]
    DepthExceeded { max_depth: usize },

    #[error("unwrapping with '{algorithm}' failed: {reason}")]
    UnwrapFailed { algorithm: String, reason: String },
}

/// Construction-time failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("impersonation level {level} is not allowed; use identification or impersonation")]
    ImpersonationLevelOutOfRange { level: ImpersonationLevel },

    #[error("online revocation requires network and certificate-store write access")]
    OnlineRevocationUnavailable,

    #[error("service principal name must not be empty")]
    EmptyServicePrincipalName,

    #[error("custom username mode requires a password validator")]
    MissingPasswordValidator,

    #[error("invalid configuration for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("token renewal is not supported")]
    RenewalNotSupported,

    #[error("token cancellation is not supported")]
    CancellationNotSupported,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("operation faulted: {reason}")]
    OperationFaulted { reason: String },
}

/// Failure reported by an injected platform capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed ({native_code}): {message}")]
pub struct PlatformError {
    pub operation: String,
    pub native_code: i32,
    pub message: String,
}

impl PlatformError {
    #[must_use]
    pub fn new(operation: impl Into<String>, native_code: i32, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            native_code,
            message: message.into(),
        }
    }
}

/// Rejection returned by a [`crate::platform::PasswordValidator`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct CredentialRejected {
    pub reason: String,
}

/// Failure returned by a [`crate::platform::KeyUnwrapper`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct UnwrapError {
    pub reason: String,
}
