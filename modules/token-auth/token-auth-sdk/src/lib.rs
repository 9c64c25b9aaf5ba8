#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Token authentication SDK
//!
//! This crate provides the public contract of the `token-auth` module:
//!
//! - [`TokenAuthenticator`] - validates one credential category into policies
//! - [`TokenProvider`] - acquires, renews and cancels credentials
//! - [`KeyResolver`] - resolves [`KeyReference`]s to keys or owning tokens
//! - [`SecurityToken`] - the credential union consumed by authenticators
//! - [`platform`] - injected platform capabilities (stores, chains, logon)
//! - [`ValidationError`] and friends - the failure taxonomy
//!
//! ## Usage
//!
//! ```ignore
//! use token_auth_sdk::{SecurityToken, TokenAuthenticator};
//!
//! let policies = authenticator.validate(&token)?;
//! for policy in &policies {
//!     for set in policy.claim_sets() {
//!         tracing::debug!(claims = set.len(), "validated claim set");
//!     }
//! }
//! ```

pub mod api;
pub mod assertion;
pub mod certificate;
pub mod error;
pub mod keys;
pub mod models;
pub mod platform;
pub mod token;

// Re-export main types at crate root
pub use api::{KeyResolver, TokenAuthenticator, TokenProvider};
pub use assertion::{
    Assertion, AssertionSignature, Attribute, AudienceRestriction, Conditions, Decision,
    SignerReference, Statement, StatementSubject,
};
pub use certificate::{Certificate, CertificateBuilder, PublicKey, Thumbprint};
pub use error::{
    AudienceFailure, ConfigError, CredentialRejected, PlatformError, ProviderError,
    ResolutionError, TimeViolation, UnwrapError, ValidationError,
};
pub use keys::{KeyReference, SecurityKey, SymmetricKey};
pub use models::{
    AudienceMode, CredentialKind, ImpersonationLevel, RevocationMode, RevocationScope, StoreName,
    TrustMode,
};
pub use token::{
    KerberosRole, KerberosToken, SecurityToken, SymmetricToken, UserNameToken, WindowsToken,
    WrappedKeyToken, X509Token,
};

pub use sectoken_claims as claims;
