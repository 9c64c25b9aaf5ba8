#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Token authentication
//!
//! Implementations of the [`token_auth_sdk`] contracts:
//!
//! - [`CertificateTrustEvaluator`] - none, explicit-store, chain and either trust
//! - [`TokenKeyResolver`] / [`AggregateKeyResolver`] - key reference resolution,
//!   including encrypted-key chains
//! - username, Windows, X.509 and Kerberos authenticators
//! - [`AssertionValidator`] - signed multi-statement assertions
//! - [`KerberosTokenProvider`] - outbound service tickets
//! - [`TokenAuthService`] - configuration-driven wiring and dispatch
//!
//! Every blocking operation has an `*_async` variant returning a
//! [`PendingOperation`].

pub mod config;
pub mod domain;

pub use config::{TokenAuthConfig, UsernameMode};
pub use domain::account_mapping::CertificateAccountMapper;
pub use domain::assertion::AssertionValidator;
pub use domain::authenticators::{
    KerberosAuthenticator, UserNameAuthenticator, WindowsAuthenticator, X509Authenticator,
};
pub use domain::kerberos_provider::KerberosTokenProvider;
pub use domain::keys::{AggregateKeyResolver, MAX_KEY_RESOLUTION_DEPTH, TokenKeyResolver};
pub use domain::pending::{OperationFault, PendingOperation};
pub use domain::replay::ReplayCache;
pub use domain::service::{TokenAuthService, TokenAuthServiceBuilder};
pub use domain::trust::{CertificateTrustEvaluator, ChainSettings};
