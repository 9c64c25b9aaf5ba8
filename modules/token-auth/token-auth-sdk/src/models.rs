//! Configuration enums shared by authenticators, evaluators and plugins.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a certificate is judged trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustMode {
    /// Every certificate is accepted.
    None,
    /// Membership in the trusted-people store, absence from the disallowed store.
    Explicit,
    /// A chain to a trust anchor that satisfies the chain policy.
    #[default]
    Chain,
    /// `Explicit` first, `Chain` only if `Explicit` fails.
    Either,
}

/// Revocation checking performed while building a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationMode {
    NoCheck,
    /// Cached revocation data only.
    #[default]
    Offline,
    /// May fetch revocation data over the network.
    Online,
}

/// Which chain elements are checked for revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationScope {
    EndEntityOnly,
    #[default]
    EntireChain,
}

/// When an assertion's audience restriction is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceMode {
    Never,
    #[default]
    Always,
    /// Only for bearer assertions, i.e. those without a proof-of-possession key.
    BearerKeyOnly,
}

/// Impersonation level requested for a Kerberos ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpersonationLevel {
    Anonymous,
    #[default]
    Identification,
    Impersonation,
    Delegation,
}

impl fmt::Display for ImpersonationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Anonymous => "anonymous",
            Self::Identification => "identification",
            Self::Impersonation => "impersonation",
            Self::Delegation => "delegation",
        })
    }
}

/// Platform certificate stores consulted by trust evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreName {
    TrustedPeople,
    Disallowed,
    /// Trust anchors for general chain building.
    Root,
    /// Restricted anchors accepted for certificate-to-account mapping.
    NtAuth,
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TrustedPeople => "trusted_people",
            Self::Disallowed => "disallowed",
            Self::Root => "root",
            Self::NtAuth => "nt_auth",
        })
    }
}

/// Discriminant of [`crate::SecurityToken`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    UserName,
    X509,
    Kerberos,
    Windows,
    Assertion,
    Symmetric,
    WrappedKey,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserName => "username",
            Self::X509 => "x509",
            Self::Kerberos => "kerberos",
            Self::Windows => "windows",
            Self::Assertion => "assertion",
            Self::Symmetric => "symmetric",
            Self::WrappedKey => "wrapped-key",
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_from_snake_case() {
        let mode: TrustMode = serde_saphyr::from_str("either").unwrap();
        assert_eq!(mode, TrustMode::Either);

        let audience: AudienceMode = serde_saphyr::from_str("bearer_key_only").unwrap();
        assert_eq!(audience, AudienceMode::BearerKeyOnly);

        let scope: RevocationScope = serde_saphyr::from_str("end_entity_only").unwrap();
        assert_eq!(scope, RevocationScope::EndEntityOnly);
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let parsed: Result<ImpersonationLevel, _> = serde_saphyr::from_str("full_control");
        assert!(parsed.is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        assert_eq!(TrustMode::default(), TrustMode::Chain);
        assert_eq!(RevocationMode::default(), RevocationMode::Offline);
        assert_eq!(AudienceMode::default(), AudienceMode::Always);
        assert_eq!(ImpersonationLevel::default(), ImpersonationLevel::Identification);
    }
}
