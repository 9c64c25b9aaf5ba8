use std::time::Duration;

use serde::Deserialize;

use token_auth_sdk::{AudienceMode, ImpersonationLevel, RevocationMode, RevocationScope, TrustMode};

/// How username/password credentials are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsernameMode {
    /// Password logon against the platform; yields platform account claims.
    #[default]
    Platform,
    /// An application-supplied password validator; yields a name claim.
    Custom,
}

/// Token authentication configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenAuthConfig {
    /// Certificate trust strategy.
    pub trust_mode: TrustMode,

    pub revocation_mode: RevocationMode,

    pub revocation_scope: RevocationScope,

    /// Extended key usage OIDs every chain must satisfy.
    pub application_policies: Vec<String>,

    pub certificate_policies: Vec<String>,

    /// When assertions must carry a matching audience restriction.
    pub audience_mode: AudienceMode,

    /// URIs accepted in assertion audience restrictions.
    pub allowed_audiences: Vec<String>,

    /// Tolerance applied to assertion time conditions.
    #[serde(with = "humantime_serde")]
    pub max_clock_skew: Duration,

    /// Emit a claim per platform group the account belongs to.
    pub include_group_claims: bool,

    /// Also log certificate holders on as the platform account they map to.
    pub map_certificates_to_accounts: bool,

    pub username_mode: UsernameMode,

    /// Reject assertions whose id was already seen within their lifetime.
    pub detect_replays: bool,

    /// Maximum number of assertion ids remembered for replay detection.
    pub replay_cache_capacity: usize,

    /// Target for outbound Kerberos tokens.
    pub service_principal_name: Option<String>,

    pub impersonation_level: ImpersonationLevel,
}

impl Default for TokenAuthConfig {
    fn default() -> Self {
        Self {
            trust_mode: TrustMode::default(),
            revocation_mode: RevocationMode::default(),
            revocation_scope: RevocationScope::default(),
            application_policies: Vec::new(),
            certificate_policies: Vec::new(),
            audience_mode: AudienceMode::default(),
            allowed_audiences: Vec::new(),
            max_clock_skew: Duration::from_secs(5 * 60),
            include_group_claims: true,
            map_certificates_to_accounts: false,
            username_mode: UsernameMode::default(),
            detect_replays: false,
            replay_cache_capacity: 10_000,
            service_principal_name: None,
            impersonation_level: ImpersonationLevel::default(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_applied() {
        let parsed: Result<TokenAuthConfig, _> = serde_saphyr::from_str("{}");
        let cfg = match parsed {
            Ok(cfg) => cfg,
            Err(e) => panic!("failed to parse config: {e}"),
        };

        assert_eq!(cfg.trust_mode, TrustMode::Chain);
        assert_eq!(cfg.revocation_mode, RevocationMode::Offline);
        assert_eq!(cfg.audience_mode, AudienceMode::Always);
        assert_eq!(cfg.max_clock_skew, Duration::from_secs(300));
        assert!(cfg.include_group_claims);
        assert!(!cfg.detect_replays);
        assert_eq!(cfg.username_mode, UsernameMode::Platform);
    }

    #[test]
    fn config_parses_human_readable_skew() {
        let yaml = r#"
trust_mode: either
audience_mode: bearer_key_only
allowed_audiences:
  - "https://rp.example.com/"
max_clock_skew: "90s"
username_mode: custom
detect_replays: true
replay_cache_capacity: 16
service_principal_name: "HTTP/rp.example.com"
impersonation_level: impersonation
"#;

        let cfg: TokenAuthConfig = match serde_saphyr::from_str(yaml) {
            Ok(cfg) => cfg,
            Err(e) => panic!("failed to parse config: {e}"),
        };

        assert_eq!(cfg.trust_mode, TrustMode::Either);
        assert_eq!(cfg.max_clock_skew, Duration::from_secs(90));
        assert_eq!(cfg.allowed_audiences.len(), 1);
        assert_eq!(cfg.username_mode, UsernameMode::Custom);
        assert_eq!(cfg.replay_cache_capacity, 16);
        assert_eq!(
            cfg.service_principal_name.as_deref(),
            Some("HTTP/rp.example.com")
        );
        assert_eq!(cfg.impersonation_level, ImpersonationLevel::Impersonation);
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let yaml = r"
trust_mode: chain
trust_everything: true
";
        let parsed: Result<TokenAuthConfig, _> = serde_saphyr::from_str(yaml);
        assert!(parsed.is_err());
    }
}
