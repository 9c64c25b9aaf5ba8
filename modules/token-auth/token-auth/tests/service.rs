#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use time::OffsetDateTime;

use sectoken_claims::{ClaimValue, Issuer, Right, claim_types};
use static_platform_plugin::{StaticPlatform, StaticPlatformPluginConfig, codes};
use token_auth::{TokenAuthConfig, TokenAuthService, UsernameMode};
use token_auth_sdk::platform::{GroupMembership, PasswordValidator, PlatformIdentity};
use token_auth_sdk::{
    ConfigError, CredentialKind, CredentialRejected, ImpersonationLevel, KerberosRole,
    RevocationMode, SecurityToken, SymmetricKey, SymmetricToken, TimeViolation, TokenProvider,
    TrustMode, UserNameToken, ValidationError, WindowsToken, X509Token,
};

const PLATFORM: &str = r#"
fixed_time: 1700000000
process_account: "CORP\\svc-web"
service_principals: ["HTTP/api.corp.example"]
certificates:
  - name: root
    subject: "CN=Corp Root"
    not_before: 1600000000
    not_after: 1900000000
  - name: issuing
    subject: "CN=Corp Issuing CA"
    issuer: "CN=Corp Root"
    not_before: 1600000000
    not_after: 1900000000
  - name: alice
    subject: "CN=alice"
    issuer: "CN=Corp Issuing CA"
    not_before: 1650000000
    not_after: 1750000000
    application_policies: ["1.3.6.1.5.5.7.3.2"]
    upn: "alice@corp.example"
  - name: expired
    subject: "CN=old"
    issuer: "CN=Corp Issuing CA"
    not_before: 1500000000
    not_after: 1600000000
  - name: other-root
    subject: "CN=Partner Root"
    not_before: 1600000000
    not_after: 1900000000
  - name: partner
    subject: "CN=partner"
    issuer: "CN=Partner Root"
    not_before: 1650000000
    not_after: 1750000000
  - name: pinned
    subject: "CN=pinned"
    issuer: "CN=Unknown CA"
    not_before: 1650000000
    not_after: 1750000000
  - name: stray
    subject: "CN=stray"
    issuer: "CN=Unknown CA"
    not_before: 1650000000
    not_after: 1750000000
stores:
  trusted_people: [pinned]
  root: [root, other-root]
  nt_auth: [root]
accounts:
  - sid: "S-1-5-21-1-1001"
    name: "CORP\\alice"
    password: "correct horse"
    groups:
      - sid: "S-1-5-21-1-513"
        name: "Domain Users"
    certificates: [alice]
  - sid: "S-1-5-21-1-1002"
    name: "CORP\\svc-web"
    password: "s3rvice"
"#;

fn platform() -> StaticPlatform {
    let cfg: StaticPlatformPluginConfig = serde_saphyr::from_str(PLATFORM).unwrap();
    StaticPlatform::from_config(&cfg).unwrap()
}

fn fixed_now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
}

fn service(platform: &StaticPlatform, config: TokenAuthConfig) -> TokenAuthService {
    TokenAuthService::builder(config, platform.services())
        .build()
        .unwrap()
}

fn x509(platform: &StaticPlatform, name: &str) -> SecurityToken {
    X509Token::new(platform.certificate(name).unwrap()).into()
}

fn password(user: &str, password: &str) -> SecurityToken {
    UserNameToken::new(user, SecretString::from(password.to_owned())).into()
}

fn sid_of(set: &sectoken_claims::ClaimSet) -> Option<String> {
    set.find_claims(claim_types::SID, Some(Right::Identity))
        .next()
        .and_then(|c| c.value().as_str())
        .map(str::to_owned)
}

#[test]
fn chain_trusted_certificate_yields_thumbprint_identity() {
    let platform = platform();
    let service = service(&platform, TokenAuthConfig::default());
    let alice = platform.certificate("alice").unwrap();

    let policies = service.validate(&x509(&platform, "alice")).unwrap();
    assert_eq!(policies.len(), 1);

    let set = policies[0].primary_claim_set().unwrap();
    let identity = set.identity_claim().unwrap();
    assert_eq!(identity.claim_type(), claim_types::THUMBPRINT);
    assert_eq!(
        identity.value(),
        &ClaimValue::Thumbprint(*alice.thumbprint().as_bytes())
    );
    assert_eq!(
        set.find_claims(claim_types::UPN, None)
            .next()
            .and_then(|c| c.value().as_str()),
        Some("alice@corp.example")
    );
    assert_eq!(policies[0].window().valid_from(), alice.not_before());
    assert_eq!(policies[0].window().valid_to(), alice.not_after());
}

#[test]
fn chain_failure_reports_status_reasons() {
    let platform = platform();
    let service = service(&platform, TokenAuthConfig::default());

    let err = service.validate(&x509(&platform, "stray")).unwrap_err();
    let ValidationError::ChainBuildFailure { status_reasons } = err else {
        panic!("expected a chain failure");
    };
    assert_eq!(status_reasons.len(), 1);
}

#[test]
fn explicit_trust_checks_time_before_store_membership() {
    let platform = platform();
    let config = TokenAuthConfig {
        trust_mode: TrustMode::Explicit,
        ..TokenAuthConfig::default()
    };
    let service = service(&platform, config);

    let err = service.validate(&x509(&platform, "expired")).unwrap_err();
    assert!(matches!(
        err,
        ValidationError::TimeInvalid {
            violation: TimeViolation::Expired { .. },
            ..
        }
    ));

    let partner = platform.certificate("partner").unwrap();
    assert_eq!(
        service.evaluate_certificate(&partner, &[]).unwrap_err(),
        ValidationError::NotInTrustedStore {
            thumbprint: partner.thumbprint(),
        }
    );

    assert!(service.validate(&x509(&platform, "pinned")).is_ok());
    assert_eq!(platform.stats().store_handles_open, 0);
}

#[test]
fn either_mode_falls_back_to_chain() {
    let platform = platform();
    let config = TokenAuthConfig {
        trust_mode: TrustMode::Either,
        ..TokenAuthConfig::default()
    };
    let service = service(&platform, config);

    // Pinned has no chain; alice is not pinned.
    let pinned = platform.certificate("pinned").unwrap();
    assert!(service.evaluate_certificate(&pinned, &[]).is_ok());
    let alice = platform.certificate("alice").unwrap();
    assert!(service.evaluate_certificate(&alice, &[]).is_ok());

    let stray = platform.certificate("stray").unwrap();
    let err = service.evaluate_certificate(&stray, &[]).unwrap_err();
    let ValidationError::TrustFailures { explicit, chain } = err else {
        panic!("expected both trust strategies to fail");
    };
    assert!(matches!(*explicit, ValidationError::NotInTrustedStore { .. }));
    assert!(matches!(*chain, ValidationError::ChainBuildFailure { .. }));
}

#[test]
fn trust_none_accepts_anything() {
    let platform = platform();
    let config = TokenAuthConfig {
        trust_mode: TrustMode::None,
        ..TokenAuthConfig::default()
    };
    let service = service(&platform, config);

    assert!(service.validate(&x509(&platform, "stray")).is_ok());
    assert_eq!(platform.stats().chain_builds, 0);
}

#[test]
fn certificate_mapping_adds_account_claims() {
    let platform = platform();
    let config = TokenAuthConfig {
        map_certificates_to_accounts: true,
        ..TokenAuthConfig::default()
    };
    let service = service(&platform, config);

    let policies = service.validate(&x509(&platform, "alice")).unwrap();
    let sets = policies[0].claim_sets();
    assert_eq!(sets.len(), 2);
    assert_eq!(sid_of(&sets[1]).as_deref(), Some("S-1-5-21-1-1001"));
    assert_eq!(
        sets[1]
            .find_claims(claim_types::AUTHENTICATION_METHOD, None)
            .next()
            .and_then(|c| c.value().as_str()),
        Some("Certificate")
    );
    assert_eq!(platform.stats().certificate_logons, 1);
}

#[test]
fn certificate_mapping_requires_enterprise_anchor() {
    let platform = platform();
    let config = TokenAuthConfig {
        map_certificates_to_accounts: true,
        ..TokenAuthConfig::default()
    };
    let service = service(&platform, config);

    // Partner chains to a trusted root that is not an enterprise anchor.
    let err = service.validate(&x509(&platform, "partner")).unwrap_err();
    assert!(matches!(err, ValidationError::ChainBuildFailure { .. }));
    assert_eq!(platform.stats().certificate_logons, 0);
}

#[test]
fn platform_password_logon_emits_group_claims() {
    let platform = platform();
    let service = service(&platform, TokenAuthConfig::default());

    let policies = service
        .validate(&password("CORP\\alice", "correct horse"))
        .unwrap();
    let set = policies[0].primary_claim_set().unwrap();
    assert_eq!(sid_of(set).as_deref(), Some("S-1-5-21-1-1001"));
    assert_eq!(set.find_claims(claim_types::GROUP_SID, None).count(), 1);
    assert_eq!(policies[0].window().valid_from(), fixed_now());

    let without_groups = self::service(
        &platform,
        TokenAuthConfig {
            include_group_claims: false,
            ..TokenAuthConfig::default()
        },
    );
    let policies = without_groups
        .validate(&password("CORP\\alice", "correct horse"))
        .unwrap();
    let set = policies[0].primary_claim_set().unwrap();
    assert_eq!(set.find_claims(claim_types::GROUP_SID, None).count(), 0);
}

#[test]
fn wrong_password_is_rejected() {
    let platform = platform();
    let service = service(&platform, TokenAuthConfig::default());

    let err = service
        .validate(&password("CORP\\alice", "Tr0ub4dor&3"))
        .unwrap_err();
    let ValidationError::InvalidCredentials { user, reason } = err else {
        panic!("expected rejected credentials");
    };
    assert_eq!(user, "CORP\\alice");
    assert!(reason.contains(&codes::ERROR_LOGON_FAILURE.to_string()));
    assert!(!reason.contains("Tr0ub4dor"));
}

struct SharedSecret(&'static str);

impl PasswordValidator for SharedSecret {
    fn validate(&self, _user_name: &str, password: &SecretString) -> Result<(), CredentialRejected> {
        if password.expose_secret() == self.0 {
            Ok(())
        } else {
            Err(CredentialRejected {
                reason: "password does not match".to_owned(),
            })
        }
    }
}

#[test]
fn custom_username_mode_uses_the_validator() {
    let platform = platform();
    let config = TokenAuthConfig {
        username_mode: UsernameMode::Custom,
        ..TokenAuthConfig::default()
    };

    let missing = TokenAuthService::builder(config.clone(), platform.services()).build();
    assert_eq!(missing.err(), Some(ConfigError::MissingPasswordValidator));

    let service = TokenAuthService::builder(config, platform.services())
        .password_validator(Arc::new(SharedSecret("open sesame")))
        .build()
        .unwrap();

    let policies = service.validate(&password("carol", "open sesame")).unwrap();
    let set = policies[0].primary_claim_set().unwrap();
    assert_eq!(
        set.identity_claim().and_then(|c| c.value().as_str()),
        Some("carol")
    );
    assert!(matches!(set.issuer(), Issuer::ClaimSet(issuer) if issuer.is_system()));
    assert_eq!(platform.stats().password_logons, 0);

    let err = service.validate(&password("carol", "guess")).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidCredentials { .. }));
}

#[test]
fn inconsistent_configuration_is_refused() {
    let platform = platform();

    let online = TokenAuthConfig {
        revocation_mode: RevocationMode::Online,
        ..TokenAuthConfig::default()
    };
    let err = TokenAuthService::builder(online.clone(), platform.services())
        .build()
        .err();
    assert_eq!(err, Some(ConfigError::OnlineRevocationUnavailable));

    let mut connected: StaticPlatformPluginConfig = serde_saphyr::from_str(PLATFORM).unwrap();
    connected.capabilities.network = true;
    connected.capabilities.store_write = true;
    let connected = StaticPlatform::from_config(&connected).unwrap();
    assert!(
        TokenAuthService::builder(online, connected.services())
            .build()
            .is_ok()
    );

    let no_capacity = TokenAuthConfig {
        detect_replays: true,
        replay_cache_capacity: 0,
        ..TokenAuthConfig::default()
    };
    let err = TokenAuthService::builder(no_capacity, platform.services())
        .build()
        .err();
    assert!(matches!(
        err,
        Some(ConfigError::Invalid {
            field: "replay_cache_capacity",
            ..
        })
    ));
}

#[test]
fn kerberos_ticket_round_trip() {
    let platform = platform();
    let config = TokenAuthConfig {
        service_principal_name: Some("HTTP/api.corp.example".to_owned()),
        impersonation_level: ImpersonationLevel::Impersonation,
        ..TokenAuthConfig::default()
    };
    let service = service(&platform, config);
    let provider = service
        .kerberos_provider(None, Some(b"tls-unique".to_vec()))
        .unwrap();

    let requested = provider.get_token().unwrap();
    // Outbound tokens are not something this side validates.
    assert!(matches!(
        service.validate(&requested).unwrap_err(),
        ValidationError::UnsupportedCredential {
            authenticator: "token-auth-service",
            kind: CredentialKind::Kerberos,
        }
    ));

    let SecurityToken::Kerberos(mut ticket) = requested else {
        panic!("provider returned a non-Kerberos token");
    };
    assert_eq!(ticket.id, ticket.correlation_id.to_string());
    assert_eq!(ticket.valid_from, Some(fixed_now()));
    ticket.role = KerberosRole::Receiver;

    let policies = service.validate(&SecurityToken::Kerberos(ticket.clone())).unwrap();
    let set = policies[0].primary_claim_set().unwrap();
    assert_eq!(sid_of(set).as_deref(), Some("S-1-5-21-1-1002"));
    assert_eq!(
        policies[0].window().valid_to(),
        fixed_now() + time::Duration::hours(10)
    );

    ticket.channel_binding = Some(b"other-channel".to_vec());
    assert_eq!(
        service.validate(&SecurityToken::Kerberos(ticket)).unwrap_err(),
        ValidationError::PlatformExchangeFailure {
            operation: "accept_ticket".to_owned(),
            native_code: codes::SEC_E_BAD_BINDINGS,
        }
    );

    let stats = platform.stats();
    assert_eq!(stats.credential_handles_acquired, 1);
    assert_eq!(stats.credential_handles_open, 0);
    assert_eq!(stats.ticket_acceptances, 2);
}

#[test]
fn kerberos_provider_validates_its_configuration() {
    let platform = platform();

    let delegation = service(
        &platform,
        TokenAuthConfig {
            service_principal_name: Some("HTTP/api.corp.example".to_owned()),
            impersonation_level: ImpersonationLevel::Delegation,
            ..TokenAuthConfig::default()
        },
    );
    assert_eq!(
        delegation.kerberos_provider(None, None).err(),
        Some(ConfigError::ImpersonationLevelOutOfRange {
            level: ImpersonationLevel::Delegation,
        })
    );

    let no_target = service(&platform, TokenAuthConfig::default());
    assert_eq!(
        no_target.kerberos_provider(None, None).err(),
        Some(ConfigError::EmptyServicePrincipalName)
    );

    let blank_target = service(
        &platform,
        TokenAuthConfig {
            service_principal_name: Some(String::new()),
            ..TokenAuthConfig::default()
        },
    );
    assert_eq!(
        blank_target.kerberos_provider(None, None).err(),
        Some(ConfigError::EmptyServicePrincipalName)
    );
    assert_eq!(platform.stats().credential_handles_acquired, 0);
}

#[test]
fn kerberos_provider_surfaces_platform_refusals() {
    let platform = platform();
    let service = service(
        &platform,
        TokenAuthConfig {
            service_principal_name: Some("HTTP/unknown.corp.example".to_owned()),
            ..TokenAuthConfig::default()
        },
    );

    let provider = service.kerberos_provider(None, None).unwrap();
    let err = provider.get_token().unwrap_err();
    let token_auth_sdk::ProviderError::Platform(platform_err) = err else {
        panic!("expected a platform refusal");
    };
    assert_eq!(platform_err.native_code, codes::SEC_E_TARGET_UNKNOWN);
    assert_eq!(platform.stats().credential_handles_open, 0);
}

#[test]
fn windows_identity_is_accepted_within_its_window() {
    let platform = platform();
    let service = service(&platform, TokenAuthConfig::default());
    let identity = PlatformIdentity {
        sid: "S-1-5-21-1-1001".to_owned(),
        name: "CORP\\alice".to_owned(),
        authentication_type: "Negotiate".to_owned(),
        groups: vec![GroupMembership {
            sid: "S-1-5-21-1-513".to_owned(),
            name: None,
        }],
    };

    let now = fixed_now();
    let token = WindowsToken::new(identity.clone(), now, now + time::Duration::hours(1));
    let policies = service.validate(&token.into()).unwrap();
    assert_eq!(
        sid_of(policies[0].primary_claim_set().unwrap()).as_deref(),
        Some("S-1-5-21-1-1001")
    );

    let inverted = WindowsToken::new(identity, now, now - time::Duration::hours(1));
    assert!(matches!(
        service.validate(&inverted.into()).unwrap_err(),
        ValidationError::TimeInvalid { .. }
    ));
}

#[test]
fn unsupported_credentials_are_refused_by_the_service() {
    let platform = platform();
    let service = service(&platform, TokenAuthConfig::default());

    let token = SymmetricToken::new("session-key", SymmetricKey::new(vec![7; 32]));
    assert_eq!(
        service.validate(&token.into()).unwrap_err(),
        ValidationError::UnsupportedCredential {
            authenticator: "token-auth-service",
            kind: CredentialKind::Symmetric,
        }
    );

    let names: Vec<_> = service.authenticators().iter().map(|a| a.name()).collect();
    assert_eq!(names, ["x509", "username", "kerberos", "windows", "assertion"]);
}

#[tokio::test]
async fn async_validation_completes_on_blocking_pool() {
    let platform = platform();
    let service = Arc::new(self::service(&platform, TokenAuthConfig::default()));

    let policies = tokio::time::timeout(
        Duration::from_secs(5),
        service.validate_async(x509(&platform, "alice")),
    )
    .await
    .expect("validation timed out")
    .unwrap();
    assert_eq!(policies.len(), 1);

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        service.validate_async(password("CORP\\alice", "nope")),
    )
    .await
    .expect("validation timed out")
    .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidCredentials { .. }));
}

#[test]
fn service_is_shared_across_threads() {
    let platform = platform();
    let service = self::service(&platform, TokenAuthConfig::default());

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..10 {
                    service
                        .validate(&password("CORP\\alice", "correct horse"))
                        .unwrap();
                    service.validate(&x509(&platform, "alice")).unwrap();
                }
            });
        }
    });

    let stats = platform.stats();
    assert_eq!(stats.password_logons, 40);
    assert_eq!(stats.chain_builds, 40);
    assert_eq!(stats.store_handles_open, 0);
}
