use std::sync::Arc;

use sectoken_claims::AuthorizationPolicy;
use token_auth_sdk::platform::{NetworkCredential, PasswordValidator, PlatformServices};
use token_auth_sdk::{
    Certificate, ConfigError, KeyResolver, SecurityToken, TokenAuthenticator, ValidationError,
};

use crate::config::{TokenAuthConfig, UsernameMode};
use crate::domain::account_mapping::CertificateAccountMapper;
use crate::domain::assertion::AssertionValidator;
use crate::domain::authenticators::{
    KerberosAuthenticator, UserNameAuthenticator, WindowsAuthenticator, X509Authenticator,
};
use crate::domain::kerberos_provider::KerberosTokenProvider;
use crate::domain::keys::{AggregateKeyResolver, TokenKeyResolver};
use crate::domain::pending::PendingOperation;
use crate::domain::trust::{CertificateTrustEvaluator, ChainSettings};

const SERVICE_NAME: &str = "token-auth-service";

/// Builder for [`TokenAuthService`].
pub struct TokenAuthServiceBuilder {
    config: TokenAuthConfig,
    platform: PlatformServices,
    password_validator: Option<Arc<dyn PasswordValidator>>,
    signer_tokens: Vec<SecurityToken>,
    key_resolvers: Vec<Arc<dyn KeyResolver>>,
}

impl TokenAuthServiceBuilder {
    /// Validator used when `username_mode` is `custom`.
    #[must_use]
    pub fn password_validator(mut self, validator: Arc<dyn PasswordValidator>) -> Self {
        self.password_validator = Some(validator);
        self
    }

    /// Tokens that assertion signatures may reference.
    #[must_use]
    pub fn signer_tokens(mut self, tokens: Vec<SecurityToken>) -> Self {
        self.signer_tokens = tokens;
        self
    }

    /// Additional resolver, consulted after the signer tokens.
    #[must_use]
    pub fn key_resolver(mut self, resolver: Arc<dyn KeyResolver>) -> Self {
        self.key_resolvers.push(resolver);
        self
    }

    /// Wires every authenticator from the configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration is inconsistent or asks for
    /// capabilities the platform does not have.
    pub fn build(self) -> Result<TokenAuthService, ConfigError> {
        let Self {
            config,
            platform,
            password_validator,
            signer_tokens,
            key_resolvers,
        } = self;

        if config.detect_replays && config.replay_cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "replay_cache_capacity",
                reason: "must be positive when replay detection is enabled".to_owned(),
            });
        }
        let max_clock_skew = time::Duration::try_from(config.max_clock_skew).map_err(|e| {
            ConfigError::Invalid {
                field: "max_clock_skew",
                reason: e.to_string(),
            }
        })?;

        let settings = ChainSettings {
            application_policies: config.application_policies.clone(),
            certificate_policies: config.certificate_policies.clone(),
            revocation_mode: config.revocation_mode,
            revocation_scope: config.revocation_scope,
            trust_anchor_store: None,
        };
        let trust = CertificateTrustEvaluator::for_mode(config.trust_mode, &platform, settings.clone())?;
        let windows = WindowsAuthenticator::new(config.include_group_claims);
        let clock = Arc::clone(&platform.clock);

        let mut x509 = X509Authenticator::new(Arc::clone(&trust));
        if config.map_certificates_to_accounts {
            let mapper = CertificateAccountMapper::new(&platform, settings)?;
            x509 = x509.with_account_mapping(Arc::new(mapper), windows);
        }

        let username = match config.username_mode {
            UsernameMode::Platform => {
                UserNameAuthenticator::platform(Arc::clone(&platform.logon), windows, Arc::clone(&clock))
            }
            UsernameMode::Custom => {
                let validator = password_validator.ok_or(ConfigError::MissingPasswordValidator)?;
                UserNameAuthenticator::custom(validator, Arc::clone(&clock))
            }
        };

        let kerberos: Arc<dyn TokenAuthenticator> = Arc::new(KerberosAuthenticator::new(
            Arc::clone(&platform.logon),
            windows,
            Arc::clone(&clock),
        ));
        let windows_auth: Arc<dyn TokenAuthenticator> = Arc::new(windows);

        let signers: Arc<[Arc<dyn TokenAuthenticator>]> = Arc::from(vec![
            Arc::new(X509Authenticator::new(Arc::clone(&trust))) as Arc<dyn TokenAuthenticator>,
            Arc::clone(&windows_auth),
            Arc::clone(&kerberos),
        ]);

        let mut resolvers: Vec<Arc<dyn KeyResolver>> = vec![Arc::new(TokenKeyResolver::new(
            signer_tokens,
            true,
            Arc::clone(&platform.key_unwrapper),
        ))];
        resolvers.extend(key_resolvers);
        let resolver: Arc<dyn KeyResolver> = if resolvers.len() == 1 {
            resolvers.remove(0)
        } else {
            Arc::new(AggregateKeyResolver::new(resolvers))
        };

        let mut assertion = AssertionValidator::new(signers, resolver, Arc::clone(&clock))
            .with_audiences(config.audience_mode, config.allowed_audiences.clone())
            .with_max_clock_skew(max_clock_skew);
        if config.detect_replays {
            assertion = assertion.with_replay_detection(config.replay_cache_capacity);
        }

        let authenticators: Vec<Arc<dyn TokenAuthenticator>> = vec![
            Arc::new(x509),
            Arc::new(username),
            kerberos,
            windows_auth,
            Arc::new(assertion),
        ];

        tracing::debug!(
            trust_mode = ?config.trust_mode,
            username_mode = ?config.username_mode,
            max_clock_skew = %humantime::format_duration(config.max_clock_skew),
            detect_replays = config.detect_replays,
            "token authentication service built"
        );

        Ok(TokenAuthService {
            config,
            platform,
            trust,
            authenticators,
        })
    }
}

/// Entry point that routes each credential to the authenticator for its kind.
pub struct TokenAuthService {
    config: TokenAuthConfig,
    platform: PlatformServices,
    trust: Arc<CertificateTrustEvaluator>,
    authenticators: Vec<Arc<dyn TokenAuthenticator>>,
}

impl TokenAuthService {
    #[must_use]
    pub fn builder(config: TokenAuthConfig, platform: PlatformServices) -> TokenAuthServiceBuilder {
        TokenAuthServiceBuilder {
            config,
            platform,
            password_validator: None,
            signer_tokens: Vec::new(),
            key_resolvers: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TokenAuthConfig {
        &self.config
    }

    /// Authenticators in dispatch order.
    #[must_use]
    pub fn authenticators(&self) -> &[Arc<dyn TokenAuthenticator>] {
        &self.authenticators
    }

    /// Validates `token` with the first authenticator that accepts it.
    ///
    /// # Errors
    /// Returns [`ValidationError::UnsupportedCredential`] if no authenticator
    /// handles the credential, otherwise the authenticator's failure.
    #[tracing::instrument(skip_all, fields(kind = %token.kind(), token_id = token.id()))]
    pub fn validate(&self, token: &SecurityToken) -> Result<Vec<AuthorizationPolicy>, ValidationError> {
        let Some(authenticator) = self
            .authenticators
            .iter()
            .find(|authenticator| authenticator.can_validate(token))
        else {
            tracing::warn!("no authenticator accepts the credential");
            return Err(ValidationError::UnsupportedCredential {
                authenticator: SERVICE_NAME,
                kind: token.kind(),
            });
        };
        authenticator.validate(token)
    }

    /// [`Self::validate`] on the blocking pool.
    pub fn validate_async(
        self: &Arc<Self>,
        token: SecurityToken,
    ) -> PendingOperation<Vec<AuthorizationPolicy>, ValidationError> {
        let service = Arc::clone(self);
        PendingOperation::spawn(move || service.validate(&token))
    }

    /// Runs the configured trust strategy on its own.
    ///
    /// # Errors
    /// Returns the trust failure, see [`CertificateTrustEvaluator::evaluate`].
    pub fn evaluate_certificate(
        &self,
        certificate: &Certificate,
        extra_certificates: &[Arc<Certificate>],
    ) -> Result<(), ValidationError> {
        self.trust.evaluate(certificate, extra_certificates)
    }

    /// Provider for tickets to the configured service principal.
    ///
    /// # Errors
    /// Returns [`ConfigError::EmptyServicePrincipalName`] if no target is
    /// configured, or [`ConfigError::ImpersonationLevelOutOfRange`].
    pub fn kerberos_provider(
        &self,
        credential: Option<NetworkCredential>,
        channel_binding: Option<Vec<u8>>,
    ) -> Result<KerberosTokenProvider, ConfigError> {
        let service_principal_name = self
            .config
            .service_principal_name
            .clone()
            .ok_or(ConfigError::EmptyServicePrincipalName)?;
        KerberosTokenProvider::new(
            service_principal_name,
            self.config.impersonation_level,
            credential,
            channel_binding,
            Arc::clone(&self.platform.security_package),
        )
    }
}
