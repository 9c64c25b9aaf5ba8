use std::sync::Arc;

use sectoken_claims::{AuthorizationPolicy, Claim, ClaimSet, Issuer, ValidityWindow, claim_types};
use token_auth_sdk::platform::{Clock, PasswordValidator, PlatformLogon};
use token_auth_sdk::{SecurityToken, TokenAuthenticator, UserNameToken, ValidationError};

use super::windows::WindowsAuthenticator;

enum Mode {
    Custom(Arc<dyn PasswordValidator>),
    Platform {
        logon: Arc<dyn PlatformLogon>,
        claims: WindowsAuthenticator,
    },
}

/// Validates username/password pairs.
///
/// In custom mode the pair is checked by an application validator and the
/// result carries only a name claim. In platform mode the pair is used for a
/// platform logon and the result carries the account's claims.
pub struct UserNameAuthenticator {
    mode: Mode,
    clock: Arc<dyn Clock>,
}

impl UserNameAuthenticator {
    #[must_use]
    pub fn custom(validator: Arc<dyn PasswordValidator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            mode: Mode::Custom(validator),
            clock,
        }
    }

    #[must_use]
    pub fn platform(
        logon: Arc<dyn PlatformLogon>,
        claims: WindowsAuthenticator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            mode: Mode::Platform { logon, claims },
            clock,
        }
    }

    fn validate_pair(&self, token: &UserNameToken) -> Result<AuthorizationPolicy, ValidationError> {
        let window = ValidityWindow::starting_at(self.clock.now());
        match &self.mode {
            Mode::Custom(validator) => {
                validator
                    .validate(&token.user_name, &token.password)
                    .map_err(|e| ValidationError::InvalidCredentials {
                        user: token.user_name.clone(),
                        reason: e.reason,
                    })?;
                let claims = vec![
                    Claim::identity(claim_types::NAME, token.user_name.as_str()),
                    Claim::possess(claim_types::NAME, token.user_name.as_str()),
                ];
                Ok(AuthorizationPolicy::single(
                    Arc::new(ClaimSet::new(claims, Issuer::ClaimSet(ClaimSet::system()))),
                    window,
                ))
            }
            Mode::Platform { logon, claims } => {
                let identity = logon
                    .logon_user(&token.user_name, &token.password)
                    .map_err(|e| ValidationError::InvalidCredentials {
                        user: token.user_name.clone(),
                        reason: format!("platform logon failed ({})", e.native_code),
                    })?;
                Ok(AuthorizationPolicy::single(
                    claims.claim_set_for(&identity),
                    window,
                ))
            }
        }
    }
}

impl TokenAuthenticator for UserNameAuthenticator {
    fn name(&self) -> &'static str {
        "username"
    }

    fn can_validate(&self, token: &SecurityToken) -> bool {
        matches!(token, SecurityToken::UserName(t) if !t.user_name.is_empty())
    }

    #[tracing::instrument(skip_all, fields(authenticator = "username", token_id = token.id()))]
    fn validate_token(
        &self,
        token: &SecurityToken,
    ) -> Result<Vec<AuthorizationPolicy>, ValidationError> {
        let SecurityToken::UserName(pair) = token else {
            return Err(ValidationError::UnsupportedCredential {
                authenticator: self.name(),
                kind: token.kind(),
            });
        };

        match self.validate_pair(pair) {
            Ok(policy) => {
                tracing::debug!(user = %pair.user_name, "username credentials accepted");
                Ok(vec![policy])
            }
            Err(e) => {
                tracing::warn!(user = %pair.user_name, error = %e, "username credentials rejected");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use secrecy::{ExposeSecret, SecretString};
    use time::OffsetDateTime;
    use token_auth_sdk::CredentialRejected;
    use token_auth_sdk::platform::FixedClock;
    use tracing_test::traced_test;

    struct OnePassword;

    impl PasswordValidator for OnePassword {
        fn validate(&self, user_name: &str, password: &SecretString) -> Result<(), CredentialRejected> {
            if user_name == "alice" && password.expose_secret() == "correct horse" {
                Ok(())
            } else {
                Err(CredentialRejected {
                    reason: "unknown user or bad password".to_owned(),
                })
            }
        }
    }

    fn authenticator() -> UserNameAuthenticator {
        UserNameAuthenticator::custom(
            Arc::new(OnePassword),
            Arc::new(FixedClock::at(OffsetDateTime::UNIX_EPOCH)),
        )
    }

    fn pair(user: &str, password: &str) -> SecurityToken {
        UserNameToken::new(user, SecretString::from(password.to_owned())).into()
    }

    #[test]
    fn custom_mode_yields_name_claims() {
        let policies = authenticator().validate(&pair("alice", "correct horse")).unwrap();
        let set = policies[0].primary_claim_set().unwrap();
        assert_eq!(
            set.identity_claim().unwrap().value().as_str(),
            Some("alice")
        );
        assert_eq!(policies[0].window().valid_from(), OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    #[traced_test]
    fn rejected_password_is_invalid_credentials_and_never_logged() {
        let err = authenticator().validate(&pair("alice", "hunter2")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCredentials { ref user, .. } if user == "alice"));
        assert!(!err.to_string().contains("hunter2"));
        assert!(logs_contain("username credentials rejected"));
        assert!(!logs_contain("hunter2"));
    }

    #[test]
    fn empty_user_name_is_not_accepted() {
        assert!(!authenticator().can_validate(&pair("", "x")));
    }
}
