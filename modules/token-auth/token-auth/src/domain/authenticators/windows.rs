use std::sync::Arc;

use sectoken_claims::{
    AuthorizationPolicy, Claim, ClaimSet, ClaimValue, Issuer, ValidityWindow, claim_types,
};
use time::OffsetDateTime;
use token_auth_sdk::platform::PlatformIdentity;
use token_auth_sdk::{SecurityToken, TimeViolation, TokenAuthenticator, ValidationError};

/// Turns an authenticated platform identity into claims.
///
/// Also used by the username, Kerberos and certificate-mapping paths once
/// the platform has produced an identity.
#[derive(Debug, Clone, Copy)]
pub struct WindowsAuthenticator {
    include_group_claims: bool,
}

impl WindowsAuthenticator {
    #[must_use]
    pub fn new(include_group_claims: bool) -> Self {
        Self {
            include_group_claims,
        }
    }

    /// Claim set for `identity`, issued by the system sentinel.
    #[must_use]
    pub fn claim_set_for(&self, identity: &PlatformIdentity) -> Arc<ClaimSet> {
        let mut claims = vec![
            Claim::identity(claim_types::SID, ClaimValue::Sid(identity.sid.clone())),
            Claim::possess(claim_types::SID, ClaimValue::Sid(identity.sid.clone())),
            Claim::possess(claim_types::NAME, identity.name.as_str()),
            Claim::possess(
                claim_types::AUTHENTICATION_METHOD,
                identity.authentication_type.as_str(),
            ),
        ];
        if self.include_group_claims {
            claims.extend(
                identity
                    .groups
                    .iter()
                    .map(|g| Claim::possess(claim_types::GROUP_SID, ClaimValue::Sid(g.sid.clone()))),
            );
        }
        Arc::new(ClaimSet::new(claims, Issuer::ClaimSet(ClaimSet::system())))
    }

    /// Single-policy result for `identity` over `[valid_from, valid_to]`.
    ///
    /// # Errors
    /// Returns [`ValidationError::TimeInvalid`] if the window is inverted.
    pub fn policy_for(
        &self,
        identity: &PlatformIdentity,
        valid_from: Option<OffsetDateTime>,
        valid_to: Option<OffsetDateTime>,
    ) -> Result<AuthorizationPolicy, ValidationError> {
        let window = ValidityWindow::from_bounds(valid_from, valid_to).map_err(|e| {
            ValidationError::TimeInvalid {
                subject: format!("account '{}'", identity.name),
                violation: TimeViolation::Expired {
                    expired_at: e.valid_to,
                    now: e.valid_from,
                },
            }
        })?;
        Ok(AuthorizationPolicy::single(self.claim_set_for(identity), window))
    }
}

impl TokenAuthenticator for WindowsAuthenticator {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn can_validate(&self, token: &SecurityToken) -> bool {
        matches!(token, SecurityToken::Windows(_))
    }

    #[tracing::instrument(skip_all, fields(authenticator = "windows", token_id = token.id()))]
    fn validate_token(
        &self,
        token: &SecurityToken,
    ) -> Result<Vec<AuthorizationPolicy>, ValidationError> {
        let SecurityToken::Windows(windows) = token else {
            return Err(ValidationError::UnsupportedCredential {
                authenticator: self.name(),
                kind: token.kind(),
            });
        };
        let policy = self.policy_for(
            &windows.identity,
            Some(windows.valid_from),
            Some(windows.valid_to),
        )?;
        tracing::debug!(account = %windows.identity.name, "platform identity accepted");
        Ok(vec![policy])
    }
}
