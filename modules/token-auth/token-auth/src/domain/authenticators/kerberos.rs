use std::sync::Arc;

use sectoken_claims::AuthorizationPolicy;
use token_auth_sdk::platform::{Clock, PlatformLogon};
use token_auth_sdk::{KerberosRole, SecurityToken, TokenAuthenticator, ValidationError};

use super::windows::WindowsAuthenticator;

/// Validates service tickets received from clients.
///
/// The platform accepts the ticket and produces the client identity; claim
/// construction is the same as for platform identities.
pub struct KerberosAuthenticator {
    logon: Arc<dyn PlatformLogon>,
    claims: WindowsAuthenticator,
    clock: Arc<dyn Clock>,
}

impl KerberosAuthenticator {
    #[must_use]
    pub fn new(
        logon: Arc<dyn PlatformLogon>,
        claims: WindowsAuthenticator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            logon,
            claims,
            clock,
        }
    }
}

impl TokenAuthenticator for KerberosAuthenticator {
    fn name(&self) -> &'static str {
        "kerberos"
    }

    fn can_validate(&self, token: &SecurityToken) -> bool {
        matches!(token, SecurityToken::Kerberos(t) if t.role == KerberosRole::Receiver)
    }

    #[tracing::instrument(
        skip_all,
        fields(authenticator = "kerberos", token_id = token.id(), correlation_id = tracing::field::Empty)
    )]
    fn validate_token(
        &self,
        token: &SecurityToken,
    ) -> Result<Vec<AuthorizationPolicy>, ValidationError> {
        let SecurityToken::Kerberos(ticket) = token else {
            return Err(ValidationError::UnsupportedCredential {
                authenticator: self.name(),
                kind: token.kind(),
            });
        };
        tracing::Span::current().record(
            "correlation_id",
            tracing::field::display(ticket.correlation_id),
        );

        let identity = self
            .logon
            .accept_ticket(&ticket.ticket, ticket.channel_binding.as_deref())
            .inspect_err(|e| {
                tracing::warn!(error = %e, spn = %ticket.service_principal_name, "ticket rejected");
            })?;

        let valid_from = ticket.valid_from.unwrap_or_else(|| self.clock.now());
        let policy = self
            .claims
            .policy_for(&identity, Some(valid_from), ticket.valid_to)?;
        tracing::debug!(account = %identity.name, "service ticket accepted");
        Ok(vec![policy])
    }
}
