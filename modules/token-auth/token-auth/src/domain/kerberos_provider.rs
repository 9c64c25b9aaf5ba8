use std::sync::Arc;

use uuid::Uuid;

use token_auth_sdk::platform::{NetworkCredential, SecurityPackage};
use token_auth_sdk::{
    ConfigError, ImpersonationLevel, KerberosRole, KerberosToken, ProviderError, SecurityToken,
    TokenProvider,
};

use crate::domain::pending::PendingOperation;

/// Obtains Kerberos service tickets for one target.
pub struct KerberosTokenProvider {
    service_principal_name: String,
    impersonation_level: ImpersonationLevel,
    credential: Option<NetworkCredential>,
    channel_binding: Option<Vec<u8>>,
    package: Arc<dyn SecurityPackage>,
}

impl KerberosTokenProvider {
    /// `credential` of `None` acquires tickets as the process identity.
    ///
    /// # Errors
    /// Returns [`ConfigError::ImpersonationLevelOutOfRange`] for any level other
    /// than `Identification` or `Impersonation`, and
    /// [`ConfigError::EmptyServicePrincipalName`] for a blank target. Both are
    /// checked before any platform call.
    pub fn new(
        service_principal_name: impl Into<String>,
        impersonation_level: ImpersonationLevel,
        credential: Option<NetworkCredential>,
        channel_binding: Option<Vec<u8>>,
        package: Arc<dyn SecurityPackage>,
    ) -> Result<Self, ConfigError> {
        if !matches!(
            impersonation_level,
            ImpersonationLevel::Identification | ImpersonationLevel::Impersonation
        ) {
            return Err(ConfigError::ImpersonationLevelOutOfRange {
                level: impersonation_level,
            });
        }
        let service_principal_name = service_principal_name.into();
        if service_principal_name.trim().is_empty() {
            return Err(ConfigError::EmptyServicePrincipalName);
        }

        Ok(Self {
            service_principal_name,
            impersonation_level,
            credential,
            channel_binding,
            package,
        })
    }

    #[must_use]
    pub fn service_principal_name(&self) -> &str {
        &self.service_principal_name
    }

    /// [`TokenProvider::get_token`] on the blocking pool.
    pub fn get_token_async(self: &Arc<Self>) -> PendingOperation<SecurityToken, ProviderError> {
        let provider = Arc::clone(self);
        PendingOperation::spawn(move || provider.get_token())
    }
}

impl TokenProvider for KerberosTokenProvider {
    #[tracing::instrument(skip_all, fields(spn = %self.service_principal_name, level = %self.impersonation_level))]
    fn get_token(&self) -> Result<SecurityToken, ProviderError> {
        let grant = {
            let handle = self
                .package
                .acquire_credentials(self.credential.as_ref())
                .inspect_err(|e| tracing::warn!(error = %e, "credential acquisition failed"))?;
            handle
                .initialize_context(
                    &self.service_principal_name,
                    self.impersonation_level,
                    self.channel_binding.as_deref(),
                )
                .inspect_err(|e| tracing::warn!(error = %e, "security context initialization failed"))?
        };

        let correlation_id = Uuid::new_v4();
        tracing::debug!(%correlation_id, "service ticket acquired");
        Ok(SecurityToken::Kerberos(KerberosToken {
            id: correlation_id.to_string(),
            role: KerberosRole::Requestor,
            service_principal_name: self.service_principal_name.clone(),
            ticket: grant.ticket,
            impersonation_level: self.impersonation_level,
            correlation_id,
            channel_binding: self.channel_binding.clone(),
            session_key: grant.session_key,
            valid_from: Some(grant.valid_from),
            valid_to: Some(grant.valid_to),
        }))
    }

    /// Tickets expire on their own; there is nothing to revoke.
    fn cancel_token(&self, _token: &SecurityToken) -> Result<(), ProviderError> {
        Ok(())
    }
}
