use std::sync::Arc;

use token_auth_sdk::platform::{PlatformIdentity, PlatformLogon, PlatformServices};
use token_auth_sdk::{Certificate, ConfigError, StoreName, ValidationError};

use crate::domain::pending::PendingOperation;
use crate::domain::trust::{CertificateTrustEvaluator, ChainSettings};

/// Maps a certificate to the platform account it is issued for.
///
/// The certificate must chain to an anchor in the `NtAuth` store before the
/// certificate logon is attempted; a chain failure short-circuits the logon.
pub struct CertificateAccountMapper {
    chain: CertificateTrustEvaluator,
    logon: Arc<dyn PlatformLogon>,
}

impl CertificateAccountMapper {
    /// `settings.trust_anchor_store` is overridden with `NtAuth`.
    ///
    /// # Errors
    /// Returns [`ConfigError::OnlineRevocationUnavailable`] if the chain
    /// settings ask for online revocation the environment cannot provide.
    pub fn new(platform: &PlatformServices, settings: ChainSettings) -> Result<Self, ConfigError> {
        let settings = ChainSettings {
            trust_anchor_store: Some(StoreName::NtAuth),
            ..settings
        };
        Ok(Self {
            chain: CertificateTrustEvaluator::chain(platform, settings)?,
            logon: Arc::clone(&platform.logon),
        })
    }

    /// # Errors
    /// Returns [`ValidationError::ChainBuildFailure`] if the certificate does
    /// not chain to a restricted anchor, or
    /// [`ValidationError::PlatformExchangeFailure`] if the logon fails.
    #[tracing::instrument(skip_all, fields(subject = certificate.subject()))]
    pub fn map(&self, certificate: &Certificate) -> Result<PlatformIdentity, ValidationError> {
        self.chain.evaluate(certificate, &[])?;
        let identity = self.logon.logon_certificate(certificate)?;
        tracing::debug!(account = %identity.name, "certificate mapped to account");
        Ok(identity)
    }

    pub fn map_async(
        self: &Arc<Self>,
        certificate: Arc<Certificate>,
    ) -> PendingOperation<PlatformIdentity, ValidationError> {
        let mapper = Arc::clone(self);
        PendingOperation::spawn(move || mapper.map(&certificate))
    }
}
