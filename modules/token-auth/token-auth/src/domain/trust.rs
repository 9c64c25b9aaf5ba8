//! Certificate trust evaluation.
//!
//! Four strategies are available:
//! - `None`: every certificate is trusted
//! - `Explicit`: time validity, then trusted-people membership, then
//!   absence from the disallowed store
//! - `Chain`: a platform-built chain with no non-success status
//! - `Either`: `Explicit` first; `Chain` is consulted only when it fails
//!
//! Trying the explicit stores first lets an administrator pin a certificate
//! whose chain is broken, at the cost of a store lookup on every call.

use std::sync::{Arc, LazyLock};

use time::OffsetDateTime;

use token_auth_sdk::platform::{CertificateStore, ChainBuilder, ChainPolicy, Clock, PlatformServices};
use token_auth_sdk::{
    Certificate, ConfigError, RevocationMode, RevocationScope, StoreName, TimeViolation,
    TrustMode, ValidationError,
};

use crate::domain::pending::PendingOperation;

static NONE: LazyLock<Arc<CertificateTrustEvaluator>> = LazyLock::new(|| {
    Arc::new(CertificateTrustEvaluator {
        strategy: Strategy::None,
    })
});

/// Chain-building parameters fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct ChainSettings {
    pub application_policies: Vec<String>,
    pub certificate_policies: Vec<String>,
    pub revocation_mode: RevocationMode,
    pub revocation_scope: RevocationScope,
    /// Accept only anchors from this store instead of the root store.
    pub trust_anchor_store: Option<StoreName>,
}

struct ExplicitTrust {
    stores: Arc<dyn CertificateStore>,
    clock: Arc<dyn Clock>,
}

impl ExplicitTrust {
    fn evaluate(&self, certificate: &Certificate) -> Result<(), ValidationError> {
        let now = self.clock.now();
        check_certificate_time(certificate, now)?;

        let thumbprint = certificate.thumbprint();
        {
            let trusted = self.stores.open(StoreName::TrustedPeople)?;
            if !trusted.contains(&thumbprint) {
                return Err(ValidationError::NotInTrustedStore { thumbprint });
            }
        }

        let disallowed = self.stores.open(StoreName::Disallowed)?;
        if disallowed.contains(&thumbprint) {
            return Err(ValidationError::InDisallowedStore { thumbprint });
        }
        Ok(())
    }
}

struct ChainTrust {
    builder: Arc<dyn ChainBuilder>,
    clock: Arc<dyn Clock>,
    settings: ChainSettings,
}

impl ChainTrust {
    fn evaluate(
        &self,
        certificate: &Certificate,
        extra_certificates: &[Arc<Certificate>],
    ) -> Result<(), ValidationError> {
        let policy = ChainPolicy {
            application_policies: self.settings.application_policies.clone(),
            certificate_policies: self.settings.certificate_policies.clone(),
            revocation_mode: self.settings.revocation_mode,
            revocation_scope: self.settings.revocation_scope,
            extra_certificates: extra_certificates.to_vec(),
            trust_anchor_store: self.settings.trust_anchor_store,
            verification_time: self.clock.now(),
        };

        let outcome = self
            .builder
            .build_chain(certificate, &policy)
            .map_err(|e| ValidationError::ChainBuildFailure {
                status_reasons: vec![e.to_string()],
            })?;

        if outcome.is_success() {
            Ok(())
        } else {
            Err(ValidationError::ChainBuildFailure {
                status_reasons: outcome.status_reasons(),
            })
        }
    }
}

enum Strategy {
    None,
    Explicit(ExplicitTrust),
    Chain(ChainTrust),
    Either(ExplicitTrust, ChainTrust),
}

/// Decides whether a certificate is trustworthy.
pub struct CertificateTrustEvaluator {
    strategy: Strategy,
}

impl CertificateTrustEvaluator {
    /// Process-wide evaluator that trusts every certificate.
    #[must_use]
    pub fn none() -> Arc<Self> {
        Arc::clone(&NONE)
    }

    #[must_use]
    pub fn explicit(stores: Arc<dyn CertificateStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            strategy: Strategy::Explicit(ExplicitTrust { stores, clock }),
        }
    }

    /// # Errors
    /// Returns [`ConfigError::OnlineRevocationUnavailable`] if online revocation
    /// is requested without network and store-write capabilities.
    pub fn chain(platform: &PlatformServices, settings: ChainSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            strategy: Strategy::Chain(chain_trust(platform, settings)?),
        })
    }

    /// # Errors
    /// Same as [`Self::chain`].
    pub fn either(platform: &PlatformServices, settings: ChainSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            strategy: Strategy::Either(
                ExplicitTrust {
                    stores: Arc::clone(&platform.stores),
                    clock: Arc::clone(&platform.clock),
                },
                chain_trust(platform, settings)?,
            ),
        })
    }

    /// Evaluator for `mode`; `TrustMode::None` returns the shared singleton.
    ///
    /// # Errors
    /// Same as [`Self::chain`].
    pub fn for_mode(
        mode: TrustMode,
        platform: &PlatformServices,
        settings: ChainSettings,
    ) -> Result<Arc<Self>, ConfigError> {
        Ok(match mode {
            TrustMode::None => Self::none(),
            TrustMode::Explicit => Arc::new(Self::explicit(
                Arc::clone(&platform.stores),
                Arc::clone(&platform.clock),
            )),
            TrustMode::Chain => Arc::new(Self::chain(platform, settings)?),
            TrustMode::Either => Arc::new(Self::either(platform, settings)?),
        })
    }

    #[must_use]
    pub fn mode(&self) -> TrustMode {
        match self.strategy {
            Strategy::None => TrustMode::None,
            Strategy::Explicit(_) => TrustMode::Explicit,
            Strategy::Chain(_) => TrustMode::Chain,
            Strategy::Either(..) => TrustMode::Either,
        }
    }

    /// Checks `certificate`, using `extra_certificates` as intermediates.
    ///
    /// # Errors
    /// Returns the failure of the configured strategy; for `Either`, a
    /// [`ValidationError::TrustFailures`] carrying both reasons.
    #[tracing::instrument(skip_all, fields(mode = ?self.mode(), subject = certificate.subject()))]
    pub fn evaluate(
        &self,
        certificate: &Certificate,
        extra_certificates: &[Arc<Certificate>],
    ) -> Result<(), ValidationError> {
        let result = match &self.strategy {
            Strategy::None => Ok(()),
            Strategy::Explicit(explicit) => explicit.evaluate(certificate),
            Strategy::Chain(chain) => chain.evaluate(certificate, extra_certificates),
            Strategy::Either(explicit, chain) => match explicit.evaluate(certificate) {
                Ok(()) => Ok(()),
                Err(explicit_err) => {
                    tracing::debug!(reason = %explicit_err, "explicit trust failed, trying chain");
                    chain
                        .evaluate(certificate, extra_certificates)
                        .map_err(|chain_err| ValidationError::TrustFailures {
                            explicit: Box::new(explicit_err),
                            chain: Box::new(chain_err),
                        })
                }
            },
        };

        match &result {
            Ok(()) => tracing::debug!(thumbprint = %certificate.thumbprint(), "certificate trusted"),
            Err(e) => tracing::warn!(error = %e, "certificate not trusted"),
        }
        result
    }

    /// [`Self::evaluate`] on the blocking pool.
    pub fn evaluate_async(
        self: &Arc<Self>,
        certificate: Arc<Certificate>,
        extra_certificates: Vec<Arc<Certificate>>,
    ) -> PendingOperation<(), ValidationError> {
        let evaluator = Arc::clone(self);
        PendingOperation::spawn(move || evaluator.evaluate(&certificate, &extra_certificates))
    }
}

fn chain_trust(platform: &PlatformServices, settings: ChainSettings) -> Result<ChainTrust, ConfigError> {
    if settings.revocation_mode == RevocationMode::Online
        && !platform.capabilities.allows_online_revocation()
    {
        return Err(ConfigError::OnlineRevocationUnavailable);
    }
    Ok(ChainTrust {
        builder: Arc::clone(&platform.chain_builder),
        clock: Arc::clone(&platform.clock),
        settings,
    })
}

/// Inclusive `[not_before, not_after]` check at `now`.
pub(crate) fn check_certificate_time(
    certificate: &Certificate,
    now: OffsetDateTime,
) -> Result<(), ValidationError> {
    let violation = if now < certificate.not_before() {
        TimeViolation::NotYetValid {
            not_before: certificate.not_before(),
            now,
        }
    } else if now > certificate.not_after() {
        TimeViolation::Expired {
            expired_at: certificate.not_after(),
            now,
        }
    } else {
        return Ok(());
    };
    Err(ValidationError::TimeInvalid {
        subject: format!("certificate '{}'", certificate.subject()),
        violation,
    })
}
