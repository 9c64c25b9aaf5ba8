use std::sync::Arc;

use sectoken_claims::{
    AuthorizationPolicy, Claim, ClaimSet, ClaimValue, Issuer, ValidityWindow, claim_types,
};
use token_auth_sdk::{Certificate, SecurityToken, TimeViolation, TokenAuthenticator, ValidationError};

use super::windows::WindowsAuthenticator;
use crate::domain::account_mapping::CertificateAccountMapper;
use crate::domain::trust::CertificateTrustEvaluator;

/// Validates certificate credentials.
///
/// With account mapping enabled the result is a composite policy holding
/// the certificate view first and the mapped platform account second.
pub struct X509Authenticator {
    trust: Arc<CertificateTrustEvaluator>,
    mapping: Option<(Arc<CertificateAccountMapper>, WindowsAuthenticator)>,
}

impl X509Authenticator {
    #[must_use]
    pub fn new(trust: Arc<CertificateTrustEvaluator>) -> Self {
        Self {
            trust,
            mapping: None,
        }
    }

    #[must_use]
    pub fn with_account_mapping(
        mut self,
        mapper: Arc<CertificateAccountMapper>,
        claims: WindowsAuthenticator,
    ) -> Self {
        self.mapping = Some((mapper, claims));
        self
    }

    /// Claim set describing `certificate` itself.
    #[must_use]
    pub fn claim_set_for(certificate: &Certificate) -> Arc<ClaimSet> {
        let thumbprint = *certificate.thumbprint().as_bytes();
        let mut claims = vec![
            Claim::identity(claim_types::THUMBPRINT, ClaimValue::Thumbprint(thumbprint)),
            Claim::possess(claim_types::THUMBPRINT, ClaimValue::Thumbprint(thumbprint)),
            Claim::possess(claim_types::X500_DISTINGUISHED_NAME, certificate.subject()),
            Claim::possess(claim_types::NAME, certificate.subject()),
        ];
        if let Some(upn) = certificate.upn() {
            claims.push(Claim::possess(claim_types::UPN, upn));
        }

        let set = if certificate.is_self_signed() {
            ClaimSet::self_issued(claims)
        } else {
            let issuer = ClaimSet::self_issued(vec![Claim::identity(
                claim_types::X500_DISTINGUISHED_NAME,
                certificate.issuer(),
            )]);
            ClaimSet::issued_by(claims, Arc::new(issuer))
        };
        Arc::new(set)
    }
}

impl TokenAuthenticator for X509Authenticator {
    fn name(&self) -> &'static str {
        "x509"
    }

    fn can_validate(&self, token: &SecurityToken) -> bool {
        matches!(token, SecurityToken::X509(_))
    }

    #[tracing::instrument(skip_all, fields(authenticator = "x509", token_id = token.id()))]
    fn validate_token(
        &self,
        token: &SecurityToken,
    ) -> Result<Vec<AuthorizationPolicy>, ValidationError> {
        let SecurityToken::X509(x509) = token else {
            return Err(ValidationError::UnsupportedCredential {
                authenticator: self.name(),
                kind: token.kind(),
            });
        };
        let certificate = &x509.certificate;

        self.trust.evaluate(certificate, &[])?;

        let window = ValidityWindow::new(certificate.not_before(), certificate.not_after())
            .map_err(|e| ValidationError::TimeInvalid {
                subject: format!("certificate '{}'", certificate.subject()),
                violation: TimeViolation::Expired {
                    expired_at: e.valid_to,
                    now: e.valid_from,
                },
            })?;
        let certificate_view = Self::claim_set_for(certificate);

        let policy = match &self.mapping {
            None => AuthorizationPolicy::single(certificate_view, window),
            Some((mapper, claims)) => {
                let identity = mapper.map(certificate)?;
                AuthorizationPolicy::composite(
                    vec![certificate_view, claims.claim_set_for(&identity)],
                    window,
                )
            }
        };

        tracing::debug!(thumbprint = %certificate.thumbprint(), "certificate accepted");
        Ok(vec![policy])
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime};
    use token_auth_sdk::X509Token;

    fn cert(issuer: Option<&str>) -> Certificate {
        let now = OffsetDateTime::now_utc();
        let builder = Certificate::builder(b"x509-authenticator".to_vec())
            .subject("CN=alice")
            .validity(now - Duration::days(1), now + Duration::days(1))
            .upn("alice@corp.example");
        match issuer {
            Some(name) => builder.issuer(name).build(),
            None => builder.build(),
        }
    }

    #[test]
    fn certificate_claims_are_keyed_by_thumbprint() {
        let c = cert(None);
        let set = X509Authenticator::claim_set_for(&c);

        let id = set.identity_claim().unwrap();
        assert_eq!(id.claim_type(), claim_types::THUMBPRINT);
        assert_eq!(id.value(), &ClaimValue::Thumbprint(*c.thumbprint().as_bytes()));
        assert_eq!(set.find_claims(claim_types::UPN, None).count(), 1);
        assert_eq!(set.issuer(), &Issuer::SelfIssued);
    }

    #[test]
    fn issued_certificate_names_its_issuer() {
        let set = X509Authenticator::claim_set_for(&cert(Some("CN=Corp CA")));
        let issuer = set.issuer_chain().next().unwrap();
        assert_eq!(
            issuer.identity_claim().unwrap().value().as_str(),
            Some("CN=Corp CA")
        );
    }

    #[test]
    fn trusted_certificate_yields_single_policy_over_its_lifetime() {
        let c = cert(None);
        let token = SecurityToken::from(X509Token::new(c.clone()));
        let auth = X509Authenticator::new(CertificateTrustEvaluator::none());

        let policies = auth.validate(&token).unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].claim_sets().len(), 1);
        assert_eq!(policies[0].window().valid_to(), c.not_after());
    }
}
