use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use token_auth_sdk::Certificate;

use crate::config::CertificateConfig;
use crate::error::StaticPlatformError;

/// Configured certificates, addressable by name.
#[derive(Debug, Default)]
pub struct CertificatePool {
    by_name: HashMap<String, Arc<Certificate>>,
    all: Vec<Arc<Certificate>>,
}

impl CertificatePool {
    pub(crate) fn from_config(configs: &[CertificateConfig]) -> Result<Self, StaticPlatformError> {
        let mut pool = Self::default();
        for config in configs {
            let certificate = Arc::new(build_certificate(config));
            if pool
                .by_name
                .insert(config.name.clone(), Arc::clone(&certificate))
                .is_some()
            {
                return Err(StaticPlatformError::DuplicateCertificate {
                    name: config.name.clone(),
                });
            }
            pool.all.push(certificate);
        }
        Ok(pool)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Certificate>> {
        self.by_name.get(name)
    }

    pub(crate) fn resolve(
        &self,
        name: &str,
        referenced_by: &str,
    ) -> Result<&Arc<Certificate>, StaticPlatformError> {
        self.get(name)
            .ok_or_else(|| StaticPlatformError::UnknownCertificate {
                name: name.to_owned(),
                referenced_by: referenced_by.to_owned(),
            })
    }

    /// Declaration order.
    #[must_use]
    pub fn all(&self) -> &[Arc<Certificate>] {
        &self.all
    }
}

fn build_certificate(config: &CertificateConfig) -> Certificate {
    let encoded = format!(
        "static-der|{}|{}|{}",
        config.name, config.subject, config.serial_number
    )
    .into_bytes();
    let public_key = Sha256::digest(config.name.as_bytes()).to_vec();

    let mut builder = Certificate::builder(encoded)
        .subject(config.subject.clone())
        .serial_number(config.serial_number.clone())
        .validity(config.not_before, config.not_after)
        .public_key("static", public_key)
        .application_policies(config.application_policies.clone())
        .certificate_policies(config.certificate_policies.clone());
    if let Some(issuer) = &config.issuer {
        builder = builder.issuer(issuer.clone());
    }
    if let Some(upn) = &config.upn {
        builder = builder.upn(upn.clone());
    }
    builder.build()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn cert(name: &str, subject: &str) -> CertificateConfig {
        CertificateConfig {
            name: name.to_owned(),
            subject: subject.to_owned(),
            issuer: None,
            serial_number: "01".to_owned(),
            not_before: OffsetDateTime::UNIX_EPOCH,
            not_after: OffsetDateTime::UNIX_EPOCH,
            application_policies: Vec::new(),
            certificate_policies: Vec::new(),
            upn: None,
        }
    }

    #[test]
    fn distinct_names_have_distinct_thumbprints() {
        let pool =
            CertificatePool::from_config(&[cert("a", "CN=same"), cert("b", "CN=same")]).unwrap();
        let a = pool.get("a").unwrap();
        let b = pool.get("b").unwrap();
        assert_ne!(a.thumbprint(), b.thumbprint());
        assert!(a.is_self_signed());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = CertificatePool::from_config(&[cert("a", "CN=a"), cert("a", "CN=b")]).unwrap_err();
        assert_eq!(
            err,
            StaticPlatformError::DuplicateCertificate {
                name: "a".to_owned()
            }
        );
    }
}
