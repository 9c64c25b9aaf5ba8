use std::collections::HashSet;
use std::sync::Arc;

use token_auth_sdk::platform::{
    CertificateStore, ChainBuilder, ChainElement, ChainOutcome, ChainPolicy, ChainStatus,
};
use token_auth_sdk::{
    Certificate, PlatformError, RevocationMode, RevocationScope, StoreName, Thumbprint,
};

use super::certificates::CertificatePool;
use super::stats::StatsRecorder;
use super::stores::StaticCertificateStore;

/// Builds chains over the configured certificates plus the caller's extras.
///
/// Issuers are matched by DN. The chain ends at the first self-signed
/// certificate, which must be present in the anchor store.
pub struct StaticChainBuilder {
    pool: Arc<CertificatePool>,
    stores: Arc<StaticCertificateStore>,
    revoked: HashSet<Thumbprint>,
    network: bool,
    stats: StatsRecorder,
}

enum NextIssuer {
    Found(Arc<Certificate>),
    Cycle,
    Missing,
}

impl StaticChainBuilder {
    pub(crate) fn new(
        pool: Arc<CertificatePool>,
        stores: Arc<StaticCertificateStore>,
        revoked: HashSet<Thumbprint>,
        network: bool,
        stats: StatsRecorder,
    ) -> Self {
        Self {
            pool,
            stores,
            revoked,
            network,
            stats,
        }
    }

    fn next_issuer(
        &self,
        certificate: &Certificate,
        extra: &[Arc<Certificate>],
        visited: &HashSet<Thumbprint>,
    ) -> NextIssuer {
        let mut seen_visited = false;
        for candidate in extra.iter().chain(self.pool.all()) {
            if candidate.subject() != certificate.issuer() {
                continue;
            }
            if visited.contains(&candidate.thumbprint()) {
                seen_visited = true;
            } else {
                return NextIssuer::Found(Arc::clone(candidate));
            }
        }
        if seen_visited {
            NextIssuer::Cycle
        } else {
            NextIssuer::Missing
        }
    }

    fn element_status(
        &self,
        certificate: &Certificate,
        is_leaf: bool,
        policy: &ChainPolicy,
    ) -> Vec<ChainStatus> {
        let mut status = Vec::new();

        if !certificate.is_time_valid_at(policy.verification_time) {
            status.push(ChainStatus::NotTimeValid);
        }

        let in_scope = match policy.revocation_scope {
            RevocationScope::EndEntityOnly => is_leaf,
            RevocationScope::EntireChain => !certificate.is_self_signed() || is_leaf,
        };
        if in_scope {
            match policy.revocation_mode {
                RevocationMode::NoCheck => {}
                RevocationMode::Online if !self.network => {
                    status.push(ChainStatus::RevocationStatusUnknown);
                    status.push(ChainStatus::OfflineRevocation);
                }
                RevocationMode::Offline | RevocationMode::Online => {
                    if self.revoked.contains(&certificate.thumbprint()) {
                        status.push(ChainStatus::Revoked);
                    }
                }
            }
        }

        if is_leaf {
            let usages = certificate.application_policies();
            if !usages.is_empty()
                && !policy
                    .application_policies
                    .iter()
                    .all(|required| usages.contains(required))
            {
                status.push(ChainStatus::NotValidForUsage);
            }
            if !policy
                .certificate_policies
                .iter()
                .all(|required| certificate.certificate_policies().contains(required))
            {
                status.push(ChainStatus::InvalidPolicyConstraints);
            }
        }

        status
    }
}

impl ChainBuilder for StaticChainBuilder {
    #[tracing::instrument(skip_all, fields(subject = leaf.subject()))]
    fn build_chain(
        &self,
        leaf: &Certificate,
        policy: &ChainPolicy,
    ) -> Result<ChainOutcome, PlatformError> {
        self.stats.update(|s| s.chain_builds += 1);

        let mut outcome = ChainOutcome::default();
        let mut visited = HashSet::new();
        let mut current = Arc::new(leaf.clone());
        let mut complete = false;

        loop {
            visited.insert(current.thumbprint());
            let status = self.element_status(&current, outcome.elements.is_empty(), policy);
            outcome.elements.push(ChainElement {
                certificate: Arc::clone(&current),
                status,
            });

            if current.is_self_signed() {
                complete = true;
                break;
            }
            match self.next_issuer(&current, &policy.extra_certificates, &visited) {
                NextIssuer::Found(issuer) => current = issuer,
                NextIssuer::Cycle => {
                    outcome.status.push(ChainStatus::Cyclic);
                    break;
                }
                NextIssuer::Missing => {
                    outcome.status.push(ChainStatus::PartialChain);
                    break;
                }
            }
        }

        if complete {
            let anchor_store = policy.trust_anchor_store.unwrap_or(StoreName::Root);
            let anchors = self.stores.open(anchor_store)?;
            if !anchors.contains(&current.thumbprint()) {
                outcome.status.push(ChainStatus::UntrustedRoot);
            }
        }

        tracing::debug!(
            elements = outcome.elements.len(),
            success = outcome.is_success(),
            "chain built"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use time::OffsetDateTime;
    use tracing_test::traced_test;

    use crate::config::CertificateConfig;

    fn cert(name: &str, issuer: Option<&str>) -> CertificateConfig {
        CertificateConfig {
            name: name.to_owned(),
            subject: format!("CN={name}"),
            issuer: issuer.map(|i| format!("CN={i}")),
            serial_number: String::new(),
            not_before: OffsetDateTime::UNIX_EPOCH,
            not_after: OffsetDateTime::UNIX_EPOCH + time::Duration::days(1),
            application_policies: Vec::new(),
            certificate_policies: Vec::new(),
            upn: None,
        }
    }

    /// root <- ca <- leaf, with every certificate but the leaf revoked.
    fn builder() -> (StaticChainBuilder, Arc<Certificate>) {
        let pool = Arc::new(
            CertificatePool::from_config(&[
                cert("root", None),
                cert("ca", Some("root")),
                cert("leaf", Some("ca")),
            ])
            .unwrap(),
        );
        let thumbprint = |name: &str| pool.get(name).unwrap().thumbprint();
        let stats = StatsRecorder::default();
        let stores = StaticCertificateStore::new(
            HashMap::from([(StoreName::Root, HashSet::from([thumbprint("root")]))]),
            HashSet::new(),
            stats.clone(),
        );
        let revoked = HashSet::from([thumbprint("root"), thumbprint("ca")]);
        let leaf = Arc::clone(pool.get("leaf").unwrap());
        let builder = StaticChainBuilder::new(
            Arc::clone(&pool),
            Arc::new(stores),
            revoked,
            false,
            stats,
        );
        (builder, leaf)
    }

    fn policy(scope: RevocationScope) -> ChainPolicy {
        ChainPolicy {
            application_policies: Vec::new(),
            certificate_policies: Vec::new(),
            revocation_mode: RevocationMode::Offline,
            revocation_scope: scope,
            extra_certificates: Vec::new(),
            trust_anchor_store: None,
            verification_time: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    #[traced_test]
    fn entire_chain_scope_skips_the_self_signed_root() {
        let (builder, leaf) = builder();
        let outcome = builder
            .build_chain(&leaf, &policy(RevocationScope::EntireChain))
            .unwrap();

        let per_element: Vec<_> = outcome.elements.iter().map(|e| e.status.clone()).collect();
        assert_eq!(per_element, [vec![], vec![ChainStatus::Revoked], vec![]]);
        assert!(outcome.status.is_empty());
        assert!(logs_contain("chain built"));
    }

    #[test]
    fn end_entity_scope_checks_the_leaf_only() {
        let (builder, leaf) = builder();
        let outcome = builder
            .build_chain(&leaf, &policy(RevocationScope::EndEntityOnly))
            .unwrap();
        assert!(outcome.is_success());
    }

    #[test]
    fn certificate_policies_are_required_on_the_leaf() {
        let (builder, leaf) = builder();
        let policy = ChainPolicy {
            certificate_policies: vec!["2.23.140.1.2.1".to_owned()],
            revocation_mode: RevocationMode::NoCheck,
            ..policy(RevocationScope::EntireChain)
        };
        let outcome = builder.build_chain(&leaf, &policy).unwrap();
        assert_eq!(
            outcome.elements[0].status,
            [ChainStatus::InvalidPolicyConstraints]
        );
    }
}
