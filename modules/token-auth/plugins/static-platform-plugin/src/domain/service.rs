//! Assembly of the static platform from configuration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use secrecy::SecretString;

use token_auth_sdk::platform::{
    Clock, EnvironmentCapabilities, FixedClock, GroupMembership, PlatformServices, SystemClock,
};
use token_auth_sdk::{Certificate, StoreName, Thumbprint};

use super::certificates::CertificatePool;
use super::chain::StaticChainBuilder;
use super::logon::{Account, StaticLogon, TicketRegistry, find_account};
use super::security_package::{SecurityPackageSettings, StaticSecurityPackage};
use super::stats::{PlatformStats, StatsRecorder};
use super::stores::StaticCertificateStore;
use super::unwrap::StaticKeyUnwrapper;
use crate::config::{AccountConfig, StaticPlatformPluginConfig};
use crate::error::StaticPlatformError;

/// In-memory platform built from [`StaticPlatformPluginConfig`].
pub struct StaticPlatform {
    services: PlatformServices,
    certificates: Arc<CertificatePool>,
    tickets: Arc<TicketRegistry>,
    stats: StatsRecorder,
}

impl StaticPlatform {
    /// Create a platform from plugin configuration.
    ///
    /// # Errors
    /// Returns [`StaticPlatformError`] if a certificate or account reference
    /// does not resolve, or a value is out of range.
    pub fn from_config(cfg: &StaticPlatformPluginConfig) -> Result<Self, StaticPlatformError> {
        let stats = StatsRecorder::default();
        let certificates = Arc::new(CertificatePool::from_config(&cfg.certificates)?);

        let mut contents: HashMap<StoreName, HashSet<Thumbprint>> = HashMap::new();
        for (store, names) in cfg.stores.entries() {
            let referenced_by = format!("store '{store}'");
            let entries = names
                .iter()
                .map(|name| certificates.resolve(name, &referenced_by).map(|c| c.thumbprint()))
                .collect::<Result<HashSet<_>, StaticPlatformError>>()?;
            contents.insert(store, entries);
        }
        let stores = Arc::new(StaticCertificateStore::new(
            contents,
            cfg.unavailable_stores.iter().copied().collect(),
            stats.clone(),
        ));

        let revoked = cfg
            .revoked
            .iter()
            .map(|name| certificates.resolve(name, "revocation list").map(|c| c.thumbprint()))
            .collect::<Result<HashSet<_>, StaticPlatformError>>()?;

        let accounts: Arc<[Account]> = cfg
            .accounts
            .iter()
            .map(|account| build_account(account, &certificates))
            .collect::<Result<Vec<_>, _>>()?
            .into();

        let tickets = Arc::new(TicketRegistry::default());
        for (index, account) in cfg.accounts.iter().enumerate() {
            for ticket in &account.tickets {
                tickets.register(ticket.clone().into_bytes(), index, None);
            }
        }

        let process_account = cfg
            .process_account
            .as_deref()
            .map(|name| {
                find_account(&accounts, name).ok_or_else(|| StaticPlatformError::UnknownAccount {
                    name: name.to_owned(),
                })
            })
            .transpose()?;

        let ticket_lifetime = time::Duration::try_from(cfg.ticket_lifetime).map_err(|e| {
            StaticPlatformError::Invalid {
                field: "ticket_lifetime",
                reason: e.to_string(),
            }
        })?;

        let clock: Arc<dyn Clock> = match cfg.fixed_time {
            Some(at) => Arc::new(FixedClock::at(at)),
            None => Arc::new(SystemClock),
        };

        let chain_builder = StaticChainBuilder::new(
            Arc::clone(&certificates),
            Arc::clone(&stores),
            revoked,
            cfg.capabilities.network,
            stats.clone(),
        );
        let security_package = StaticSecurityPackage::new(
            Arc::clone(&accounts),
            Arc::clone(&tickets),
            Arc::clone(&clock),
            SecurityPackageSettings {
                process_account,
                service_principals: cfg.service_principals.iter().cloned().collect(),
                ticket_lifetime,
            },
            stats.clone(),
        );

        let services = PlatformServices {
            clock,
            stores,
            chain_builder: Arc::new(chain_builder),
            logon: Arc::new(StaticLogon::new(accounts, Arc::clone(&tickets), stats.clone())),
            security_package: Arc::new(security_package),
            key_unwrapper: Arc::new(StaticKeyUnwrapper::new(cfg.key_wrap_algorithms.clone())),
            capabilities: EnvironmentCapabilities {
                network: cfg.capabilities.network,
                store_write: cfg.capabilities.store_write,
            },
        };

        tracing::debug!(
            certificates = certificates.all().len(),
            accounts = cfg.accounts.len(),
            "static platform ready"
        );
        Ok(Self {
            services,
            certificates,
            tickets,
            stats,
        })
    }

    /// Capabilities to hand to the token authentication service.
    #[must_use]
    pub fn services(&self) -> PlatformServices {
        self.services.clone()
    }

    /// A configured certificate by name.
    #[must_use]
    pub fn certificate(&self, name: &str) -> Option<Arc<Certificate>> {
        self.certificates.get(name).cloned()
    }

    #[must_use]
    pub fn stats(&self) -> PlatformStats {
        self.stats.snapshot()
    }

    /// Number of tickets the platform would accept.
    #[must_use]
    pub fn known_tickets(&self) -> usize {
        self.tickets.issued()
    }
}

fn build_account(
    config: &AccountConfig,
    certificates: &CertificatePool,
) -> Result<Account, StaticPlatformError> {
    let referenced_by = format!("account '{}'", config.name);
    let mapped = config
        .certificates
        .iter()
        .map(|name| certificates.resolve(name, &referenced_by).map(|c| c.thumbprint()))
        .collect::<Result<HashSet<_>, StaticPlatformError>>()?;

    Ok(Account {
        sid: config.sid.clone(),
        name: config.name.clone(),
        password: config.password.clone().map(SecretString::from),
        groups: config
            .groups
            .iter()
            .map(|group| GroupMembership {
                sid: group.sid.clone(),
                name: group.name.clone(),
            })
            .collect(),
        certificates: mapped,
    })
}
