use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use time::Duration;

use token_auth_sdk::platform::{
    Clock, CredentialHandle, KerberosGrant, NetworkCredential, SecurityPackage,
};
use token_auth_sdk::{ImpersonationLevel, PlatformError, SymmetricKey};

use super::codes::{SEC_E_LOGON_DENIED, SEC_E_NO_CREDENTIALS, SEC_E_TARGET_UNKNOWN};
use super::logon::{Account, TicketRegistry, find_account};
use super::stats::StatsRecorder;

/// Issues service tickets for the configured targets.
///
/// Issued tickets are registered with the platform so that
/// [`super::logon::StaticLogon`] accepts them.
pub struct StaticSecurityPackage {
    accounts: Arc<[Account]>,
    process_account: Option<usize>,
    service_principals: HashSet<String>,
    tickets: Arc<TicketRegistry>,
    clock: Arc<dyn Clock>,
    ticket_lifetime: Duration,
    serial: AtomicU64,
    stats: StatsRecorder,
}

pub(crate) struct SecurityPackageSettings {
    pub(crate) process_account: Option<usize>,
    pub(crate) service_principals: HashSet<String>,
    pub(crate) ticket_lifetime: Duration,
}

impl StaticSecurityPackage {
    pub(crate) fn new(
        accounts: Arc<[Account]>,
        tickets: Arc<TicketRegistry>,
        clock: Arc<dyn Clock>,
        settings: SecurityPackageSettings,
        stats: StatsRecorder,
    ) -> Self {
        Self {
            accounts,
            process_account: settings.process_account,
            service_principals: settings.service_principals,
            tickets,
            clock,
            ticket_lifetime: settings.ticket_lifetime,
            serial: AtomicU64::new(1),
            stats,
        }
    }

    fn account_for(&self, credential: Option<&NetworkCredential>) -> Result<usize, PlatformError> {
        let Some(credential) = credential else {
            return self.process_account.ok_or_else(|| {
                PlatformError::new(
                    "acquire_credentials",
                    SEC_E_NO_CREDENTIALS,
                    "no process identity is configured",
                )
            });
        };

        let logon_name = match &credential.domain {
            Some(domain) => format!("{domain}\\{}", credential.user_name),
            None => credential.user_name.clone(),
        };
        find_account(&self.accounts, &logon_name)
            .filter(|index| self.accounts[*index].password_matches(&credential.password))
            .ok_or_else(|| {
                PlatformError::new(
                    "acquire_credentials",
                    SEC_E_LOGON_DENIED,
                    "the credential was rejected",
                )
            })
    }
}

struct StaticCredentialHandle<'a> {
    package: &'a StaticSecurityPackage,
    account: usize,
}

impl CredentialHandle for StaticCredentialHandle<'_> {
    fn initialize_context(
        &self,
        service_principal_name: &str,
        level: ImpersonationLevel,
        channel_binding: Option<&[u8]>,
    ) -> Result<KerberosGrant, PlatformError> {
        let package = self.package;
        if !package.service_principals.contains(service_principal_name) {
            return Err(PlatformError::new(
                "initialize_context",
                SEC_E_TARGET_UNKNOWN,
                format!("target '{service_principal_name}' is unknown"),
            ));
        }

        let serial = package.serial.fetch_add(1, Ordering::Relaxed);
        let account = &package.accounts[self.account];
        let ticket =
            format!("static-krb|{}|{service_principal_name}|{level}|{serial}", account.sid)
                .into_bytes();
        let session_key = SymmetricKey::new(Sha256::digest(&ticket).to_vec());
        package
            .tickets
            .register(ticket.clone(), self.account, channel_binding.map(<[u8]>::to_vec));

        let valid_from = package.clock.now();
        tracing::debug!(account = %account.name, spn = service_principal_name, "ticket issued");
        Ok(KerberosGrant {
            ticket,
            session_key: Some(session_key),
            valid_from,
            valid_to: valid_from.saturating_add(package.ticket_lifetime),
        })
    }
}

impl Drop for StaticCredentialHandle<'_> {
    fn drop(&mut self) {
        self.package
            .stats
            .update(|s| s.credential_handles_open -= 1);
    }
}

impl SecurityPackage for StaticSecurityPackage {
    fn acquire_credentials(
        &self,
        credential: Option<&NetworkCredential>,
    ) -> Result<Box<dyn CredentialHandle + '_>, PlatformError> {
        let account = self.account_for(credential)?;
        self.stats.update(|s| {
            s.credential_handles_acquired += 1;
            s.credential_handles_open += 1;
        });
        Ok(Box::new(StaticCredentialHandle {
            package: self,
            account,
        }))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use time::OffsetDateTime;
    use token_auth_sdk::platform::{FixedClock, PlatformLogon};

    use crate::domain::logon::StaticLogon;

    fn fixture() -> (StaticSecurityPackage, StaticLogon, StatsRecorder) {
        fixture_with_lifetime(Duration::hours(1))
    }

    fn fixture_with_lifetime(
        ticket_lifetime: Duration,
    ) -> (StaticSecurityPackage, StaticLogon, StatsRecorder) {
        let accounts: Arc<[Account]> = Arc::from(vec![Account {
            sid: "S-1-5-21-7-1002".to_owned(),
            name: "CORP\\svc-web".to_owned(),
            password: Some(SecretString::from("s3rvice".to_owned())),
            groups: Vec::new(),
            certificates: HashSet::new(),
        }]);
        let tickets = Arc::new(TicketRegistry::default());
        let stats = StatsRecorder::default();
        let package = StaticSecurityPackage::new(
            Arc::clone(&accounts),
            Arc::clone(&tickets),
            Arc::new(FixedClock::at(OffsetDateTime::UNIX_EPOCH)),
            SecurityPackageSettings {
                process_account: Some(0),
                service_principals: HashSet::from(["HTTP/api.corp.example".to_owned()]),
                ticket_lifetime,
            },
            stats.clone(),
        );
        let logon = StaticLogon::new(accounts, tickets, stats.clone());
        (package, logon, stats)
    }

    #[test]
    fn issued_ticket_is_accepted_by_logon() {
        let (package, logon, stats) = fixture();
        let grant = {
            let handle = package.acquire_credentials(None).unwrap();
            handle
                .initialize_context("HTTP/api.corp.example", ImpersonationLevel::Identification, None)
                .unwrap()
        };
        assert_eq!(grant.valid_to - grant.valid_from, Duration::hours(1));
        assert_eq!(grant.session_key.as_ref().map(SymmetricKey::len), Some(32));

        let identity = logon.accept_ticket(&grant.ticket, None).unwrap();
        assert_eq!(identity.name, "CORP\\svc-web");

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.credential_handles_acquired, 1);
        assert_eq!(snapshot.credential_handles_open, 0);
    }

    #[test]
    fn explicit_credential_must_match_an_account() {
        let (package, _, stats) = fixture();
        let good = NetworkCredential {
            user_name: "svc-web".to_owned(),
            domain: Some("CORP".to_owned()),
            password: SecretString::from("s3rvice".to_owned()),
        };
        let bad = NetworkCredential {
            user_name: "svc-web".to_owned(),
            domain: Some("CORP".to_owned()),
            password: SecretString::from("guess".to_owned()),
        };

        assert!(package.acquire_credentials(Some(&good)).is_ok());
        let err = package.acquire_credentials(Some(&bad)).err().unwrap();
        assert_eq!(err.native_code, SEC_E_LOGON_DENIED);
        assert_eq!(stats.snapshot().credential_handles_acquired, 1);
    }

    #[test]
    fn unknown_target_is_refused_and_handle_released() {
        let (package, _, stats) = fixture();
        let err = {
            let handle = package.acquire_credentials(None).unwrap();
            handle
                .initialize_context("HTTP/elsewhere", ImpersonationLevel::Identification, None)
                .unwrap_err()
        };
        assert_eq!(err.native_code, SEC_E_TARGET_UNKNOWN);
        assert_eq!(stats.snapshot().credential_handles_open, 0);
    }

    #[test]
    fn ticket_lifetime_saturates_at_the_latest_instant() {
        let (package, _, _) = fixture_with_lifetime(Duration::MAX);
        let handle = package.acquire_credentials(None).unwrap();
        let grant = handle
            .initialize_context("HTTP/api.corp.example", ImpersonationLevel::Identification, None)
            .unwrap();
        assert_eq!(grant.valid_from, OffsetDateTime::UNIX_EPOCH);
        assert!(grant.valid_to > grant.valid_from);
    }
}
