use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};

use token_auth_sdk::platform::{GroupMembership, PlatformIdentity, PlatformLogon};
use token_auth_sdk::{Certificate, PlatformError, Thumbprint};

use super::codes::{
    ERROR_LOGON_FAILURE, SEC_E_BAD_BINDINGS, SEC_E_INVALID_TOKEN, SEC_E_NO_CREDENTIALS,
};
use super::stats::StatsRecorder;

pub(crate) struct Account {
    pub(crate) sid: String,
    pub(crate) name: String,
    pub(crate) password: Option<SecretString>,
    pub(crate) groups: Vec<GroupMembership>,
    pub(crate) certificates: HashSet<Thumbprint>,
}

impl Account {
    fn identity(&self, authentication_type: &str) -> PlatformIdentity {
        PlatformIdentity {
            sid: self.sid.clone(),
            name: self.name.clone(),
            authentication_type: authentication_type.to_owned(),
            groups: self.groups.clone(),
        }
    }

    pub(crate) fn password_matches(&self, candidate: &SecretString) -> bool {
        self.password
            .as_ref()
            .is_some_and(|password| password.expose_secret() == candidate.expose_secret())
    }
}

/// Finds an account by logon name, ignoring ASCII case.
pub(crate) fn find_account(accounts: &[Account], name: &str) -> Option<usize> {
    accounts
        .iter()
        .position(|account| account.name.eq_ignore_ascii_case(name))
}

struct IssuedTicket {
    account: usize,
    channel_binding: Option<Vec<u8>>,
}

/// Tickets known to the platform: configured ones and those issued by the
/// security package.
#[derive(Default)]
pub(crate) struct TicketRegistry {
    tickets: Mutex<HashMap<Vec<u8>, IssuedTicket>>,
}

impl TicketRegistry {
    pub(crate) fn register(
        &self,
        ticket: Vec<u8>,
        account: usize,
        channel_binding: Option<Vec<u8>>,
    ) {
        self.tickets.lock().insert(
            ticket,
            IssuedTicket {
                account,
                channel_binding,
            },
        );
    }

    pub(crate) fn issued(&self) -> usize {
        self.tickets.lock().len()
    }

    fn accept(&self, ticket: &[u8], channel_binding: Option<&[u8]>) -> Result<usize, PlatformError> {
        let tickets = self.tickets.lock();
        let Some(issued) = tickets.get(ticket) else {
            return Err(PlatformError::new(
                "accept_ticket",
                SEC_E_INVALID_TOKEN,
                "the ticket is not recognized",
            ));
        };
        if let Some(expected) = &issued.channel_binding
            && channel_binding != Some(expected.as_slice())
        {
            return Err(PlatformError::new(
                "accept_ticket",
                SEC_E_BAD_BINDINGS,
                "channel binding does not match the ticket",
            ));
        }
        Ok(issued.account)
    }
}

/// Logon against the configured accounts.
pub struct StaticLogon {
    accounts: Arc<[Account]>,
    tickets: Arc<TicketRegistry>,
    stats: StatsRecorder,
}

impl StaticLogon {
    pub(crate) fn new(
        accounts: Arc<[Account]>,
        tickets: Arc<TicketRegistry>,
        stats: StatsRecorder,
    ) -> Self {
        Self {
            accounts,
            tickets,
            stats,
        }
    }
}

impl PlatformLogon for StaticLogon {
    fn logon_user(
        &self,
        user_name: &str,
        password: &SecretString,
    ) -> Result<PlatformIdentity, PlatformError> {
        self.stats.update(|s| s.password_logons += 1);
        find_account(&self.accounts, user_name)
            .map(|index| &self.accounts[index])
            .filter(|account| account.password_matches(password))
            .map(|account| account.identity("Password"))
            .ok_or_else(|| {
                PlatformError::new(
                    "logon_user",
                    ERROR_LOGON_FAILURE,
                    "unknown user name or bad password",
                )
            })
    }

    fn accept_ticket(
        &self,
        ticket: &[u8],
        channel_binding: Option<&[u8]>,
    ) -> Result<PlatformIdentity, PlatformError> {
        self.stats.update(|s| s.ticket_acceptances += 1);
        let index = self.tickets.accept(ticket, channel_binding)?;
        Ok(self.accounts[index].identity("Kerberos"))
    }

    fn logon_certificate(
        &self,
        certificate: &Certificate,
    ) -> Result<PlatformIdentity, PlatformError> {
        self.stats.update(|s| s.certificate_logons += 1);
        let thumbprint = certificate.thumbprint();
        self.accounts
            .iter()
            .find(|account| account.certificates.contains(&thumbprint))
            .map(|account| account.identity("Certificate"))
            .ok_or_else(|| {
                PlatformError::new(
                    "logon_certificate",
                    SEC_E_NO_CREDENTIALS,
                    "no account is mapped to the certificate",
                )
            })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn logon() -> (StaticLogon, StatsRecorder) {
        let accounts: Arc<[Account]> = Arc::from(vec![Account {
            sid: "S-1-5-21-7-1001".to_owned(),
            name: "CORP\\alice".to_owned(),
            password: Some(SecretString::from("correct horse".to_owned())),
            groups: vec![GroupMembership {
                sid: "S-1-5-21-7-513".to_owned(),
                name: None,
            }],
            certificates: HashSet::from([Thumbprint::of(b"alice-cert")]),
        }]);
        let tickets = Arc::new(TicketRegistry::default());
        tickets.register(b"bound".to_vec(), 0, Some(b"tls-unique".to_vec()));
        tickets.register(b"unbound".to_vec(), 0, None);
        let stats = StatsRecorder::default();
        (StaticLogon::new(accounts, tickets, stats.clone()), stats)
    }

    #[test]
    fn password_logon_ignores_name_case() {
        let (logon, stats) = logon();
        let identity = logon
            .logon_user("corp\\ALICE", &SecretString::from("correct horse".to_owned()))
            .unwrap();
        assert_eq!(identity.sid, "S-1-5-21-7-1001");
        assert_eq!(identity.groups.len(), 1);

        let err = logon
            .logon_user("CORP\\alice", &SecretString::from("wrong".to_owned()))
            .unwrap_err();
        assert_eq!(err.native_code, ERROR_LOGON_FAILURE);
        assert_eq!(stats.snapshot().password_logons, 2);
    }

    #[test]
    fn ticket_channel_binding_must_match() {
        let (logon, _) = logon();
        assert!(logon.accept_ticket(b"bound", Some(b"tls-unique".as_slice())).is_ok());
        assert_eq!(
            logon.accept_ticket(b"bound", None).unwrap_err().native_code,
            SEC_E_BAD_BINDINGS
        );
        assert!(logon.accept_ticket(b"unbound", Some(b"anything".as_slice())).is_ok());
        assert_eq!(
            logon.accept_ticket(b"forged", None).unwrap_err().native_code,
            SEC_E_INVALID_TOKEN
        );
    }
}
