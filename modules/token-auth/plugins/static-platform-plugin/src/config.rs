use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use time::OffsetDateTime;

use token_auth_sdk::StoreName;

/// Plugin configuration.
///
/// Certificates are declared once under `certificates` and referenced by
/// `name` everywhere else.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticPlatformPluginConfig {
    /// Unix timestamp the platform clock is frozen at; the system clock when unset.
    #[serde(with = "time::serde::timestamp::option")]
    pub fixed_time: Option<OffsetDateTime>,

    pub capabilities: CapabilitiesConfig,

    pub certificates: Vec<CertificateConfig>,

    /// Store contents, by certificate name.
    pub stores: StoresConfig,

    /// Stores whose `open` fails.
    pub unavailable_stores: Vec<StoreName>,

    /// Names of revoked certificates.
    pub revoked: Vec<String>,

    pub accounts: Vec<AccountConfig>,

    /// Account used when outbound credentials are acquired without an
    /// explicit credential.
    pub process_account: Option<String>,

    /// Targets the security package can issue tickets for.
    pub service_principals: Vec<String>,

    /// Lifetime of issued service tickets.
    #[serde(with = "humantime_serde")]
    pub ticket_lifetime: Duration,

    /// Key-wrap algorithm URIs the unwrapper accepts.
    pub key_wrap_algorithms: Vec<String>,
}

impl Default for StaticPlatformPluginConfig {
    fn default() -> Self {
        Self {
            fixed_time: None,
            capabilities: CapabilitiesConfig::default(),
            certificates: Vec::new(),
            stores: StoresConfig::default(),
            unavailable_stores: Vec::new(),
            revoked: Vec::new(),
            accounts: Vec::new(),
            process_account: None,
            service_principals: Vec::new(),
            ticket_lifetime: Duration::from_secs(10 * 60 * 60),
            key_wrap_algorithms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapabilitiesConfig {
    pub network: bool,
    pub store_write: bool,
}

/// A certificate served by the platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateConfig {
    /// Reference used by stores, accounts and the revocation list.
    pub name: String,

    pub subject: String,

    /// Issuer DN; the certificate is self-signed when unset.
    #[serde(default)]
    pub issuer: Option<String>,

    #[serde(default)]
    pub serial_number: String,

    /// Unix timestamp.
    #[serde(with = "time::serde::timestamp")]
    pub not_before: OffsetDateTime,

    /// Unix timestamp, inclusive.
    #[serde(with = "time::serde::timestamp")]
    pub not_after: OffsetDateTime,

    #[serde(default)]
    pub application_policies: Vec<String>,

    #[serde(default)]
    pub certificate_policies: Vec<String>,

    #[serde(default)]
    pub upn: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoresConfig {
    pub trusted_people: Vec<String>,
    pub disallowed: Vec<String>,
    pub root: Vec<String>,
    pub nt_auth: Vec<String>,
}

impl StoresConfig {
    pub(crate) fn entries(&self) -> [(StoreName, &[String]); 4] {
        [
            (StoreName::TrustedPeople, self.trusted_people.as_slice()),
            (StoreName::Disallowed, self.disallowed.as_slice()),
            (StoreName::Root, self.root.as_slice()),
            (StoreName::NtAuth, self.nt_auth.as_slice()),
        ]
    }
}

/// A platform account.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub sid: String,

    /// Logon name, e.g. `CORP\alice`.
    pub name: String,

    /// Password for password logon; the account cannot log on with a
    /// password when unset.
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,

    /// Pre-issued service tickets that resolve to this account.
    #[serde(default)]
    pub tickets: Vec<String>,

    /// Names of certificates mapped to this account.
    #[serde(default)]
    pub certificates: Vec<String>,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("sid", &self.sid)
            .field("name", &self.name)
            .field("groups", &self.groups)
            .field("certificates", &self.certificates)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub sid: String,
    #[serde(default)]
    pub name: Option<String>,
}
