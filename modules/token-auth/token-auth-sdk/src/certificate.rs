//! Certificate model consumed by trust evaluation.
//!
//! Certificates arrive already decoded; the framework never parses DER.
//! The encoded bytes are kept only to derive a stable [`Thumbprint`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// SHA-256 digest of a certificate's encoded form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Thumbprint([u8; 32]);

impl Thumbprint {
    #[must_use]
    pub fn of(encoded: &[u8]) -> Self {
        Self(Sha256::digest(encoded).into())
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thumbprint({self})")
    }
}

impl FromStr for Thumbprint {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Public key carried by a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    pub algorithm: String,
    pub bytes: Vec<u8>,
}

/// Decoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    subject: String,
    issuer: String,
    serial_number: String,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    public_key: PublicKey,
    application_policies: Vec<String>,
    certificate_policies: Vec<String>,
    upn: Option<String>,
    encoded: Arc<[u8]>,
    thumbprint: Thumbprint,
}

impl Certificate {
    /// Starts a builder over the certificate's encoded bytes.
    #[must_use]
    pub fn builder(encoded: impl Into<Vec<u8>>) -> CertificateBuilder {
        CertificateBuilder::new(encoded.into())
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    #[must_use]
    pub fn not_before(&self) -> OffsetDateTime {
        self.not_before
    }

    #[must_use]
    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }

    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Extended key usage OIDs.
    #[must_use]
    pub fn application_policies(&self) -> &[String] {
        &self.application_policies
    }

    #[must_use]
    pub fn certificate_policies(&self) -> &[String] {
        &self.certificate_policies
    }

    /// User principal name from the subject alternative name, if present.
    #[must_use]
    pub fn upn(&self) -> Option<&str> {
        self.upn.as_deref()
    }

    #[must_use]
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    #[must_use]
    pub fn thumbprint(&self) -> Thumbprint {
        self.thumbprint
    }

    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }

    #[must_use]
    pub fn is_time_valid_at(&self, at: OffsetDateTime) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// Builder for [`Certificate`].
#[derive(Debug, Clone)]
#[must_use]
pub struct CertificateBuilder {
    encoded: Vec<u8>,
    subject: String,
    issuer: Option<String>,
    serial_number: String,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    public_key: PublicKey,
    application_policies: Vec<String>,
    certificate_policies: Vec<String>,
    upn: Option<String>,
}

impl CertificateBuilder {
    fn new(encoded: Vec<u8>) -> Self {
        Self {
            encoded,
            subject: String::new(),
            issuer: None,
            serial_number: String::new(),
            not_before: OffsetDateTime::UNIX_EPOCH,
            not_after: OffsetDateTime::UNIX_EPOCH,
            public_key: PublicKey {
                algorithm: "none".to_owned(),
                bytes: Vec::new(),
            },
            application_policies: Vec::new(),
            certificate_policies: Vec::new(),
            upn: None,
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Issuer distinguished name; defaults to the subject (self-signed).
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = serial.into();
        self
    }

    pub fn validity(mut self, not_before: OffsetDateTime, not_after: OffsetDateTime) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn public_key(mut self, algorithm: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.public_key = PublicKey {
            algorithm: algorithm.into(),
            bytes: bytes.into(),
        };
        self
    }

    pub fn application_policies(mut self, oids: Vec<String>) -> Self {
        self.application_policies = oids;
        self
    }

    pub fn certificate_policies(mut self, oids: Vec<String>) -> Self {
        self.certificate_policies = oids;
        self
    }

    pub fn upn(mut self, upn: impl Into<String>) -> Self {
        self.upn = Some(upn.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Certificate {
        let thumbprint = Thumbprint::of(&self.encoded);
        let issuer = self.issuer.unwrap_or_else(|| self.subject.clone());
        Certificate {
            subject: self.subject,
            issuer,
            serial_number: self.serial_number,
            not_before: self.not_before,
            not_after: self.not_after,
            public_key: self.public_key,
            application_policies: self.application_policies,
            certificate_policies: self.certificate_policies,
            upn: self.upn,
            encoded: self.encoded.into(),
            thumbprint,
        }
    }
}
