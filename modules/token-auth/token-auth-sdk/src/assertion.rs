//! Signed multi-statement assertions.
//!
//! The model is already parsed and its signature already checked
//! cryptographically; validation decides whether the signer is trusted and
//! whether the conditions hold.

use time::OffsetDateTime;

use crate::keys::{KeyReference, SecurityKey};
use crate::token::SecurityToken;

#[derive(Debug, Clone)]
pub struct Assertion {
    pub id: String,
    /// Issuer name as written by the asserting party.
    pub issuer: String,
    pub issue_instant: OffsetDateTime,
    pub conditions: Option<Conditions>,
    pub statements: Vec<Statement>,
    pub signature: Option<AssertionSignature>,
}

impl Assertion {
    /// Proof-of-possession key of the first subject that carries one.
    #[must_use]
    pub fn proof_key(&self) -> Option<&SecurityKey> {
        self.statements
            .iter()
            .find_map(|s| s.subject().proof_key.as_ref())
    }

    /// An assertion is a bearer assertion when no subject proves key possession.
    #[must_use]
    pub fn is_bearer(&self) -> bool {
        self.proof_key().is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Conditions {
    pub not_before: Option<OffsetDateTime>,
    pub not_on_or_after: Option<OffsetDateTime>,
    pub audience_restrictions: Vec<AudienceRestriction>,
}

/// One audience-restriction condition; any listed audience satisfies it.
#[derive(Debug, Clone, Default)]
pub struct AudienceRestriction {
    pub audiences: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AssertionSignature {
    pub algorithm: String,
    pub signer: SignerReference,
}

/// How the signing credential is identified.
#[derive(Debug, Clone)]
pub enum SignerReference {
    /// The signing credential travels inside the signature.
    Embedded(Box<SecurityToken>),
    /// The signing credential must be resolved.
    Reference(KeyReference),
}

#[derive(Debug, Clone, Default)]
pub struct StatementSubject {
    pub name: Option<String>,
    pub name_format: Option<String>,
    pub confirmation_methods: Vec<String>,
    pub proof_key: Option<SecurityKey>,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub namespace: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
    Indeterminate,
}

impl Decision {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permit => "permit",
            Self::Deny => "deny",
            Self::Indeterminate => "indeterminate",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Attribute {
        subject: StatementSubject,
        attributes: Vec<Attribute>,
    },
    Authentication {
        subject: StatementSubject,
        method: String,
        instant: OffsetDateTime,
    },
    AuthorizationDecision {
        subject: StatementSubject,
        resource: String,
        decision: Decision,
        actions: Vec<String>,
    },
}

impl Statement {
    #[must_use]
    pub fn subject(&self) -> &StatementSubject {
        match self {
            Self::Attribute { subject, .. }
            | Self::Authentication { subject, .. }
            | Self::AuthorizationDecision { subject, .. } => subject,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::keys::SymmetricKey;

    fn assertion_with(statements: Vec<Statement>) -> Assertion {
        Assertion {
            id: "_a1".to_owned(),
            issuer: "https://idp.example.com".to_owned(),
            issue_instant: OffsetDateTime::UNIX_EPOCH,
            conditions: None,
            statements,
            signature: None,
        }
    }

    #[test]
    fn bearer_when_no_subject_has_proof_key() {
        let assertion = assertion_with(vec![Statement::Authentication {
            subject: StatementSubject::default(),
            method: "password".to_owned(),
            instant: OffsetDateTime::UNIX_EPOCH,
        }]);
        assert!(assertion.is_bearer());
    }

    #[test]
    fn proof_key_found_on_any_statement() {
        let key = SecurityKey::Symmetric(SymmetricKey::new(vec![1; 16]));
        let assertion = assertion_with(vec![
            Statement::Attribute {
                subject: StatementSubject::default(),
                attributes: Vec::new(),
            },
            Statement::Attribute {
                subject: StatementSubject {
                    proof_key: Some(key.clone()),
                    ..StatementSubject::default()
                },
                attributes: Vec::new(),
            },
        ]);
        assert_eq!(assertion.proof_key(), Some(&key));
        assert!(!assertion.is_bearer());
    }
}
