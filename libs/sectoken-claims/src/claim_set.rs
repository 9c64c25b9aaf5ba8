//! Ordered claim collections with issuer provenance.

use std::sync::{Arc, LazyLock};

use crate::claim::{Claim, Right};
use crate::claim_types;

static SYSTEM: LazyLock<Arc<ClaimSet>> = LazyLock::new(|| {
    Arc::new(ClaimSet {
        claims: vec![
            Claim::identity(claim_types::SYSTEM, "System"),
            Claim::possess(claim_types::SYSTEM, "System"),
        ],
        issuer: Issuer::System,
    })
});

static ANONYMOUS: LazyLock<Arc<ClaimSet>> = LazyLock::new(|| {
    Arc::new(ClaimSet {
        claims: vec![Claim::identity(claim_types::ANONYMOUS, "Anonymous")],
        issuer: Issuer::Anonymous,
    })
});

/// Who vouched for a [`ClaimSet`].
///
/// A parent claim set must exist before the set it issues and claim sets
/// are immutable, so an issuer chain cannot loop back on itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issuer {
    /// The framework itself.
    System,
    /// Nobody in particular.
    Anonymous,
    /// The claim set vouches for itself.
    SelfIssued,
    /// Another claim set.
    ClaimSet(Arc<ClaimSet>),
}

impl Issuer {
    /// Returns `true` for the terminal issuers (`System`, `Anonymous`, `SelfIssued`).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::ClaimSet(_))
    }
}

/// Immutable, ordered collection of claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    claims: Vec<Claim>,
    issuer: Issuer,
}

impl ClaimSet {
    #[must_use]
    pub fn new(claims: Vec<Claim>, issuer: Issuer) -> Self {
        Self { claims, issuer }
    }

    #[must_use]
    pub fn self_issued(claims: Vec<Claim>) -> Self {
        Self::new(claims, Issuer::SelfIssued)
    }

    #[must_use]
    pub fn issued_by(claims: Vec<Claim>, issuer: Arc<ClaimSet>) -> Self {
        Self::new(claims, Issuer::ClaimSet(issuer))
    }

    /// The process-wide system sentinel.
    #[must_use]
    pub fn system() -> Arc<ClaimSet> {
        Arc::clone(&SYSTEM)
    }

    /// The process-wide anonymous sentinel.
    #[must_use]
    pub fn anonymous() -> Arc<ClaimSet> {
        Arc::clone(&ANONYMOUS)
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.issuer == Issuer::Anonymous && self.claims == ANONYMOUS.claims
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        self.issuer == Issuer::System && self.claims == SYSTEM.claims
    }

    #[inline]
    #[must_use]
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    #[inline]
    #[must_use]
    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Claims of `claim_type`, optionally restricted to one [`Right`].
    pub fn find_claims<'a>(
        &'a self,
        claim_type: &'a str,
        right: Option<Right>,
    ) -> impl Iterator<Item = &'a Claim> + 'a {
        self.claims.iter().filter(move |c| {
            c.claim_type() == claim_type && right.is_none_or(|r| c.right() == r)
        })
    }

    /// First identity claim, if any.
    #[must_use]
    pub fn identity_claim(&self) -> Option<&Claim> {
        self.claims.iter().find(|c| c.right() == Right::Identity)
    }

    #[must_use]
    pub fn contains_claim(&self, claim: &Claim) -> bool {
        self.claims.contains(claim)
    }

    /// Issuing claim sets from the direct issuer upwards, excluding `self`.
    pub fn issuer_chain(&self) -> impl Iterator<Item = &ClaimSet> {
        std::iter::successors(parent_of(self), |set| parent_of(*set))
    }

    /// The terminal issuer the chain ends at.
    #[must_use]
    pub fn root_issuer(&self) -> &Issuer {
        self.issuer_chain().last().unwrap_or(self).issuer()
    }
}

fn parent_of(set: &ClaimSet) -> Option<&ClaimSet> {
    match set.issuer() {
        Issuer::ClaimSet(parent) => Some(parent.as_ref()),
        Issuer::System | Issuer::Anonymous | Issuer::SelfIssued => None,
    }
}
