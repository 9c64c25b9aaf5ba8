//! Authorization policies: claim sets bound to a validity window.

use std::sync::Arc;

use time::OffsetDateTime;
use time::macros::datetime;

use crate::claim_set::{ClaimSet, Issuer};

static NO_ISSUER: Issuer = Issuer::Anonymous;

/// Returned by [`ValidityWindow::new`] when the bounds are inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("validity window starts at {valid_from} after it ends at {valid_to}")]
pub struct InvalidWindow {
    pub valid_from: OffsetDateTime,
    pub valid_to: OffsetDateTime,
}

/// Closed interval `[valid_from, valid_to]`; `valid_from <= valid_to` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidityWindow {
    valid_from: OffsetDateTime,
    valid_to: OffsetDateTime,
}

impl ValidityWindow {
    pub const MIN: OffsetDateTime = datetime!(0001-01-01 0:00 UTC);
    pub const MAX: OffsetDateTime = datetime!(9999-12-31 23:59:59 UTC);

    /// # Errors
    /// Returns [`InvalidWindow`] if `valid_from > valid_to`.
    pub fn new(valid_from: OffsetDateTime, valid_to: OffsetDateTime) -> Result<Self, InvalidWindow> {
        if valid_from > valid_to {
            return Err(InvalidWindow {
                valid_from,
                valid_to,
            });
        }
        Ok(Self {
            valid_from,
            valid_to,
        })
    }

    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            valid_from: Self::MIN,
            valid_to: Self::MAX,
        }
    }

    /// Window that opens at `valid_from` and never closes.
    #[must_use]
    pub const fn starting_at(valid_from: OffsetDateTime) -> Self {
        Self {
            valid_from,
            valid_to: Self::MAX,
        }
    }

    /// Window built from optional bounds; a missing bound is open.
    ///
    /// # Errors
    /// Returns [`InvalidWindow`] if both bounds are present and inverted.
    pub fn from_bounds(
        valid_from: Option<OffsetDateTime>,
        valid_to: Option<OffsetDateTime>,
    ) -> Result<Self, InvalidWindow> {
        Self::new(
            valid_from.unwrap_or(Self::MIN),
            valid_to.unwrap_or(Self::MAX),
        )
    }

    #[inline]
    #[must_use]
    pub fn valid_from(&self) -> OffsetDateTime {
        self.valid_from
    }

    #[inline]
    #[must_use]
    pub fn valid_to(&self) -> OffsetDateTime {
        self.valid_to
    }

    #[must_use]
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.valid_from <= at && at <= self.valid_to
    }
}

/// The unit returned by token validation.
///
/// `Composite` is used when one credential yields several identity views,
/// e.g. a certificate identity and the platform account it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationPolicy {
    Single {
        claim_set: Arc<ClaimSet>,
        window: ValidityWindow,
    },
    Composite {
        claim_sets: Vec<Arc<ClaimSet>>,
        window: ValidityWindow,
    },
}

impl AuthorizationPolicy {
    #[must_use]
    pub fn single(claim_set: Arc<ClaimSet>, window: ValidityWindow) -> Self {
        Self::Single { claim_set, window }
    }

    #[must_use]
    pub fn composite(claim_sets: Vec<Arc<ClaimSet>>, window: ValidityWindow) -> Self {
        Self::Composite { claim_sets, window }
    }

    #[must_use]
    pub fn claim_sets(&self) -> &[Arc<ClaimSet>] {
        match self {
            Self::Single { claim_set, .. } => std::slice::from_ref(claim_set),
            Self::Composite { claim_sets, .. } => claim_sets,
        }
    }

    /// First claim set of the policy, if it has one.
    #[must_use]
    pub fn primary_claim_set(&self) -> Option<&Arc<ClaimSet>> {
        self.claim_sets().first()
    }

    #[must_use]
    pub fn window(&self) -> ValidityWindow {
        match self {
            Self::Single { window, .. } | Self::Composite { window, .. } => *window,
        }
    }

    /// Issuer of the primary claim set; `Anonymous` when there is none.
    #[must_use]
    pub fn issuer(&self) -> &Issuer {
        self.primary_claim_set()
            .map_or(&NO_ISSUER, |set| set.issuer())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{Claim, claim_types};
    use time::Duration;

    #[test]
    fn window_rejects_inverted_bounds() {
        let now = OffsetDateTime::now_utc();
        let err = ValidityWindow::new(now, now - Duration::seconds(1)).unwrap_err();
        assert_eq!(err.valid_from, now);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = OffsetDateTime::now_utc();
        let window = ValidityWindow::new(now, now + Duration::minutes(5)).unwrap();
        assert!(window.contains(now));
        assert!(window.contains(now + Duration::minutes(5)));
        assert!(!window.contains(now + Duration::minutes(6)));
        assert!(ValidityWindow::unbounded().contains(now));
    }

    #[test]
    fn composite_policy_exposes_all_sets_in_order() {
        let a = Arc::new(ClaimSet::self_issued(vec![Claim::identity(
            claim_types::NAME,
            "cert",
        )]));
        let b = Arc::new(ClaimSet::self_issued(vec![Claim::identity(
            claim_types::SID,
            "S-1-5-21-7",
        )]));
        let policy = AuthorizationPolicy::composite(
            vec![Arc::clone(&a), Arc::clone(&b)],
            ValidityWindow::unbounded(),
        );

        assert_eq!(policy.claim_sets().len(), 2);
        assert!(Arc::ptr_eq(policy.primary_claim_set().unwrap(), &a));
        assert_eq!(policy.issuer(), &Issuer::SelfIssued);
    }

    #[test]
    fn empty_composite_reports_anonymous_issuer() {
        let policy = AuthorizationPolicy::composite(Vec::new(), ValidityWindow::unbounded());
        assert!(policy.primary_claim_set().is_none());
        assert_eq!(policy.issuer(), &Issuer::Anonymous);
    }
}
