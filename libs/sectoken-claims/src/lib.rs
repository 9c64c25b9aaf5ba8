#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Identity claims and the policies that bind them to a validity window.
//!
//! - [`Claim`] - a single immutable fact about an identity
//! - [`ClaimSet`] - ordered claims plus issuer provenance
//! - [`AuthorizationPolicy`] - one or more claim sets sharing a [`ValidityWindow`]
//!
//! Every issuer chain ends at one of two process-wide sentinels,
//! [`ClaimSet::system`] or [`ClaimSet::anonymous`].

pub mod claim;
pub mod claim_set;
pub mod claim_types;
pub mod policy;

pub use claim::{Claim, ClaimValue, Right};
pub use claim_set::{ClaimSet, Issuer};
pub use policy::{AuthorizationPolicy, InvalidWindow, ValidityWindow};
