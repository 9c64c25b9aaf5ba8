#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Static platform plugin
//!
//! Certificate stores, chain building, logon and a Kerberos security package
//! backed by configuration instead of an operating system. Intended for
//! development and tests; [`StaticPlatform::stats`] exposes call and handle
//! counters.

pub mod config;
pub mod domain;
pub mod error;

pub use config::StaticPlatformPluginConfig;
pub use domain::codes;
pub use domain::service::StaticPlatform;
pub use domain::stats::PlatformStats;
pub use domain::unwrap::{StaticKeyUnwrapper, wrap};
pub use error::StaticPlatformError;
