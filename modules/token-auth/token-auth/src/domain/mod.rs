pub mod account_mapping;
pub mod assertion;
pub mod authenticators;
pub mod kerberos_provider;
pub mod keys;
pub mod pending;
pub mod replay;
pub mod service;
pub mod trust;
