pub mod certificates;
pub mod chain;
pub mod logon;
pub mod security_package;
pub mod service;
pub mod stats;
pub mod stores;
pub mod unwrap;

/// Native status codes reported through [`token_auth_sdk::PlatformError`].
pub mod codes {
    /// Unknown user name or bad password.
    pub const ERROR_LOGON_FAILURE: i32 = 1326;
    pub const SEC_E_LOGON_DENIED: i32 = -2_146_893_044;
    pub const SEC_E_INVALID_TOKEN: i32 = -2_146_893_048;
    pub const SEC_E_NO_CREDENTIALS: i32 = -2_146_893_042;
    pub const SEC_E_TARGET_UNKNOWN: i32 = -2_146_893_053;
    pub const SEC_E_BAD_BINDINGS: i32 = -2_146_892_986;
    pub const CRYPT_E_NOT_FOUND: i32 = -2_146_885_628;
}
