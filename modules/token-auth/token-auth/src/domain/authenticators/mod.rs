//! Concrete [`token_auth_sdk::TokenAuthenticator`] implementations.

mod kerberos;
mod username;
mod windows;
mod x509;

pub use kerberos::KerberosAuthenticator;
pub use username::UserNameAuthenticator;
pub use windows::WindowsAuthenticator;
pub use x509::X509Authenticator;
