/// Errors detected while loading the plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StaticPlatformError {
    #[error("certificate '{name}' is declared more than once")]
    DuplicateCertificate { name: String },

    #[error("{referenced_by} references unknown certificate '{name}'")]
    UnknownCertificate { name: String, referenced_by: String },

    #[error("process account '{name}' is not a configured account")]
    UnknownAccount { name: String },

    #[error("invalid configuration for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
