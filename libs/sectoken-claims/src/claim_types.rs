//! Well-known claim type URIs.

pub const NAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";
pub const NAME_IDENTIFIER: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
pub const UPN: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/upn";
pub const SID: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/sid";
pub const GROUP_SID: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/groupsid";
pub const THUMBPRINT: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/thumbprint";
pub const X500_DISTINGUISHED_NAME: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/x500distinguishedname";
pub const AUTHENTICATION_METHOD: &str =
    "http://schemas.microsoft.com/ws/2008/06/identity/claims/authenticationmethod";
pub const AUTHENTICATION_INSTANT: &str =
    "http://schemas.microsoft.com/ws/2008/06/identity/claims/authenticationinstant";
pub const AUTHORIZATION_DECISION: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/authorizationdecision";
pub const SYSTEM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/system";
pub const ANONYMOUS: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/anonymous";
