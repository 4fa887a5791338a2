use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity used when the caller id cannot be resolved. Matches no app-scoped template.
pub const UNKNOWN_IDENTITY: &str = "<unknown>";

/// The resolved identity of the application a request is made for (a package name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppIdentity(String);

impl AppIdentity {
    pub fn new(name: impl Into<String>) -> Self { Self(name.into()) }

    pub fn unknown() -> Self { Self(UNKNOWN_IDENTITY.to_string()) }

    pub fn is_unknown(&self) -> bool { self.0 == UNKNOWN_IDENTITY }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppIdentity {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl From<String> for AppIdentity {
    fn from(s: String) -> Self { Self(s) }
}
