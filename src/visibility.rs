//! Visibility filter: type restriction and hidden path prefixes.

use crate::paths;
use crate::rules::{Template, TypeCode};

/// Why an entry is hidden, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenBy<'a> {
    Type { template: &'a str },
    Prefix { template: &'a str, prefix: &'a str },
}

/// First template constraint that hides `path`, if any.
pub fn hidden_by<'a>(templates: &[&'a Template], path: &str, type_code: TypeCode) -> Option<HiddenBy<'a>> {
    for t in templates {
        if !t.permits_type(type_code) {
            return Some(HiddenBy::Type { template: t.name() });
        }
        if let Some(prefix) = t.hide_prefixes().iter().find(|p| paths::contains(p, path)) {
            return Some(HiddenBy::Prefix { template: t.name(), prefix });
        }
    }
    None
}

/// True iff some template restricts types and excludes `type_code`, or hides a prefix of `path`.
pub fn is_hidden(templates: &[&Template], path: &str, type_code: TypeCode) -> bool {
    hidden_by(templates, path, type_code).is_some()
}
