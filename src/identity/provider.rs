use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use super::principal::AppIdentity;

/// External lookup from an OS-level numeric caller id to an application identity.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, uid: u32) -> Option<AppIdentity>;

    /// Resolution never aborts a request: a miss degrades to the unknown pseudo-identity.
    fn resolve_or_unknown(&self, uid: u32) -> AppIdentity {
        match self.resolve(uid) {
            Some(id) => id,
            None => {
                debug!(target: "mediashield", "identity miss for uid {}", uid);
                AppIdentity::unknown()
            }
        }
    }
}

/// Map-backed resolver, seeded from configuration and updatable as packages come and go.
#[derive(Debug, Default)]
pub struct StaticIdentityResolver {
    by_uid: RwLock<HashMap<u32, AppIdentity>>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self { Self::default() }

    pub fn from_map<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, AppIdentity)>,
    {
        Self { by_uid: RwLock::new(entries.into_iter().collect()) }
    }

    pub fn insert(&self, uid: u32, identity: impl Into<AppIdentity>) {
        self.by_uid.write().insert(uid, identity.into());
    }

    pub fn remove(&self, uid: u32) -> Option<AppIdentity> {
        self.by_uid.write().remove(&uid)
    }

    pub fn len(&self) -> usize { self.by_uid.read().len() }

    pub fn is_empty(&self) -> bool { self.by_uid.read().is_empty() }
}

impl IdentityResolver for StaticIdentityResolver {
    fn resolve(&self, uid: u32) -> Option<AppIdentity> {
        self.by_uid.read().get(&uid).cloned()
    }
}
