//! Process-wide handle to the active rule set.
//!
//! Single writer, many readers: `snapshot()` clones an `Arc` under a short read lock and the
//! request then works on that immutable snapshot; `replace()` swaps in a new set wholesale.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use super::RuleSet;
use crate::error::EngineResult;
use crate::paths::AliasRoots;

pub struct RuleStore {
    current: RwLock<Arc<RuleSet>>,
    epoch: AtomicU64,
    roots: AliasRoots,
}

impl RuleStore {
    pub fn new(roots: AliasRoots) -> Self {
        Self::with_rules(roots, RuleSet::empty())
    }

    pub fn with_rules(roots: AliasRoots, rules: RuleSet) -> Self {
        let rules = rules.canonicalized(&roots);
        Self { current: RwLock::new(Arc::new(rules)), epoch: AtomicU64::new(1), roots }
    }

    pub fn roots(&self) -> &AliasRoots { &self.roots }

    /// The active rule set. Stays valid and unchanged for as long as the caller holds it.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.read().clone()
    }

    /// Bumped on every replacement.
    pub fn epoch(&self) -> u64 { self.epoch.load(Ordering::Acquire) }

    /// Install a new rule set and return the new epoch.
    pub fn replace(&self, rules: RuleSet) -> u64 {
        let rules = Arc::new(rules.canonicalized(&self.roots));
        let count = rules.len();
        *self.current.write() = rules;
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        info!(target: "mediashield", "rule set replaced: templates={}, epoch={}", count, epoch);
        epoch
    }

    /// Parse and install serialized templates. On error the previous rule set stays active.
    pub fn reload_json(&self, json: &str) -> EngineResult<u64> {
        match RuleSet::from_json(json) {
            Ok(rules) => Ok(self.replace(rules)),
            Err(e) => {
                warn!(target: "mediashield", "rule reload rejected, keeping epoch {}: {}", self.epoch(), e);
                Err(e)
            }
        }
    }

    pub fn reload_file(&self, path: &Path) -> EngineResult<u64> {
        let text = std::fs::read_to_string(path)?;
        self.reload_json(&text)
    }
}
