use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::Engine;
use crate::audit::AuditRecord;
use crate::error::EngineError;
use crate::identity::RequestContext;
use crate::mime::MEDIA_TYPE_NONE;
use crate::paths;
use crate::resolver;
use crate::rules::{self, RuleSet};

/// Filesystem side effect of a redirected directory creation.
pub trait DirectoryMaker: Send + Sync {
    /// Create `path` and any missing parents. Succeeds when it already exists.
    fn create_all(&self, path: &Path) -> std::io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdDirectoryMaker;

impl DirectoryMaker for StdDirectoryMaker {
    fn create_all(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DirectoryDecision {
    /// The redirect target was created; the original path was not.
    Redirected { original: String, created: String },
    /// No rule applies; the host creates the directory itself.
    Permitted,
    /// A non-standard top-level directory under the storage root.
    Rejected { reason: String },
    /// The redirect target could not be created.
    Failed { target: String, error: EngineError },
}

impl DirectoryDecision {
    pub fn success(&self) -> bool {
        matches!(self, DirectoryDecision::Redirected { .. } | DirectoryDecision::Permitted)
    }

    pub fn created_at(&self) -> Option<&str> {
        match self {
            DirectoryDecision::Redirected { created, .. } => Some(created),
            _ => None,
        }
    }
}

impl Engine {
    pub fn handle_directory_create(&self, rules: &RuleSet, ctx: &RequestContext, path: &str) -> DirectoryDecision {
        let rules = self.canonical_rules(rules);
        let normalized = self.roots.normalize(path);
        let selected = rules::select_for_app(&rules, ctx.effective_identity());

        let decision = match resolver::resolve_redirect(&selected, &normalized.canonical) {
            Some(m) => {
                let target = normalized.denormalize(&m.apply(&normalized.canonical));
                match self.dirs.create_all(Path::new(&target)) {
                    Ok(()) => {
                        info!(target: "mediashield", "request {}: mkdir {} redirected to {}", ctx.request_id, path, target);
                        DirectoryDecision::Redirected { original: path.to_string(), created: target }
                    }
                    Err(e) => {
                        warn!(target: "mediashield", "request {}: creating redirect target {} failed: {}", ctx.request_id, target, e);
                        DirectoryDecision::Failed { target, error: EngineError::from(e) }
                    }
                }
            }
            None => self.check_standard_directory(&normalized.canonical),
        };

        if let DirectoryDecision::Rejected { reason } = &decision {
            debug!(target: "mediashield", "request {}: mkdir {} rejected: {}", ctx.request_id, path, reason);
        }
        let mut record = AuditRecord::new(ctx).entry(path, MEDIA_TYPE_NONE, matches!(decision, DirectoryDecision::Rejected { .. }));
        if let Some(created) = decision.created_at() {
            record = record.redirected_to(created);
        }
        self.audit.report(record);
        decision
    }

    /// Under the storage root only the public top-level directories and their subtrees may be
    /// created; anything outside the root is not ours to judge.
    fn check_standard_directory(&self, canonical: &str) -> DirectoryDecision {
        let root = self.storage_root();
        if !paths::contains(root, canonical) {
            return DirectoryDecision::Permitted;
        }
        let rel = canonical[root.len()..].trim_start_matches(paths::SEPARATOR);
        let top = match rel.split(paths::SEPARATOR).next() {
            Some(top) if !top.is_empty() => top,
            _ => return DirectoryDecision::Permitted,
        };
        if self.config.standard_directories.iter().any(|d| d == top) {
            DirectoryDecision::Permitted
        } else {
            DirectoryDecision::Rejected { reason: format!("'{}' is not a standard directory", top) }
        }
    }
}
