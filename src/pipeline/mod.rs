//! Request decision pipeline.
//!
//! Per path: normalize, select templates, try redirect, then try hide, else pass through.
//! Nothing is revisited and a rewritten path is never evaluated again. Every entry point takes the
//! immutable `RuleSet` for the request explicitly, so a concurrent reload never changes a decision
//! half way through.

mod document;
mod mkdir;
mod read;
mod write;

pub use document::DocumentOutcome;
pub use mkdir::{DirectoryDecision, DirectoryMaker, StdDirectoryMaker};
pub use read::{IndexRow, ReadOutcome, TranslatedRows};
pub use write::{Collection, WriteOutcome, WriteRequest};

use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::{AuditReporter, AuditSink, JsonLinesAuditSink, TracingAuditSink};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::identity::AppIdentity;
use crate::mime::{MimeClassifier, TypeClassifier};
use crate::paths::AliasRoots;
use crate::resolver;
use crate::rules::{self, Operation, RuleSet, Template, TypeCode};
use crate::visibility;

/// Outcome of evaluating one path. Every path gets exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchResult {
    Passthrough,
    Redirected { original_path: String, rewritten_path: String },
    Hidden,
}

impl MatchResult {
    pub fn is_hidden(&self) -> bool { matches!(self, MatchResult::Hidden) }

    pub fn rewritten_path(&self) -> Option<&str> {
        match self {
            MatchResult::Redirected { rewritten_path, .. } => Some(rewritten_path),
            _ => None,
        }
    }
}

/// Redirect first, then visibility. `path` must already be canonical.
pub fn match_path(templates: &[&Template], path: &str, type_code: TypeCode) -> MatchResult {
    if let Some(m) = resolver::resolve_redirect(templates, path) {
        return MatchResult::Redirected { original_path: path.to_string(), rewritten_path: m.apply(path) };
    }
    if visibility::is_hidden(templates, path, type_code) {
        return MatchResult::Hidden;
    }
    MatchResult::Passthrough
}

/// The decision engine and its collaborators. Holds no rule state of its own.
pub struct Engine {
    config: EngineConfig,
    roots: AliasRoots,
    classifier: Arc<dyn TypeClassifier>,
    audit: AuditReporter,
    dirs: Arc<dyn DirectoryMaker>,
}

impl Engine {
    /// Engine with the default classifier, real directory creation and tracing audit output.
    pub fn new(config: EngineConfig) -> Self {
        let roots = config.alias_roots();
        let audit = Self::reporter(&config, Arc::new(TracingAuditSink));
        Self { config, roots, classifier: Arc::new(MimeClassifier), audit, dirs: Arc::new(StdDirectoryMaker) }
    }

    /// Like `new`, but audit records go to the configured JSON-lines file when one is set.
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        let log_path = config.audit.log_path.clone();
        let engine = Self::new(config);
        match log_path {
            Some(path) if engine.config.audit.enabled => {
                let sink = JsonLinesAuditSink::open(&path)
                    .map_err(|e| EngineError::io("audit_open".to_string(), format!("{:#}", e)))?;
                Ok(engine.with_audit_sink(Arc::new(sink)))
            }
            _ => Ok(engine),
        }
    }

    fn reporter(config: &EngineConfig, sink: Arc<dyn AuditSink>) -> AuditReporter {
        AuditReporter::new(sink).with_enabled(config.audit.enabled).with_max_paths(config.audit.max_paths)
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Self::reporter(&self.config, sink);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TypeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_directory_maker(mut self, dirs: Arc<dyn DirectoryMaker>) -> Self {
        self.dirs = dirs;
        self
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn roots(&self) -> &AliasRoots { &self.roots }

    pub fn storage_root(&self) -> &str { self.roots.canonical_root() }

    pub fn classify(&self, mime_type: &str) -> TypeCode { self.classifier.classify(mime_type) }

    /// Rules mapped onto this engine's storage root; free when the store already did it.
    fn canonical_rules<'r>(&self, rules: &'r RuleSet) -> Cow<'r, RuleSet> {
        if rules.is_canonical_for(&self.roots) {
            Cow::Borrowed(rules)
        } else {
            Cow::Owned(rules.canonicalized(&self.roots))
        }
    }

    /// Evaluate a single path for `caller` without side effects. Paths in the result use the
    /// root spelling the caller passed in.
    pub fn evaluate(
        &self,
        rules: &RuleSet,
        operation: Operation,
        caller: &AppIdentity,
        path: &str,
        type_code: TypeCode,
    ) -> MatchResult {
        let rules = self.canonical_rules(rules);
        let normalized = self.roots.normalize(path);
        let selected = rules::select(&rules, operation, caller);
        match match_path(&selected, &normalized.canonical, type_code) {
            MatchResult::Redirected { rewritten_path, .. } => MatchResult::Redirected {
                original_path: normalized.original(),
                rewritten_path: normalized.denormalize(&rewritten_path),
            },
            other => other,
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("roots", &self.roots).field("audit", &self.audit).finish()
    }
}
