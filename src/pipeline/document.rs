use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Engine, MatchResult};
use crate::audit::AuditRecord;
use crate::error::{EngineError, EngineResult};
use crate::identity::RequestContext;
use crate::paths;
use crate::resolver;
use crate::rules::{RuleSet, Template};

/// Arguments a document-provider create call should proceed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentOutcome {
    pub parent_document_id: String,
    pub display_name: String,
    pub mime_type: String,
    pub decision: MatchResult,
    /// Directory created for a rewritten parent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_parent: Option<String>,
}

impl Engine {
    /// Rewrite a document creation whose resulting path falls under a redirect source. Document ids
    /// are `<root id>:<path relative to the storage root>`.
    pub fn handle_document_create(
        &self,
        rules: &RuleSet,
        ctx: &RequestContext,
        parent_document_id: &str,
        display_name: &str,
        mime_type: &str,
    ) -> EngineResult<DocumentOutcome> {
        let unchanged = || DocumentOutcome {
            parent_document_id: parent_document_id.to_string(),
            display_name: display_name.to_string(),
            mime_type: mime_type.to_string(),
            decision: MatchResult::Passthrough,
            created_parent: None,
        };

        let (root_id, rel) = match parent_document_id.split_once(':') {
            Some((root_id, rel)) if root_id == self.config.document_root_id => (root_id, rel),
            _ => {
                debug!(target: "mediashield", "request {}: document parent {} not on the primary root", ctx.request_id, parent_document_id);
                return Ok(unchanged());
            }
        };

        let root = self.storage_root();
        let parent_path = paths::clean(&paths::join(root, rel));
        let path = paths::join(&parent_path, display_name);

        // The provider creates on behalf of an app it cannot name, so every template counts
        let rules = self.canonical_rules(rules);
        let all: Vec<&Template> = rules.templates().iter().collect();
        let Some(m) = resolver::resolve_redirect(&all, &path) else {
            return Ok(unchanged());
        };
        let rewritten = m.apply(&path);
        let type_code = self.classify(mime_type);
        let mut record = AuditRecord::new(ctx).entry(path.clone(), type_code, false).redirected_to(rewritten.clone());

        let new_name = paths::file_name(&rewritten).to_string();
        let new_parent = paths::parent(&rewritten).unwrap_or(root).to_string();
        let decision = MatchResult::Redirected { original_path: path.clone(), rewritten_path: rewritten.clone() };

        if new_parent == parent_path {
            info!(target: "mediashield", "request {}: document {} renamed to {}", ctx.request_id, path, new_name);
            self.audit.report(record);
            return Ok(DocumentOutcome {
                parent_document_id: parent_document_id.to_string(),
                display_name: new_name,
                mime_type: mime_type.to_string(),
                decision,
                created_parent: None,
            });
        }

        if !paths::contains(root, &new_parent) {
            warn!(target: "mediashield", "request {}: redirect target {} is outside {}, leaving document as is", ctx.request_id, new_parent, root);
            record.redirected_to = None;
            self.audit.report(record);
            return Ok(unchanged());
        }

        if let Err(e) = self.dirs.create_all(Path::new(&new_parent)) {
            warn!(target: "mediashield", "request {}: creating document parent {} failed: {}", ctx.request_id, new_parent, e);
            self.audit.report(record);
            return Err(EngineError::from(e));
        }

        let new_rel = new_parent[root.len()..].trim_start_matches(paths::SEPARATOR);
        let new_parent_id = format!("{}:{}", root_id, new_rel);
        info!(target: "mediashield", "request {}: document {} moved under {}", ctx.request_id, path, new_parent_id);
        self.audit.report(record);
        Ok(DocumentOutcome {
            parent_document_id: new_parent_id,
            display_name: new_name,
            mime_type: mime_type.to_string(),
            decision,
            created_parent: Some(new_parent),
        })
    }
}
