use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{match_path, Engine, MatchResult};
use crate::audit::AuditRecord;
use crate::identity::RequestContext;
use crate::mime;
use crate::paths;
use crate::rules::{self, Operation, RuleSet, TypeCode};

/// Index collection an insert targets; decides the default location and MIME type of entries
/// inserted without an explicit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Images,
    Audio,
    Video,
    Downloads,
    #[default]
    Files,
    ImageThumbnails,
    VideoThumbnails,
}

impl Collection {
    pub fn default_directory(self) -> &'static str {
        match self {
            Collection::Images => "Pictures",
            Collection::Audio => "Music",
            Collection::Video => "Movies",
            Collection::Downloads | Collection::Files => "Download",
            Collection::ImageThumbnails => "Pictures/.thumbnails",
            Collection::VideoThumbnails => "Movies/.thumbnails",
        }
    }

    pub fn default_mime(self) -> &'static str {
        match self {
            Collection::Images | Collection::ImageThumbnails | Collection::VideoThumbnails => "image/jpeg",
            Collection::Audio => "audio/mpeg",
            Collection::Video => "video/mp4",
            Collection::Downloads | Collection::Files => "application/octet-stream",
        }
    }
}

/// The values of an insert that matter to placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteRequest {
    /// Absolute destination; derived from the other fields when absent.
    pub destination: Option<String>,
    pub relative_path: Option<String>,
    pub display_name: Option<String>,
    pub mime_type: Option<String>,
    pub collection: Collection,
}

impl WriteRequest {
    pub fn to_path(destination: impl Into<String>) -> Self {
        Self { destination: Some(destination.into()), ..Self::default() }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// The insert as it should actually be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    pub mime_type: String,
    pub type_code: TypeCode,
    /// The insert yields no result; not an error.
    pub suppressed: bool,
    pub decision: MatchResult,
    /// Destination was computed rather than supplied.
    pub derived: bool,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Engine {
    /// Decide where an insert lands, or that it is suppressed.
    pub fn handle_write(&self, rules: &RuleSet, ctx: &RequestContext, request: WriteRequest) -> WriteOutcome {
        let (destination, derived) = match non_blank(&request.destination) {
            Some(d) => (d.to_string(), false),
            None => (self.derive_destination(&request), true),
        };
        let mime_type = non_blank(&request.mime_type)
            .map(str::to_string)
            .or_else(|| mime::mime_from_name(paths::file_name(&destination)).map(str::to_string))
            .unwrap_or_else(|| request.collection.default_mime().to_string());
        let type_code = self.classify(&mime_type);

        let rules = self.canonical_rules(rules);
        let normalized = self.roots.normalize(&destination);
        let selected = rules::select(&rules, Operation::Insert, &ctx.caller);
        let decision = match_path(&selected, &normalized.canonical, type_code);

        let mut relative_path = request.relative_path.clone();
        if derived && relative_path.is_none() {
            relative_path = paths::relative_location(self.storage_root(), &normalized.canonical);
        }
        let mut record = AuditRecord::new(ctx);
        let outcome = match decision {
            MatchResult::Redirected { rewritten_path, .. } => {
                if let Some(rel) = paths::relative_location(self.storage_root(), &rewritten_path) {
                    relative_path = Some(rel);
                }
                let rewritten = normalized.denormalize(&rewritten_path);
                info!(target: "mediashield", "request {}: insert by {} redirected {} -> {}", ctx.request_id, ctx.caller, destination, rewritten);
                record.push(destination.clone(), type_code, false);
                record = record.redirected_to(rewritten.clone());
                WriteOutcome {
                    destination: rewritten.clone(),
                    relative_path,
                    mime_type,
                    type_code,
                    suppressed: false,
                    decision: MatchResult::Redirected { original_path: destination, rewritten_path: rewritten },
                    derived,
                }
            }
            MatchResult::Hidden => {
                debug!(target: "mediashield", "request {}: insert by {} suppressed at {}", ctx.request_id, ctx.caller, destination);
                record.push(destination.clone(), type_code, true);
                WriteOutcome { destination, relative_path, mime_type, type_code, suppressed: true, decision: MatchResult::Hidden, derived }
            }
            MatchResult::Passthrough => {
                record.push(destination.clone(), type_code, false);
                WriteOutcome { destination, relative_path, mime_type, type_code, suppressed: false, decision: MatchResult::Passthrough, derived }
            }
        };
        self.audit.report(record);
        outcome
    }

    /// `<storage root>/<relative location or collection default>/<display name or epoch millis>`.
    fn derive_destination(&self, request: &WriteRequest) -> String {
        let dir = non_blank(&request.relative_path)
            .map(|r| r.trim_matches(paths::SEPARATOR).to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| request.collection.default_directory().to_string());
        let name = non_blank(&request.display_name)
            .map(str::to_string)
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());
        paths::join(&paths::join(self.storage_root(), &dir), &name)
    }
}
