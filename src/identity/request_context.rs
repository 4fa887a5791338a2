use serde::{Deserialize, Serialize};

use super::AppIdentity;

/// Kind of intercepted call. Each kind has its own pipeline entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Query,
    Insert,
    CreateDirectory,
    CreateDocument,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Query => "query",
            RequestKind::Insert => "insert",
            RequestKind::CreateDirectory => "create_directory",
            RequestKind::CreateDocument => "create_document",
        }
    }
}

/// One per intercepted call; never shared between requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub kind: RequestKind,
    pub caller: AppIdentity,
    /// Set when the request originates in the intercepting host component itself.
    pub host: Option<AppIdentity>,
    pub request_id: String,
}

impl RequestContext {
    pub fn new(kind: RequestKind, caller: impl Into<AppIdentity>) -> Self {
        Self { kind, caller: caller.into(), host: None, request_id: uuid::Uuid::new_v4().to_string() }
    }

    /// A request issued by the host component on its own behalf.
    pub fn internal(kind: RequestKind, caller: impl Into<AppIdentity>, host: impl Into<AppIdentity>) -> Self {
        Self { host: Some(host.into()), ..Self::new(kind, caller) }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Identity that scopes rule selection: the host when the host acts for itself.
    pub fn effective_identity(&self) -> &AppIdentity {
        self.host.as_ref().unwrap_or(&self.caller)
    }
}
