//! Audit reporting. Every pipeline decision (except internal-caller passthrough) produces one
//! `AuditRecord`, handed to a pluggable `AuditSink`. Reporting never fails a request.

mod sinks;

pub use sinks::{JsonLinesAuditSink, MemoryAuditSink, NullAuditSink, TracingAuditSink};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identity::{AppIdentity, RequestContext, RequestKind};
use crate::rules::TypeCode;

/// Paths kept per record unless configured otherwise.
pub const DEFAULT_MAX_PATHS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp_ms: i64,
    pub caller: AppIdentity,
    pub operation: RequestKind,
    pub paths: Vec<String>,
    pub type_codes: Vec<TypeCode>,
    pub hidden: Vec<bool>,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirected_to: Option<String>,
    /// Entries dropped by truncation.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub truncated: usize,
}

fn is_zero(n: &usize) -> bool { *n == 0 }

impl AuditRecord {
    pub fn new(ctx: &RequestContext) -> Self {
        Self {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            caller: ctx.caller.clone(),
            operation: ctx.kind,
            paths: Vec::new(),
            type_codes: Vec::new(),
            hidden: Vec::new(),
            request_id: ctx.request_id.clone(),
            redirected_to: None,
            truncated: 0,
        }
    }

    pub fn entry(mut self, path: impl Into<String>, type_code: TypeCode, hidden: bool) -> Self {
        self.push(path, type_code, hidden);
        self
    }

    pub fn push(&mut self, path: impl Into<String>, type_code: TypeCode, hidden: bool) {
        self.paths.push(path.into());
        self.type_codes.push(type_code);
        self.hidden.push(hidden);
    }

    pub fn redirected_to(mut self, target: impl Into<String>) -> Self {
        self.redirected_to = Some(target.into());
        self
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.iter().filter(|h| **h).count()
    }

    /// Keep the first `max` entries, counting the rest in `truncated`.
    pub fn truncate(&mut self, max: usize) {
        if self.paths.len() <= max {
            return;
        }
        self.truncated += self.paths.len() - max;
        self.paths.truncate(max);
        self.type_codes.truncate(max);
        self.hidden.truncate(max);
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> anyhow::Result<()>;
}

/// Fire-and-forget front of an `AuditSink`: applies the enable switch and path cap, and logs
/// sink failures instead of returning them.
#[derive(Clone)]
pub struct AuditReporter {
    sink: Arc<dyn AuditSink>,
    enabled: bool,
    max_paths: usize,
}

impl AuditReporter {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink, enabled: true, max_paths: DEFAULT_MAX_PATHS }
    }

    pub fn disabled() -> Self {
        Self { sink: Arc::new(NullAuditSink), enabled: false, max_paths: DEFAULT_MAX_PATHS }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    pub fn is_enabled(&self) -> bool { self.enabled }

    pub fn report(&self, mut record: AuditRecord) {
        if !self.enabled {
            return;
        }
        record.truncate(self.max_paths);
        if let Err(e) = self.sink.record(&record) {
            warn!(target: "mediashield", "audit sink failed for request {}: {:#}", record.request_id, e);
        }
    }
}

impl std::fmt::Debug for AuditReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditReporter").field("enabled", &self.enabled).field("max_paths", &self.max_paths).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn record(&self, _record: &AuditRecord) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(RequestKind::Query, "com.app.x").with_request_id("req-1")
    }

    #[test]
    fn record_collects_entries() {
        let rec = AuditRecord::new(&ctx())
            .entry("/sdcard/a.jpg", 1, false)
            .entry("/sdcard/Secret/b.jpg", 1, true);
        assert_eq!(rec.caller.as_str(), "com.app.x");
        assert_eq!(rec.operation, RequestKind::Query);
        assert_eq!(rec.request_id, "req-1");
        assert_eq!(rec.hidden_count(), 1);
        assert!(rec.timestamp_ms > 0);
    }

    #[test]
    fn reporter_truncates_paths() {
        let sink = Arc::new(MemoryAuditSink::new());
        let reporter = AuditReporter::new(sink.clone()).with_max_paths(3);
        let mut rec = AuditRecord::new(&ctx());
        for i in 0..10 {
            rec.push(format!("/sdcard/{}.jpg", i), 1, false);
        }
        reporter.report(rec);
        let got = sink.records();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].paths.len(), 3);
        assert_eq!(got[0].type_codes.len(), 3);
        assert_eq!(got[0].hidden.len(), 3);
        assert_eq!(got[0].truncated, 7);
    }

    #[test]
    fn default_cap_is_one_thousand() {
        let sink = Arc::new(MemoryAuditSink::new());
        let reporter = AuditReporter::new(sink.clone());
        let mut rec = AuditRecord::new(&ctx());
        for i in 0..1500 {
            rec.push(format!("/p/{}", i), 0, false);
        }
        reporter.report(rec);
        assert_eq!(sink.records()[0].paths.len(), DEFAULT_MAX_PATHS);
    }

    #[test]
    fn disabled_reporter_drops_records() {
        let sink = Arc::new(MemoryAuditSink::new());
        let reporter = AuditReporter::new(sink.clone()).with_enabled(false);
        reporter.report(AuditRecord::new(&ctx()));
        assert!(sink.records().is_empty());
        assert!(!AuditReporter::disabled().is_enabled());
    }

    #[test]
    fn sink_failure_is_swallowed() {
        let reporter = AuditReporter::new(Arc::new(FailingSink));
        reporter.report(AuditRecord::new(&ctx()));
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let rec = AuditRecord::new(&ctx()).entry("/a", 1, false);
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["operation"], "query");
        assert!(v.get("redirected_to").is_none());
        assert!(v.get("truncated").is_none());
        let rec = rec.redirected_to("/b");
        assert_eq!(serde_json::to_value(&rec).unwrap()["redirected_to"], "/b");
    }
}
