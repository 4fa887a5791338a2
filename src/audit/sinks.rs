use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use parking_lot::Mutex;
use tracing::info;

use super::{AuditRecord, AuditSink};

/// Appends one compact JSON object per record to a file.
pub struct JsonLinesAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesAuditSink {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("creating audit directory {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening audit log {}", path.display()))?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl AuditSink for JsonLinesAuditSink {
    fn record(&self, record: &AuditRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut f = self.file.lock();
        writeln!(f, "{}", line).with_context(|| format!("writing audit log {}", self.path.display()))?;
        Ok(())
    }
}

/// Keeps records in memory; used by tests and the CLI's summary output.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self { Self::default() }

    pub fn records(&self) -> Vec<AuditRecord> { self.records.lock().clone() }

    pub fn len(&self) -> usize { self.records.lock().len() }

    pub fn is_empty(&self) -> bool { self.records.lock().is_empty() }

    pub fn clear(&self) { self.records.lock().clear() }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: &AuditRecord) -> anyhow::Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Emits records as structured log events under the `mediashield::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) -> anyhow::Result<()> {
        info!(
            target: "mediashield::audit",
            request_id = %record.request_id,
            caller = %record.caller,
            operation = record.operation.as_str(),
            paths = record.paths.len(),
            hidden = record.hidden_count(),
            redirected_to = record.redirected_to.as_deref().unwrap_or(""),
            "audit"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _record: &AuditRecord) -> anyhow::Result<()> { Ok(()) }
}
