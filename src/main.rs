//!
//! mediashield command-line evaluator
//! ----------------------------------
//! Evaluates JSON-lines requests from stdin against a rule file and writes one JSON outcome per
//! line to stdout. Configuration comes from an optional JSON file, `MEDIASHIELD_*` environment
//! variables, then flags.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use mediashield::identity::{AppIdentity, IdentityResolver, RequestContext, RequestKind, StaticIdentityResolver};
use mediashield::pipeline::{IndexRow, WriteRequest};
use mediashield::{Engine, EngineConfig, EngineError, RuleStore};

const USAGE: &str = "mediashield\n\nUSAGE:\n  mediashield --rules FILE [--config FILE] [--audit-log FILE] [--no-audit]\n\nOPTIONS:\n  --rules FILE       Rule templates (JSON array)\n  --config FILE      Engine configuration (JSON)\n  --audit-log FILE   Append audit records to FILE (env: MEDIASHIELD_AUDIT_LOG)\n  --no-audit         Disable audit records (env: MEDIASHIELD_AUDIT=false)\n\nRequests are read from stdin, one JSON object per line, with \"kind\" one of\nquery, insert, mkdir, create_document, reload.\n";

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// One stdin request. Insert fields are read from the top level of the object.
#[derive(Debug, Deserialize)]
struct RequestLine {
    kind: String,
    #[serde(default)]
    caller: Option<String>,
    #[serde(default)]
    uid: Option<u32>,
    /// Issued by the host component on its own behalf.
    #[serde(default)]
    internal: bool,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    rows: Vec<IndexRow>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    parent_document_id: Option<String>,
    #[serde(flatten)]
    write: WriteRequest,
}

enum LineKind {
    Request(RequestKind),
    Reload,
}

fn parse_kind(kind: &str) -> Result<LineKind, EngineError> {
    match kind.trim() {
        "query" => Ok(LineKind::Request(RequestKind::Query)),
        "insert" => Ok(LineKind::Request(RequestKind::Insert)),
        "mkdir" | "create_directory" => Ok(LineKind::Request(RequestKind::CreateDirectory)),
        "create_document" => Ok(LineKind::Request(RequestKind::CreateDocument)),
        "reload" => Ok(LineKind::Reload),
        other => Err(EngineError::unsupported("unsupported_operation".to_string(), format!("unsupported request kind '{}'", other))),
    }
}

struct Session {
    engine: Engine,
    store: RuleStore,
    identities: StaticIdentityResolver,
    rules_path: PathBuf,
}

impl Session {
    fn context(&self, kind: RequestKind, line: &RequestLine) -> RequestContext {
        let caller = match (&line.caller, line.uid) {
            (Some(name), _) => AppIdentity::new(name.clone()),
            (None, Some(uid)) => self.identities.resolve_or_unknown(uid),
            (None, None) => AppIdentity::unknown(),
        };
        let ctx = if line.internal {
            RequestContext::internal(kind, caller, self.engine.config().host())
        } else {
            RequestContext::new(kind, caller)
        };
        match &line.request_id {
            Some(id) => ctx.with_request_id(id.clone()),
            None => ctx,
        }
    }

    /// Outcome for one line. Only fatal errors are returned; the rest are reported inline.
    fn handle(&self, text: &str) -> Result<Value, EngineError> {
        let line: RequestLine = match serde_json::from_str(text) {
            Ok(l) => l,
            Err(e) => return Ok(json!({ "error": EngineError::from(e) })),
        };
        let kind = match parse_kind(&line.kind)? {
            LineKind::Reload => {
                return Ok(match self.store.reload_file(&self.rules_path) {
                    Ok(epoch) => json!({ "kind": "reload", "epoch": epoch }),
                    Err(e) => json!({ "kind": "reload", "error": e }),
                });
            }
            LineKind::Request(kind) => kind,
        };

        let ctx = self.context(kind, &line);
        let rules = self.store.snapshot();
        let outcome = match kind {
            RequestKind::Query => {
                let out = self.engine.handle_read(&rules, &ctx, line.rows);
                let hidden = out.hidden.clone();
                let rows: Vec<IndexRow> = out.rows.collect();
                json!({ "hidden": hidden, "rows": rows })
            }
            RequestKind::Insert => serde_json::to_value(self.engine.handle_write(&rules, &ctx, line.write))?,
            RequestKind::CreateDirectory => {
                let path = line.path.unwrap_or_default();
                let decision = self.engine.handle_directory_create(&rules, &ctx, &path);
                json!({ "success": decision.success(), "decision": decision })
            }
            RequestKind::CreateDocument => {
                let parent = line.parent_document_id.unwrap_or_default();
                let name = line.write.display_name.unwrap_or_default();
                let mime = line.write.mime_type.unwrap_or_else(|| "application/octet-stream".to_string());
                match self.engine.handle_document_create(&rules, &ctx, &parent, &name, &mime) {
                    Ok(out) => serde_json::to_value(out)?,
                    Err(e) => json!({ "error": e }),
                }
            }
        };
        Ok(json!({ "request_id": ctx.request_id, "kind": kind.as_str(), "outcome": outcome }))
    }
}

fn run(args: &[String]) -> Result<()> {
    let rules_path = arg_value(args, "--rules").map(PathBuf::from).ok_or_else(|| {
        EngineError::config("missing_rules", "--rules FILE is required")
    })?;
    let config_path = arg_value(args, "--config").map(PathBuf::from);

    let mut config = EngineConfig::resolve(config_path.as_deref())?;
    if let Some(log) = arg_value(args, "--audit-log") {
        config.audit.log_path = Some(log);
    }
    if has_flag(args, "--no-audit") {
        config.audit.enabled = false;
    }

    let identities = config.identity_resolver();
    let engine = Engine::from_config(config)?;
    let store = RuleStore::new(engine.roots().clone());
    let epoch = store
        .reload_file(&rules_path)
        .with_context(|| format!("loading rules from {}", rules_path.display()))?;
    info!(
        target: "mediashield",
        "mediashield starting: rules='{}', templates={}, epoch={}, storage_root='{}', audit={}",
        rules_path.display(),
        store.snapshot().len(),
        epoch,
        engine.storage_root(),
        engine.config().audit.enabled
    );

    let session = Session { engine, store, identities, rules_path };
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (n, line) in stdin.lock().lines().enumerate() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let value = session.handle(&line).map_err(|e| {
            error!(target: "mediashield", "line {}: {}", n + 1, e);
            e
        })?;
        if value.get("error").is_some() {
            warn!(target: "mediashield", "line {}: request rejected", n + 1);
        }
        writeln!(out, "{}", value).context("writing stdout")?;
    }
    out.flush().context("flushing stdout")?;
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_writer(io::stderr).try_init();

    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let err = EngineError::from(e);
            error!(target: "mediashield", "{}", err);
            eprintln!("mediashield: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
