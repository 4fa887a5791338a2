//! Rule reloads while requests are in flight, and audit output to a JSON-lines file.

use std::sync::Arc;

use anyhow::Result;
use tempfile::tempdir;

use mediashield::audit::AuditRecord;
use mediashield::identity::{RequestContext, RequestKind};
use mediashield::pipeline::WriteRequest;
use mediashield::{Engine, EngineConfig, RuleStore};

const TO_A: &str = r#"[{"template_name": "move", "hook_operation": ["insert"],
  "redirect_rules": [{"source": "/sdcard/In", "target": "/sdcard/A"}]}]"#;
const TO_B: &str = r#"[{"template_name": "move", "hook_operation": ["insert"],
  "redirect_rules": [{"source": "/sdcard/In", "target": "/sdcard/B"}]}]"#;

#[test]
fn reload_from_file_replaces_rules_and_rejects_bad_files() -> Result<()> {
    let tmp = tempdir()?;
    let file = tmp.path().join("rules.json");
    std::fs::write(&file, TO_A)?;

    let engine = Engine::new(EngineConfig::default());
    let store = RuleStore::new(engine.roots().clone());
    store.reload_file(&file)?;
    let ctx = RequestContext::new(RequestKind::Insert, "com.app.x");
    let before = store.snapshot();
    assert_eq!(engine.handle_write(&before, &ctx, WriteRequest::to_path("/sdcard/In/f.txt")).destination, "/sdcard/A/f.txt");

    std::fs::write(&file, TO_B)?;
    store.reload_file(&file)?;
    assert_eq!(engine.handle_write(&store.snapshot(), &ctx, WriteRequest::to_path("/sdcard/In/f.txt")).destination, "/sdcard/B/f.txt");
    // A snapshot taken earlier keeps deciding with the rules it was taken from
    assert_eq!(engine.handle_write(&before, &ctx, WriteRequest::to_path("/sdcard/In/f.txt")).destination, "/sdcard/A/f.txt");

    std::fs::write(&file, r#"[{"template_name": "move", "hook_operation": ["rename"]}]"#)?;
    let epoch = store.epoch();
    assert!(store.reload_file(&file).is_err());
    assert_eq!(store.epoch(), epoch);
    assert_eq!(engine.handle_write(&store.snapshot(), &ctx, WriteRequest::to_path("/sdcard/In/f.txt")).destination, "/sdcard/B/f.txt");

    assert!(store.reload_file(&tmp.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn decisions_stay_consistent_during_concurrent_reloads() -> Result<()> {
    let engine = Arc::new(Engine::new(EngineConfig::default()));
    let store = Arc::new(RuleStore::new(engine.roots().clone()));
    store.reload_json(TO_A)?;

    std::thread::scope(|s| {
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            let store = Arc::clone(&store);
            s.spawn(move || {
                let ctx = RequestContext::new(RequestKind::Insert, "com.app.x");
                for _ in 0..300 {
                    let out = engine.handle_write(&store.snapshot(), &ctx, WriteRequest::to_path("/sdcard/In/f.txt"));
                    assert!(out.destination == "/sdcard/A/f.txt" || out.destination == "/sdcard/B/f.txt", "{}", out.destination);
                }
            });
        }
        let store = Arc::clone(&store);
        s.spawn(move || {
            for i in 0..100 {
                let json = if i % 2 == 0 { TO_B } else { TO_A };
                store.reload_json(json).unwrap();
            }
        });
    });
    Ok(())
}

#[test]
fn audit_log_file_receives_one_line_per_decision() -> Result<()> {
    let tmp = tempdir()?;
    let log = tmp.path().join("audit/decisions.jsonl");
    let mut config = EngineConfig::default();
    config.audit.log_path = Some(log.to_string_lossy().into_owned());
    let engine = Engine::from_config(config)?;
    let store = RuleStore::new(engine.roots().clone());
    store.reload_json(TO_A)?;

    let ctx = RequestContext::new(RequestKind::Insert, "com.app.x");
    engine.handle_write(&store.snapshot(), &ctx, WriteRequest::to_path("/sdcard/In/one.txt"));
    engine.handle_write(&store.snapshot(), &ctx, WriteRequest::to_path("/sdcard/Other/two.txt"));

    let text = std::fs::read_to_string(&log)?;
    let records: Vec<AuditRecord> = text.lines().map(serde_json::from_str).collect::<Result<_, _>>()?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].redirected_to.as_deref(), Some("/sdcard/A/one.txt"));
    assert_eq!(records[1].redirected_to, None);
    assert!(records.iter().all(|r| r.request_id == ctx.request_id));
    Ok(())
}

#[test]
fn disabled_audit_writes_nothing() -> Result<()> {
    let tmp = tempdir()?;
    let log = tmp.path().join("decisions.jsonl");
    let mut config = EngineConfig::default();
    config.audit.log_path = Some(log.to_string_lossy().into_owned());
    config.audit.enabled = false;
    let engine = Engine::from_config(config)?;
    let ctx = RequestContext::new(RequestKind::Insert, "com.app.x");
    engine.handle_write(&mediashield::RuleSet::empty(), &ctx, WriteRequest::to_path("/sdcard/a.txt"));
    assert!(!log.exists());
    Ok(())
}
