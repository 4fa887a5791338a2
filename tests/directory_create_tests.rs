//! Directory and document creation against a real filesystem rooted in a temp directory.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tempfile::tempdir;

use mediashield::audit::MemoryAuditSink;
use mediashield::identity::{RequestContext, RequestKind};
use mediashield::pipeline::DirectoryDecision;
use mediashield::rules::{Operation, Template};
use mediashield::{Engine, EngineConfig, RuleSet};

fn engine_at(root: &Path) -> (Engine, Arc<MemoryAuditSink>) {
    let config = EngineConfig {
        storage_root: root.to_string_lossy().into_owned(),
        alias_roots: Vec::new(),
        ..EngineConfig::default()
    };
    let audit = Arc::new(MemoryAuditSink::new());
    (Engine::new(config).with_audit_sink(audit.clone()), audit)
}

fn redirect_rules(root: &str) -> Result<RuleSet> {
    Ok(RuleSet::new(vec![Template::builder("ads")
        .operation(Operation::Insert)
        .app("com.app.x")
        .redirect(format!("{}/AD", root), format!("{}/Hidden/AD", root))
        .build()?]))
}

#[test]
fn redirected_mkdir_is_idempotent_and_never_creates_the_original() -> Result<()> {
    let tmp = tempdir()?;
    let root = tmp.path().to_string_lossy().into_owned();
    let (engine, audit) = engine_at(tmp.path());
    let rules = redirect_rules(&root)?;
    let ctx = RequestContext::new(RequestKind::CreateDirectory, "com.app.x");
    let requested = format!("{}/AD/campaign", root);

    for _ in 0..2 {
        let d = engine.handle_directory_create(&rules, &ctx, &requested);
        assert!(d.success(), "{:?}", d);
        assert_eq!(d.created_at(), Some(format!("{}/Hidden/AD/campaign", root).as_str()));
    }
    assert!(tmp.path().join("Hidden/AD/campaign").is_dir());
    assert!(!tmp.path().join("AD").exists());
    assert_eq!(audit.len(), 2);
    Ok(())
}

#[test]
fn mkdir_target_blocked_by_a_file_reports_failure() -> Result<()> {
    let tmp = tempdir()?;
    let root = tmp.path().to_string_lossy().into_owned();
    std::fs::write(tmp.path().join("Hidden"), b"not a directory")?;
    let (engine, _) = engine_at(tmp.path());
    let rules = redirect_rules(&root)?;
    let ctx = RequestContext::new(RequestKind::CreateDirectory, "com.app.x");

    let d = engine.handle_directory_create(&rules, &ctx, &format!("{}/AD", root));
    assert!(!d.success());
    assert!(matches!(d, DirectoryDecision::Failed { .. }));
    Ok(())
}

#[test]
fn unscoped_app_gets_standard_directory_policy() -> Result<()> {
    let tmp = tempdir()?;
    let root = tmp.path().to_string_lossy().into_owned();
    let (engine, _) = engine_at(tmp.path());
    let rules = redirect_rules(&root)?;
    let ctx = RequestContext::new(RequestKind::CreateDirectory, "com.app.other");

    assert!(matches!(engine.handle_directory_create(&rules, &ctx, &format!("{}/AD", root)), DirectoryDecision::Rejected { .. }));
    assert_eq!(engine.handle_directory_create(&rules, &ctx, &format!("{}/Pictures/Trips", root)), DirectoryDecision::Permitted);
    // The engine only decides; permitted directories are created by the host
    assert!(!tmp.path().join("Pictures").exists());
    Ok(())
}

#[test]
fn document_creation_creates_the_redirected_parent() -> Result<()> {
    let tmp = tempdir()?;
    let root = tmp.path().to_string_lossy().into_owned();
    let (engine, _) = engine_at(tmp.path());
    let rules = redirect_rules(&root)?;
    let ctx = RequestContext::new(RequestKind::CreateDocument, "com.android.externalstorage");

    let out = engine.handle_document_create(&rules, &ctx, "primary:AD", "banner.png", "image/png")?;
    assert_eq!(out.parent_document_id, "primary:Hidden/AD");
    assert_eq!(out.display_name, "banner.png");
    assert!(tmp.path().join("Hidden/AD").is_dir());
    Ok(())
}
