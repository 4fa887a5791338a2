//! End-to-end decisions through the public engine surface: the insert/read/type/mkdir scenarios
//! plus the longest-prefix and round-trip properties over generated inputs.

use std::sync::Arc;

use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

use mediashield::audit::MemoryAuditSink;
use mediashield::identity::{RequestContext, RequestKind};
use mediashield::pipeline::{DirectoryDecision, IndexRow, WriteRequest};
use mediashield::rules::{Operation, Template};
use mediashield::{paths, resolver, tprintln, Engine, EngineConfig, MatchResult, RuleSet};

const T1: &str = r#"[{
  "template_name": "T1",
  "hook_operation": ["insert"],
  "apply_to_app": ["com.app.x"],
  "redirect_rules": [{"source": "/sdcard/AD", "target": "/sdcard/Hidden/AD"}]
}]"#;

fn engine() -> (Engine, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::new());
    (Engine::new(EngineConfig::default()).with_audit_sink(audit.clone()), audit)
}

#[test]
fn insert_from_scoped_app_is_redirected() -> Result<()> {
    let (engine, audit) = engine();
    let rules = RuleSet::from_json(T1)?;
    let ctx = RequestContext::new(RequestKind::Insert, "com.app.x");
    let out = engine.handle_write(&rules, &ctx, WriteRequest::to_path("/sdcard/AD/banner.png"));
    assert_eq!(out.destination, "/sdcard/Hidden/AD/banner.png");
    assert!(!out.suppressed);

    let recs = audit.records();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].caller.as_str(), "com.app.x");
    assert_eq!(recs[0].request_id, ctx.request_id);
    Ok(())
}

#[test]
fn insert_from_other_app_passes_through() -> Result<()> {
    let (engine, _) = engine();
    let rules = RuleSet::from_json(T1)?;
    let ctx = RequestContext::new(RequestKind::Insert, "com.app.other");
    let out = engine.handle_write(&rules, &ctx, WriteRequest::to_path("/sdcard/AD/banner.png"));
    assert_eq!(out.destination, "/sdcard/AD/banner.png");
    assert_eq!(out.decision, MatchResult::Passthrough);
    Ok(())
}

#[test]
fn read_restores_the_location_the_app_wrote_to() -> Result<()> {
    let (engine, _) = engine();
    let rules = RuleSet::from_json(T1)?;
    let ctx = RequestContext::new(RequestKind::Query, "com.app.x");
    let out = engine.handle_read(&rules, &ctx, vec![IndexRow::new("/sdcard/Hidden/AD/banner.png", 1)]);
    let rows: Vec<IndexRow> = out.rows.collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, "/sdcard/AD/banner.png");
    Ok(())
}

#[test]
fn type_restricted_template_excludes_other_types_regardless_of_path() -> Result<()> {
    let (engine, _) = engine();
    let rules = RuleSet::new(vec![Template::builder("images").operation(Operation::Query).permitted_type(1).build()?]);
    let ctx = RequestContext::new(RequestKind::Query, "com.app.any");
    let rows = vec![
        IndexRow::new("/sdcard/Movies/clip.mp4", 2),
        IndexRow::new("/sdcard/Pictures/a.jpg", 1),
        IndexRow::new("/sdcard/Pictures/b.mp4", 2),
    ];
    let out = engine.handle_read(&rules, &ctx, rows);
    assert_eq!(out.hidden, vec![true, false, true]);
    let rows: Vec<IndexRow> = out.rows.collect();
    assert_eq!(rows.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(), vec!["/sdcard/Pictures/a.jpg"]);
    Ok(())
}

#[test]
fn hide_prefix_excludes_permitted_types_too() -> Result<()> {
    let (engine, _) = engine();
    let rules = RuleSet::new(vec![Template::builder("secret")
        .operation(Operation::Query)
        .permitted_type(1)
        .hide_prefix("/sdcard/Private")
        .build()?]);
    let ctx = RequestContext::new(RequestKind::Query, "com.app.any");
    let out = engine.handle_read(&rules, &ctx, vec![IndexRow::new("/sdcard/Private/me.jpg", 1), IndexRow::new("/sdcard/Public/me.jpg", 1)]);
    assert_eq!(out.hidden, vec![true, false]);
    Ok(())
}

#[test]
fn mkdir_without_rules_allows_only_standard_directories() {
    let (engine, _) = engine();
    let rules = RuleSet::empty();
    let ctx = RequestContext::new(RequestKind::CreateDirectory, "com.app.any");
    assert_eq!(engine.handle_directory_create(&rules, &ctx, "/sdcard/Music"), DirectoryDecision::Permitted);
    let d = engine.handle_directory_create(&rules, &ctx, "/sdcard/RandomFolder");
    assert!(matches!(d, DirectoryDecision::Rejected { .. }));
    assert!(!d.success());
}

#[test]
fn unknown_operation_name_is_fatal_at_selection() -> Result<()> {
    let rules = RuleSet::from_json(T1)?;
    let err = mediashield::rules::select_named(&rules, "update", &"com.app.x".into()).unwrap_err();
    assert!(err.is_fatal());
    Ok(())
}

fn random_segment(rng: &mut StdRng) -> String {
    let len = rng.gen_range(1..4);
    (0..len).map(|_| (b'a' + rng.gen_range(0..3u8)) as char).collect()
}

fn random_path(rng: &mut StdRng, depth: usize) -> String {
    let mut p = String::new();
    for _ in 0..depth {
        p.push('/');
        p.push_str(&random_segment(rng));
    }
    p
}

#[test]
fn contains_agrees_with_its_definition_on_random_paths() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for _ in 0..2000 {
        let prefix_len = rng.gen_range(1..3);
        let prefix = random_path(&mut rng, prefix_len);
        let path_len = rng.gen_range(1..4);
        let path = random_path(&mut rng, path_len);
        let expected = path == prefix || path.starts_with(&format!("{}/", prefix));
        assert_eq!(paths::contains(&prefix, &path), expected, "contains({}, {})", prefix, path);
    }
}

#[test]
fn longest_source_wins_and_inversion_round_trips() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for round in 0..200 {
        let base = random_path(&mut rng, 1);
        let deeper = format!("{}{}", base, random_path(&mut rng, 1));
        let broad = Template::builder("broad").operation(Operation::Insert).redirect(base.clone(), "/X").build().unwrap();
        let narrow = Template::builder("narrow").operation(Operation::Insert).redirect(deeper.clone(), "/Y").build().unwrap();
        let sel = if round % 2 == 0 { vec![&broad, &narrow] } else { vec![&narrow, &broad] };

        let p = format!("{}{}", deeper, random_path(&mut rng, 2));
        let m = resolver::resolve_redirect(&sel, &p).unwrap();
        assert_eq!(m.rule.source, deeper);
        let q = m.apply(&p);
        assert!(q.starts_with("/Y"), "{} -> {}", p, q);

        // Single rule round trip
        let only = [&narrow];
        let q = resolver::resolve_redirect(&only, &p).unwrap().apply(&p);
        tprintln!("round {}: {} -> {}", round, p, q);
        assert_eq!(resolver::invert(&only, &q), p);
    }
}
