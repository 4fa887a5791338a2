use super::*;

#[test]
fn exit_code_mapping() {
    assert_eq!(EngineError::config("bad_rule", "oops").exit_code(), 78);
    assert_eq!(EngineError::unsupported("unsupported_operation", "delete").exit_code(), 70);
    assert_eq!(EngineError::io("io_error", "disk").exit_code(), 74);
    assert_eq!(EngineError::internal("internal", "panic").exit_code(), 70);
}

#[test]
fn only_unsupported_operation_is_fatal() {
    assert!(EngineError::unsupported("unsupported_operation", "x").is_fatal());
    assert!(!EngineError::config("c", "x").is_fatal());
    assert!(!EngineError::io("i", "x").is_fatal());
    assert!(!EngineError::internal("i", "x").is_fatal());
}

#[test]
fn display_uses_code_and_message() {
    let e = EngineError::config("empty_source", "redirect source cannot be empty");
    assert_eq!(e.to_string(), "empty_source: redirect source cannot be empty");
    assert_eq!(e.code_str(), "empty_source");
    assert_eq!(e.message(), "redirect source cannot be empty");
}

#[test]
fn io_error_kinds_map_to_codes() {
    let nf: EngineError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert_eq!(nf.code_str(), "io_not_found");
    let pd: EngineError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no").into();
    assert_eq!(pd.code_str(), "io_permission_denied");
}

#[test]
fn anyhow_roundtrips_engine_errors() {
    let original = EngineError::config("bad", "thing");
    let wrapped = anyhow::Error::new(original.clone());
    let back: EngineError = wrapped.into();
    assert_eq!(back, original);

    let other: EngineError = anyhow::anyhow!("boom").into();
    assert_eq!(other.code_str(), "internal");
}

#[test]
fn serializes_with_type_tag() {
    let e = EngineError::io("io_error", "disk full");
    let v = serde_json::to_value(&e).unwrap();
    assert_eq!(v["type"], "io");
    assert_eq!(v["code"], "io_error");
}
