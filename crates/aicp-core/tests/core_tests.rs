use aicp_core::{AicpError, CompletionRequest, Message, Role, Usage};

#[test]
fn message_constructors_set_role() {
    assert_eq!(Message::user("hi").role, Role::User);
    assert_eq!(Message::system("be terse").role, Role::System);
    assert_eq!(Message::assistant("ok").role, Role::Assistant);
}

#[test]
fn message_serde_roundtrip() {
    let msg = Message::user("test message");
    let json = serde_json::to_string(&msg).unwrap();
    let restored: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.role, Role::User);
    assert_eq!(restored.content, "test message");
}

#[test]
fn role_variants_roundtrip() {
    for role in [Role::System, Role::User, Role::Assistant, Role::Tool] {
        let json = serde_json::to_string(&role).unwrap();
        let restored: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(role, restored);
    }
}

#[test]
fn usage_total_is_derived() {
    let usage = Usage::new(100, 50);
    assert_eq!(usage.total_tokens, 150);
}

#[test]
fn usage_default_is_all_zero() {
    let usage = Usage::default();
    assert_eq!(usage.total_tokens, 0);
    assert_eq!(usage.prompt_tokens, 0);
    assert_eq!(usage.completion_tokens, 0);
}

#[test]
fn completion_request_defaults_temperature() {
    let req = CompletionRequest::new("gpt-4", vec![Message::user("hi")]);
    assert_eq!(req.temperature, 0.7);
    assert!(!req.stream);
    assert!(req.max_tokens.is_none());
}

#[test]
fn completion_request_default_stream_is_false_from_json() {
    let json = r#"{"model":"gpt-4","messages":[],"stream":true}"#;
    let req: CompletionRequest = serde_json::from_str(json).unwrap();
    assert!(req.stream, "the field itself still round-trips");
}

#[test]
fn error_display_includes_detail() {
    let err = AicpError::Provider("connection refused".into());
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn error_version_not_found_includes_both_fields() {
    let err = AicpError::VersionNotFound {
        model: "summarizer".into(),
        version: "2.0.0".into(),
    };
    let s = err.to_string();
    assert!(s.contains("summarizer"));
    assert!(s.contains("2.0.0"));
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: AicpError = io_err.into();
    assert!(err.to_string().contains("file not found"));
}
