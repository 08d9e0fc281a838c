use super::test_helpers::completion_body;
use super::*;

#[test]
fn parse_text_completion() {
    let json = completion_body("llama-3.3-70b-versatile", "Relatório pronto").to_string();
    let resp = parse_completion(ProviderName::Groq, &json, "requested").unwrap();
    assert_eq!(resp.content, "Relatório pronto");
    assert_eq!(resp.model, "llama-3.3-70b-versatile");
    assert_eq!(resp.provider, ProviderName::Groq);
}

#[test]
fn parse_falls_back_to_requested_model() {
    let json = serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": "ok" } }]
    })
    .to_string();
    let resp = parse_completion(ProviderName::OpenAi, &json, "gpt-4o").unwrap();
    assert_eq!(resp.model, "gpt-4o");
}

#[test]
fn parse_missing_choices_is_empty_response() {
    let json = serde_json::json!({ "model": "gpt-4o", "choices": [] }).to_string();
    let err = parse_completion(ProviderName::OpenAi, &json, "gpt-4o").unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse { .. }));
}

#[test]
fn parse_null_content_is_empty_response() {
    let json = serde_json::json!({
        "model": "gpt-4o",
        "choices": [{ "message": { "role": "assistant", "content": null }, "finish_reason": "length" }]
    })
    .to_string();
    let err = parse_completion(ProviderName::OpenAi, &json, "gpt-4o").unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse { .. }));
    assert!(err.to_string().contains("length"));
}

#[test]
fn parse_blank_content_is_empty_response() {
    let json = completion_body("gpt-4o", "   ").to_string();
    let err = parse_completion(ProviderName::OpenAi, &json, "gpt-4o").unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse { .. }));
}

#[test]
fn parse_invalid_json_is_unknown_and_keeps_body() {
    let err = parse_completion(ProviderName::Groq, "<html>bad gateway</html>", "m").unwrap_err();
    assert!(matches!(err, LlmError::ProviderUnknown { .. }));
    assert!(err.to_string().contains("bad gateway"));
}

#[test]
fn backend_error_reads_envelope() {
    let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
    let parsed = BackendError::from_body(body);
    assert_eq!(parsed.message, "Invalid API Key");
    assert_eq!(parsed.code.as_deref(), Some("invalid_api_key"));
}

#[test]
fn backend_error_falls_back_to_raw_body() {
    let parsed = BackendError::from_body("  upstream exploded \n");
    assert_eq!(parsed.message, "upstream exploded");
    assert!(parsed.code.is_none());
}

#[test]
fn mentions_matches_message_case_insensitively_or_code() {
    let parsed = BackendError {
        message: "The model `X` has been DECOMMISSIONED".into(),
        code: Some("model_decommissioned".into()),
    };
    assert!(parsed.mentions(&["decommissioned"]));
    assert!(parsed.mentions(&["model_decommissioned"]));
    assert!(!parsed.mentions(&["quota"]));
}

#[test]
fn request_body_uses_wire_field_names() {
    let messages = [ChatMessage::system("s"), ChatMessage::user("u")];
    let body = CcRequest { model: "m", messages: &messages, temperature: 0.7, max_tokens: 4000 };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["model"], "m");
    assert_eq!(json["max_tokens"], 4000);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][1]["content"], "u");
    assert!(json["temperature"].as_f64().is_some());
}
