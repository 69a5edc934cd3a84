use super::*;
use crate::llm::config::{GeminiConfig, GeminiTimeouts};
use serde_json::json;

#[test]
fn parse_response_extracts_candidate_text() {
    let body = json!({
        "candidates": [{
            "content": { "parts": [{ "text": "Line 1: hello" }] }
        }]
    })
    .to_string();

    assert_eq!(parse_response(&body).unwrap(), "Line 1: hello");
}

#[test]
fn parse_response_joins_multiple_parts() {
    let body = json!({
        "candidates": [{
            "content": { "parts": [{ "text": "first" }, { "text": "" }, { "text": "second" }] }
        }]
    })
    .to_string();

    assert_eq!(parse_response(&body).unwrap(), "first\nsecond");
}

#[test]
fn parse_response_uses_only_the_first_candidate() {
    let body = json!({
        "candidates": [
            { "content": { "parts": [{ "text": "primary" }] } },
            { "content": { "parts": [{ "text": "alternate" }] } }
        ]
    })
    .to_string();

    assert_eq!(parse_response(&body).unwrap(), "primary");
}

#[test]
fn parse_response_rejects_empty_candidates() {
    let body = json!({ "candidates": [] }).to_string();
    assert!(matches!(parse_response(&body), Err(LlmError::EmptyResponse)));

    let body = json!({}).to_string();
    assert!(matches!(parse_response(&body), Err(LlmError::EmptyResponse)));

    let body = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] }).to_string();
    assert!(matches!(parse_response(&body), Err(LlmError::EmptyResponse)));
}

#[test]
fn parse_response_rejects_malformed_json() {
    assert!(matches!(parse_response("not json"), Err(LlmError::ApiParse(_))));
}

#[test]
fn client_builds_from_config() {
    let client = GeminiClient::new(GeminiConfig {
        api_key: "k".into(),
        model: "gemini-2.0-flash".into(),
        timeouts: GeminiTimeouts { request_secs: 1, connect_secs: 1 },
    })
    .expect("client should build");
    assert_eq!(client.model(), "gemini-2.0-flash");
}
