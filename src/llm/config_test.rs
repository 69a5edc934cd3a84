use super::*;
use crate::llm::types::LlmError;

/// # Safety
/// All env cases live in one test so parallel test threads never race on
/// the shared process environment.
unsafe fn clear_gemini_env() {
    unsafe {
        std::env::remove_var("GEMINI_API_KEY");
        std::env::remove_var("GEMINI_MODEL");
        std::env::remove_var("GEMINI_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("GEMINI_CONNECT_TIMEOUT_SECS");
    }
}

#[test]
fn from_env_covers_missing_key_defaults_and_overrides() {
    // Missing key.
    unsafe { clear_gemini_env() };
    let err = GeminiConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "GEMINI_API_KEY"));

    // Key only: defaults apply.
    unsafe { std::env::set_var("GEMINI_API_KEY", "secret") };
    let cfg = GeminiConfig::from_env().unwrap();
    assert_eq!(cfg.api_key, "secret");
    assert_eq!(cfg.model, DEFAULT_GEMINI_MODEL);
    assert_eq!(
        cfg.timeouts,
        GeminiTimeouts {
            request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS
        }
    );

    // Full overrides.
    unsafe {
        std::env::set_var("GEMINI_MODEL", "gemini-exp");
        std::env::set_var("GEMINI_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("GEMINI_CONNECT_TIMEOUT_SECS", "7");
    }
    let cfg = GeminiConfig::from_env().unwrap();
    assert_eq!(cfg.model, "gemini-exp");
    assert_eq!(cfg.timeouts, GeminiTimeouts { request_secs: 42, connect_secs: 7 });

    // Unparsable timeout falls back to the default.
    unsafe { std::env::set_var("GEMINI_REQUEST_TIMEOUT_SECS", "not-a-number") };
    let cfg = GeminiConfig::from_env().unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);

    unsafe { clear_gemini_env() };
}
