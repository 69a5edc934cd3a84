//! LLM — text-analysis collaborator boundary.
//!
//! DESIGN
//! ======
//! The engine only ever sees the [`LlmComplete`] trait: one prompt in, one
//! text completion out. The concrete client speaks the Gemini
//! `generateContent` REST API and is configured from environment variables;
//! when configuration is absent the capability is disabled and analysis
//! requests get a directed error payload.

pub mod config;
pub mod gemini;
pub mod types;

pub use gemini::GeminiClient;
pub use types::{LlmComplete, LlmError};
