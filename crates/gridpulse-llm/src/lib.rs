// LLM crate: the Gemini streaming client behind the `GenerativeModel` trait,
// and the JSON extraction pipeline for its free-text responses.

pub mod client;
pub mod extract;

pub use client::{GenerationRequest, GenerativeModel, LlmClient, LlmError};
pub use extract::{Extraction, JsonExtractor};
