//! Generator backend abstraction layer.
//!
//! Provides a trait-based interface over text-generation services:
//! - OpenAI-compatible (OpenAI, vLLM, Ollama, etc.)
//! - Mock backend for testing

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{sample_item, MockBackend};
pub use openai::OpenAiBackend;
pub use traits::{BackendError, CompletionRequest, CompletionResponse, GeneratorBackend};
