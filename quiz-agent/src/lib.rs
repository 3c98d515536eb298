//! Quiz Agent - question generation over LLM backends
//!
//! Provides the boundary between the supply pipeline and the generator:
//! - Trait-based generator backends (OpenAI-compatible, mock)
//! - Prompt assembly per category
//! - A timeout-bounded acquisition gateway yielding untrusted candidates
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         AcquisitionGateway              │
//! │  (one bounded call per acquisition)     │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┴───────────┐
//!      ▼                       ▼
//! ┌──────────────────┐   ┌─────────────┐
//! │ GeneratorBackend │   │ Prompt      │
//! │ (OpenAI / Mock)  │   │ Builder     │
//! └──────────────────┘   └─────────────┘
//! ```

pub mod backend;
pub mod gateway;
pub mod prompt;

// Re-export main types for convenience
pub use backend::traits::{BackendError, CompletionRequest, CompletionResponse, GeneratorBackend};
pub use backend::{MockBackend, OpenAiBackend};
pub use gateway::{AcquireError, AcquisitionGateway, GatewayConfig};
pub use prompt::PromptBuilder;
