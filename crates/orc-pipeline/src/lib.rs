//! ORC Pipeline - model gateway and the three-stage document pipeline
//!
//! Everything that talks to the model lives here: the rotating multi-key
//! gateway, the Gemini transport behind a trait seam, the configurable
//! prompt engine, the sequential Gatekeeper/Analyst/Guardian orchestrator,
//! and the vendor email composer.
//!
//! # Architecture
//!
//! 1. **Transport** (`transport`): one HTTP round trip per call
//! 2. **Gateway** (`gateway`): key rotation, rate-limit retry, backoff
//! 3. **Prompts** (`prompts`): file-configurable stage instructions
//! 4. **Orchestrator** (`orchestrator`): the pipeline itself
//! 5. **Drafting** (`drafting`): one-shot email body generation

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod drafting;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod prompts;
pub mod transport;

// Re-export commonly used types for convenience
pub use drafting::EmailComposer;
pub use error::{PipelineError, Result, Stage};
pub use gateway::ModelGateway;
pub use orchestrator::{strip_fences, DocumentInput, Orchestrator};
pub use prompts::{PromptEngine, PromptSet};
pub use transport::{
    GeminiTransport, InlineDocument, ModelRequest, ModelTransport, TransportError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
