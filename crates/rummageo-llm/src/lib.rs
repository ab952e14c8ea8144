//! rummageo-llm - chat-completion backend abstraction.
//! Implements the LlmBackend trait used by hypothesis generation and the
//! audit entry recorded for every completion.

pub mod backend;
pub mod audit;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
