//! Model client abstraction and the offline simulated implementation.

mod client;
mod simulated;

pub use client::{CompletionOptions, ModelClient, ModelError, ModelReply};
pub use simulated::SimulatedModelClient;
