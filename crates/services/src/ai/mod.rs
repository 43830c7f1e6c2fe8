//! Generation client, prompt builders, and strict response parsing.

mod client;
pub(crate) mod prompts;
pub(crate) mod response;

pub use client::{GenAiClient, GenAiConfig};
