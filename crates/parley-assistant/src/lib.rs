//! Client for an OpenAI-style assistants API: assistant/thread
//! provisioning plus streamed runs over SSE.

pub mod client;
pub mod sse;

pub use client::{AssistantClient, AssistantError};
