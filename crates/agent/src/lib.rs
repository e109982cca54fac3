//! The order chat agent.
//!
//! [`Orchestrator`] runs one turn per user message:
//!
//! 1. **Decide**: ask the model, with the order tools bound
//! 2. **Act**: run the requested tool calls through the tool gateway
//! 3. **Summarize**: stream a plain-prose summary with no tools bound
//!
//! Progress is reported as [`StreamEvent`]s; [`collect_response`] folds a
//! finished turn into the non-streaming [`AgentResponse`] shape.
//!
//! [`AgentResponse`]: orderchat_core::AgentResponse

pub mod orchestrator;
pub mod response;
pub mod stream_event;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use orchestrator::{Orchestrator, SUMMARY_INSTRUCTION, SYSTEM_PROMPT};
pub use response::collect_response;
pub use stream_event::{StreamEvent, error_stream};
