//! Language model backends for orderchat.
//!
//! Every backend implements `orderchat_core::ChatModel`. Only the
//! OpenAI-compatible chat completions API is needed; DeepSeek speaks it.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatModel;
