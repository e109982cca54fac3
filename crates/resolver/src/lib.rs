//! UI resource resolution for orderchat clients.
//!
//! A `ui_resource` block names a layout by id; the client needs the full
//! [`UiResourceDefinition`](orderchat_core::UiResourceDefinition) to render
//! it. [`UiResourceResolver`] fetches each definition once per process,
//! sharing a single outstanding request between concurrent callers.

pub mod fetcher;
pub mod resolver;

pub use fetcher::{HttpFetcher, ResourceFetcher};
pub use resolver::UiResourceResolver;

/// Why a UI resource could not be resolved.
///
/// `Clone` so one failed fetch can be handed to every caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("UI resource request failed ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid UI resource definition: {0}")]
    Decode(String),
}
