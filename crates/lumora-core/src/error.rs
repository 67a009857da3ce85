use thiserror::Error;

/// Request-level failures. Everything else (catalog gaps, provider
/// failures) is recovered inside the controller and never reaches the
/// caller as an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    /// Rejected before any session or history mutation.
    #[error("message must be a non-empty string")]
    EmptyMessage,
    /// Rejected before any session or history mutation.
    #[error("session identifier is required")]
    MissingSessionId,
    /// The LLM collaborator is entirely unconfigured: the service cannot
    /// answer at all, as opposed to answering with scripted fallback text.
    #[error("no language model provider is configured")]
    ProviderUnconfigured,
}
