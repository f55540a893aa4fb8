use thiserror::Error;

/// Errors that can occur within any transport adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// No transport is available for the requested delivery.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}
