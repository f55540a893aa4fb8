use async_trait::async_trait;

use crate::{error::TransportError, types::OutboundDelivery};

/// Common interface implemented by every transport adapter (chat platform,
/// SMS gateway, console logger, …).
///
/// Implementations must be `Send + Sync` so they can be stored in a
/// `TransportRegistry` and driven from multiple Tokio tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stable lowercase identifier for this transport (e.g. `"log"`).
    ///
    /// The name is used as the key inside
    /// [`TransportRegistry`](crate::registry::TransportRegistry) and is what
    /// campaign definitions reference in their `transport` field.
    fn name(&self) -> &str;

    /// Deliver a single message.
    ///
    /// This is intentionally `&self` (shared reference) so that one adapter
    /// can send to many recipients concurrently without a mutable borrow.
    /// Retrying or cancelling a slow transmission is the adapter's own
    /// responsibility; the caller only records the terminal outcome.
    async fn send(&self, delivery: &OutboundDelivery) -> Result<(), TransportError>;
}
