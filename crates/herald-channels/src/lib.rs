//! Transport abstraction for outbound campaign deliveries.
//!
//! The delivery engine never talks to a messaging platform directly: it
//! resolves a campaign's transport by name from a [`TransportRegistry`] and
//! hands it an [`OutboundDelivery`]. Transmission is opaque to the engine;
//! a transport reports success or failure and applies its own retry policy.

pub mod error;
pub mod registry;
pub mod transport;
pub mod types;

pub use error::TransportError;
pub use registry::TransportRegistry;
pub use transport::Transport;
pub use types::OutboundDelivery;
