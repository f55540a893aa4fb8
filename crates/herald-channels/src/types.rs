use herald_core::delivery::DeliveryPayload;
use serde::{Deserialize, Serialize};

/// One message to be delivered to a single recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundDelivery {
    /// Campaign the delivery belongs to, for transport-side logging.
    pub campaign_id: String,

    /// Platform-native identifier for the recipient.
    pub recipient_key: String,

    /// Plain text content of the message.
    pub content: String,

    /// Normalised attachment payload, if the campaign step carries one.
    pub payload: Option<DeliveryPayload>,
}
