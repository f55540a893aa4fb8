//! Delivery payload types — shared between the campaign layer and all transports.

use serde::{Deserialize, Serialize};

/// Original attachment shape a payload item was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// Base64-encoded image bytes.
    Image,
    /// A URL.
    Link,
    /// Base64-encoded file bytes with a filename.
    File,
}

/// One normalized attachment item.
///
/// `data` carries base64 bytes for images and files, or the URL for links.
/// `label` carries the filename (images/files) or the link title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadItem {
    pub kind: PayloadKind,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A resolved attachment, ready for handoff to a transport.
///
/// Produced by the attachment resolver in `herald-campaign` and stored
/// alongside the reminder metadata entry once the step is sent, so the audit
/// trail shows exactly what went out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    /// The attachment's top-level item.
    pub primary: PayloadItem,
    /// Flattened secondary items, in their original order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<PayloadItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_json_roundtrip() {
        let payload = DeliveryPayload {
            primary: PayloadItem {
                kind: PayloadKind::File,
                data: "aGVsbG8=".to_string(),
                label: Some("hello.txt".to_string()),
                size: Some(5),
            },
            extra: vec![PayloadItem {
                kind: PayloadKind::File,
                data: "d29ybGQ=".to_string(),
                label: None,
                size: None,
            }],
        };
        let json = serde_json::to_string(&payload).expect("serialize failed");
        let back: DeliveryPayload = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(back, payload);
    }

    #[test]
    fn empty_extra_is_omitted_from_json() {
        let payload = DeliveryPayload {
            primary: PayloadItem {
                kind: PayloadKind::Link,
                data: "https://example.com/sale".to_string(),
                label: None,
                size: None,
            },
            extra: Vec::new(),
        };
        let json = serde_json::to_string(&payload).expect("serialize failed");
        assert!(!json.contains("extra"));
    }
}
