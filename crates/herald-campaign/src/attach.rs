//! Attachment normalization — collapses the three attachment shapes into one
//! transport-agnostic payload descriptor.

use herald_core::delivery::{DeliveryPayload, PayloadItem, PayloadKind};

use crate::error::{CampaignError, Result};
use crate::types::{Attachment, FileItem, ImageItem, LinkItem};

/// Normalize an optional attachment into a delivery payload.
///
/// Absent attachments resolve to `Ok(None)`. For the three concrete shapes
/// the top-level payload becomes the primary item and any sub-item list is
/// flattened into `extra`, preserving order. A shape whose required fields
/// are blank fails with [`CampaignError::MalformedAttachment`]; the caller
/// records the step as failed and must not retry it.
pub fn resolve(attachment: Option<&Attachment>) -> Result<Option<DeliveryPayload>> {
    let Some(attachment) = attachment else {
        return Ok(None);
    };

    let payload = match attachment {
        Attachment::Image { base64, items } => DeliveryPayload {
            primary: image_item(&ImageItem {
                base64: base64.clone(),
                filename: None,
                size: None,
                mime_type: None,
            })?,
            extra: collect(items, image_item)?,
        },

        Attachment::Link { url, items } => DeliveryPayload {
            primary: link_item(&LinkItem {
                url: url.clone(),
                title: None,
            })?,
            extra: collect(items, link_item)?,
        },

        Attachment::File {
            base64,
            filename,
            items,
        } => {
            if filename.trim().is_empty() {
                return Err(CampaignError::MalformedAttachment(
                    "file attachment has no filename".to_string(),
                ));
            }
            DeliveryPayload {
                primary: file_item(&FileItem {
                    base64: base64.clone(),
                    filename: Some(filename.clone()),
                    size: None,
                })?,
                extra: collect(items, file_item)?,
            }
        }
    };

    Ok(Some(payload))
}

/// Map every sub-item through `map`, failing on the first malformed one.
fn collect<T>(
    items: &Option<Vec<T>>,
    map: fn(&T) -> Result<PayloadItem>,
) -> Result<Vec<PayloadItem>> {
    items.iter().flatten().map(map).collect()
}

fn image_item(item: &ImageItem) -> Result<PayloadItem> {
    if item.base64.trim().is_empty() {
        return Err(CampaignError::MalformedAttachment(
            "image attachment has empty base64 data".to_string(),
        ));
    }
    Ok(PayloadItem {
        kind: PayloadKind::Image,
        data: item.base64.clone(),
        label: item.filename.clone(),
        size: item.size,
    })
}

fn link_item(item: &LinkItem) -> Result<PayloadItem> {
    if item.url.trim().is_empty() {
        return Err(CampaignError::MalformedAttachment(
            "link attachment has empty url".to_string(),
        ));
    }
    Ok(PayloadItem {
        kind: PayloadKind::Link,
        data: item.url.clone(),
        label: item.title.clone(),
        size: None,
    })
}

fn file_item(item: &FileItem) -> Result<PayloadItem> {
    if item.base64.trim().is_empty() {
        return Err(CampaignError::MalformedAttachment(
            "file attachment has empty base64 data".to_string(),
        ));
    }
    Ok(PayloadItem {
        kind: PayloadKind::File,
        data: item.base64.clone(),
        label: item.filename.clone(),
        size: item.size,
    })
}
