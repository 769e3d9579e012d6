//! Ingested image records
//!
//! An [`ImageRecord`] is created once at ingestion time and never mutated.
//! Records are shared as `Arc<ImageRecord>` between the workspace and a
//! running scan.

use base64::Engine as _;
use serde::Serialize;
use uuid::Uuid;

/// Portable encoded representation of an image: MIME type + base64 payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME type sniffed from the file content (e.g. "image/png")
    pub mime_type: String,
    /// Standard base64 of the original file bytes
    pub data: String,
}

impl EncodedImage {
    /// Encode raw file bytes
    ///
    /// Returns `None` when the content is not a recognised image format.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let kind = infer::get(bytes)?;
        if kind.matcher_type() != infer::MatcherType::Image {
            return None;
        }
        Some(Self {
            mime_type: kind.mime_type().to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }

    /// Decode the payload back to the original bytes
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }

    /// Size of the original file in bytes
    pub fn decoded_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|b| *b == b'=').count();
        (self.data.len() / 4) * 3 - padding
    }
}

/// One ingested image
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Unique identifier, also used as the candidate ID sent to the model
    pub id: Uuid,
    /// Display name (original file name)
    pub name: String,
    /// Ephemeral local view reference, valid until the record is discarded
    pub view_url: String,
    /// Encoded image payload
    pub payload: EncodedImage,
    /// Modification time of the source file, milliseconds since the Unix epoch
    pub last_modified: i64,
}

impl ImageRecord {
    pub fn new(name: impl Into<String>, payload: EncodedImage, last_modified: i64) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: name.into(),
            view_url: view_url_for(id),
            payload,
            last_modified,
        }
    }

    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            id: self.id,
            name: self.name.clone(),
            view_url: self.view_url.clone(),
            mime_type: self.payload.mime_type.clone(),
            size_bytes: self.payload.decoded_len(),
            last_modified: self.last_modified,
        }
    }
}

/// View reference path for an image ID
pub fn view_url_for(id: Uuid) -> String {
    format!("/images/{}", id)
}

/// API view of an image record (no payload)
#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub id: Uuid,
    pub name: String,
    pub view_url: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub last_modified: i64,
}
