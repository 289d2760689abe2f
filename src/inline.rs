// In: src/inline.rs

//! Provides the batch embedded directly in the initial query response.

use base64::Engine;

use crate::batch::decoder::BatchDecoder;
use crate::batch::Batch;
use crate::error::Result;

/// The first batch as delivered in the response: raw bytes, or the base64 text
/// form used by JSON responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlinePayload {
    Bytes(Vec<u8>),
    Base64(String),
}

impl InlinePayload {
    /// An empty payload means "no inline batch".
    pub fn is_empty(&self) -> bool {
        match self {
            InlinePayload::Bytes(bytes) => bytes.is_empty(),
            InlinePayload::Base64(text) => text.trim().is_empty(),
        }
    }

    fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            InlinePayload::Bytes(bytes) => Ok(bytes),
            InlinePayload::Base64(text) => {
                Ok(base64::engine::general_purpose::STANDARD.decode(text.trim())?)
            }
        }
    }
}

/// Hands out the inline batch at most once, decoding it on first request.
#[derive(Debug)]
pub struct InlineBatchProvider {
    payload: Option<InlinePayload>,
    decoder: BatchDecoder,
}

impl InlineBatchProvider {
    pub fn new(payload: Option<InlinePayload>, decoder: BatchDecoder) -> Self {
        Self {
            payload: payload.filter(|p| !p.is_empty()),
            decoder,
        }
    }

    /// `true` if there is no batch left to hand out.
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    /// Decodes and returns the inline batch on the first call; `None` afterwards
    /// or when the payload was absent or empty.
    pub fn take_batch(&mut self) -> Result<Option<Batch>> {
        let Some(payload) = self.payload.take() else {
            return Ok(None);
        };
        let bytes = payload.into_bytes()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        self.decoder.decode(&bytes).map(Some)
    }
}
