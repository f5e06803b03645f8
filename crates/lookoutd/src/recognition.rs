//! Frame recognition service.
//!
//! Per-frame pipeline: strip the data-URL prefix, base64 decode, image
//! decode, downscale, detect + embed, match against the watch-list cache.
//! At most one notification is emitted per frame: the first embedding in
//! detection order that resolves to a known identity wins, and no
//! negative/clear signal is ever sent.

use crate::engine::{EngineError, EngineHandle};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use image::imageops::FilterType;
use lookout_core::{Matcher, NearestMatcher};
use lookout_store::FaceCache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Sentinel identity for a face that matches nothing on the watch list.
const UNKNOWN_NAME: &str = "Unknown";

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("could not decode frame image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("frame processing timed out")]
    Timeout,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A watch-list hit, addressed to the originating client only.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
}

pub struct FrameRecognizer {
    cache: Arc<FaceCache>,
    engine: EngineHandle,
    tolerance: f32,
    frame_scale: f32,
    frame_timeout: Duration,
}

impl FrameRecognizer {
    pub fn new(
        cache: Arc<FaceCache>,
        engine: EngineHandle,
        tolerance: f32,
        frame_scale: f32,
        frame_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            engine,
            tolerance,
            frame_scale,
            frame_timeout,
        }
    }

    /// Process one transport-encoded frame. Returns `Ok(None)` when no
    /// watch-list face is present; errors are scoped to this frame.
    pub async fn recognize_frame(
        &self,
        data_url: &str,
    ) -> Result<Option<Notification>, FrameError> {
        // The prefix before the first comma is a format marker (e.g.
        // "data:image/jpeg;base64"); only the remainder is image data.
        let encoded = match data_url.split_once(',') {
            Some((_, rest)) => rest,
            None => data_url,
        };
        let bytes = BASE64_STANDARD.decode(encoded.trim())?;
        let frame = image::load_from_memory(&bytes)?;

        // Downscale before detection: throughput over recognition range.
        let width = ((frame.width() as f32 * self.frame_scale) as u32).max(1);
        let height = ((frame.height() as f32 * self.frame_scale) as u32).max(1);
        let small = frame.resize_exact(width, height, FilterType::Triangle).to_rgb8();

        let embeddings =
            match tokio::time::timeout(self.frame_timeout, self.engine.embed_faces(small)).await {
                Ok(result) => result?,
                Err(_) => return Err(FrameError::Timeout),
            };

        let gallery = self.cache.snapshot();
        for embedding in &embeddings {
            let result = NearestMatcher.nearest(embedding, &gallery, self.tolerance);
            let name = match (&result.name, result.matched) {
                (Some(name), true) => name.as_str(),
                _ => UNKNOWN_NAME,
            };
            if name != UNKNOWN_NAME {
                tracing::info!(name, distance = result.distance, "watch-list face detected");
                return Ok(Some(Notification {
                    message: format!("Watch-list face detected: {name}"),
                }));
            }
        }

        Ok(None)
    }
}
