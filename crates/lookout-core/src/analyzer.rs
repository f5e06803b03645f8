//! The recognition capability interface.
//!
//! The rest of the system treats face localization and embedding extraction
//! as an opaque capability behind [`FaceAnalyzer`]; [`OnnxAnalyzer`] is the
//! production implementation, and tests inject stubs.

use crate::detector::{DetectorError, FaceDetector};
use crate::encoder::{EncoderError, FaceEncoder};
use crate::types::{Embedding, FaceBox};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),
}

/// Face localization and embedding extraction, injected into the
/// registration and frame-recognition services.
pub trait FaceAnalyzer: Send {
    /// Detect faces in an RGB image, in the analyzer's detection order.
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<FaceBox>, AnalyzerError>;

    /// Extract one embedding per detected face, preserving box order.
    fn embed_faces(
        &mut self,
        image: &RgbImage,
        boxes: &[FaceBox],
    ) -> Result<Vec<Embedding>, AnalyzerError>;

    /// Detect then embed, returning embeddings in detection order.
    fn embeddings(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, AnalyzerError> {
        let boxes = self.detect_faces(image)?;
        self.embed_faces(image, &boxes)
    }
}

/// ONNX Runtime backed analyzer: single-shot detector + embedding encoder.
pub struct OnnxAnalyzer {
    detector: FaceDetector,
    encoder: FaceEncoder,
}

impl OnnxAnalyzer {
    /// Load both models. Fails fast if either file is missing or malformed.
    pub fn load(detector_path: &str, encoder_path: &str) -> Result<Self, AnalyzerError> {
        let detector = FaceDetector::load(detector_path)?;
        let encoder = FaceEncoder::load(encoder_path)?;
        Ok(Self { detector, encoder })
    }
}

impl FaceAnalyzer for OnnxAnalyzer {
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<FaceBox>, AnalyzerError> {
        Ok(self.detector.detect(image)?)
    }

    fn embed_faces(
        &mut self,
        image: &RgbImage,
        boxes: &[FaceBox],
    ) -> Result<Vec<Embedding>, AnalyzerError> {
        let mut embeddings = Vec::with_capacity(boxes.len());
        for face in boxes {
            embeddings.push(self.encoder.embed(image, face)?);
        }
        Ok(embeddings)
    }
}
