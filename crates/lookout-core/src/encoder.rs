//! Face embedding encoder via ONNX Runtime.
//!
//! Crops a detected face with margin, resizes to the model input, and runs a
//! 128-dimensional face embedding model. Distances between embeddings are
//! compared with the Euclidean tolerance defined in [`crate::types`].

use crate::types::{Embedding, FaceBox, EMBEDDING_DIM};
use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ENCODER_INPUT_SIZE: usize = 160;
const ENCODER_MEAN: f32 = 127.5;
const ENCODER_STD: f32 = 128.0;
/// Fractional margin added around the detection box before cropping, so the
/// encoder sees some surrounding context.
const CROP_MARGIN: f32 = 0.2;

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face box {0}x{1} does not intersect the image")]
    EmptyCrop(u32, u32),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// 128-dim face embedding encoder.
pub struct FaceEncoder {
    session: Session,
}

impl FaceEncoder {
    /// Load the embedding ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EncoderError> {
        if !Path::new(model_path).exists() {
            return Err(EncoderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)
            .map_err(ort::Error::from)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face embedding model"
        );

        Ok(Self { session })
    }

    /// Extract the embedding for one detected face.
    pub fn embed(&mut self, image: &RgbImage, face: &FaceBox) -> Result<Embedding, EncoderError> {
        let crop = crop_with_margin(image, face, CROP_MARGIN)
            .ok_or(EncoderError::EmptyCrop(image.width(), image.height()))?;
        let input = preprocess(&crop);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncoderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(EncoderError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding::new(raw.to_vec()))
    }
}

/// Crop the face box expanded by `margin` on every side, clamped to the
/// image bounds. Returns `None` when the clamped region is empty.
fn crop_with_margin(image: &RgbImage, face: &FaceBox, margin: f32) -> Option<RgbImage> {
    let pad_x = face.width * margin;
    let pad_y = face.height * margin;

    let x1 = (face.x - pad_x).max(0.0) as u32;
    let y1 = (face.y - pad_y).max(0.0) as u32;
    let x2 = ((face.x + face.width + pad_x).min(image.width() as f32)) as u32;
    let y2 = ((face.y + face.height + pad_y).min(image.height() as f32)) as u32;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(image::imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image())
}

/// Resize a face crop to the encoder input and normalize into NCHW floats.
fn preprocess(crop: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
        crop,
        ENCODER_INPUT_SIZE as u32,
        ENCODER_INPUT_SIZE as u32,
        FilterType::Triangle,
    );

    let mut tensor = Array4::<f32>::zeros((1, 3, ENCODER_INPUT_SIZE, ENCODER_INPUT_SIZE));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel.0[c] as f32 - ENCODER_MEAN) / ENCODER_STD;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_with_margin_inside_bounds() {
        let image = RgbImage::new(100, 100);
        let face = FaceBox {
            x: 40.0,
            y: 40.0,
            width: 20.0,
            height: 20.0,
            confidence: 0.9,
        };
        let crop = crop_with_margin(&image, &face, 0.2).unwrap();
        // 20 + 2 * 4 margin on each axis
        assert_eq!(crop.width(), 28);
        assert_eq!(crop.height(), 28);
    }

    #[test]
    fn test_crop_with_margin_clamps_to_image() {
        let image = RgbImage::new(50, 50);
        let face = FaceBox {
            x: -10.0,
            y: 40.0,
            width: 30.0,
            height: 30.0,
            confidence: 0.9,
        };
        let crop = crop_with_margin(&image, &face, 0.2).unwrap();
        assert!(crop.width() <= 50);
        assert!(crop.height() <= 50);
    }

    #[test]
    fn test_crop_with_margin_empty_region() {
        let image = RgbImage::new(50, 50);
        let face = FaceBox {
            x: 100.0,
            y: 100.0,
            width: 10.0,
            height: 10.0,
            confidence: 0.9,
        };
        assert!(crop_with_margin(&image, &face, 0.2).is_none());
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let mut crop = RgbImage::new(32, 32);
        for pixel in crop.pixels_mut() {
            pixel.0 = [128, 128, 128];
        }
        let tensor = preprocess(&crop);
        assert_eq!(
            tensor.shape(),
            &[1, 3, ENCODER_INPUT_SIZE, ENCODER_INPUT_SIZE]
        );
        let expected = (128.0 - ENCODER_MEAN) / ENCODER_STD;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-6);
    }
}
