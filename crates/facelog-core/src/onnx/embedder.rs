//! MobileFaceNet face embedder via ONNX Runtime.
//!
//! Crops a detected face from the grayscale frame, resizes it to the
//! 112x112 model input, and produces a 128-dimensional L2-normalized
//! embedding.

use crate::extractor::ExtractorError;
use crate::types::{BoundingBox, Embedding, EMBEDDING_DIM};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const EMBEDDER_INPUT_SIZE: usize = 112;
const EMBEDDER_MEAN: f32 = 127.5;
const EMBEDDER_STD: f32 = 127.5;
/// Fraction of the box size added on each side before cropping, so the
/// crop carries some context around a tight detection box.
const CROP_MARGIN: f32 = 0.1;

/// MobileFaceNet-based face embedder.
pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    /// Load the MobileFaceNet ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, ExtractorError> {
        if !Path::new(model_path).exists() {
            return Err(ExtractorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded MobileFaceNet model"
        );

        Ok(Self { session })
    }

    /// Extract an embedding for one detected face.
    pub fn embed(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
        face: &BoundingBox,
    ) -> Result<Embedding, ExtractorError> {
        let input = crop_and_preprocess(gray, width as usize, height as usize, face);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("embedding: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(ExtractorError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        let mut embedding = Embedding::new(raw.to_vec());
        embedding.l2_normalize();
        Ok(embedding)
    }
}

/// Crop the face region (with margin, clamped to the frame) and resize
/// it to 112x112 in one bilinear pass, normalized into a NCHW tensor.
fn crop_and_preprocess(gray: &[u8], width: usize, height: usize, face: &BoundingBox) -> Array4<f32> {
    let margin_x = face.width * CROP_MARGIN;
    let margin_y = face.height * CROP_MARGIN;
    let x0 = (face.x - margin_x).max(0.0);
    let y0 = (face.y - margin_y).max(0.0);
    let x1 = (face.x + face.width + margin_x).min(width as f32 - 1.0);
    let y1 = (face.y + face.height + margin_y).min(height as f32 - 1.0);

    let crop_w = (x1 - x0).max(1.0);
    let crop_h = (y1 - y0).max(1.0);

    let size = EMBEDDER_INPUT_SIZE;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for y in 0..size {
        let src_y = (y0 + (y as f32 + 0.5) / size as f32 * crop_h - 0.5)
            .clamp(0.0, height as f32 - 1.0);
        let sy0 = src_y.floor() as usize;
        let sy1 = (sy0 + 1).min(height - 1);
        let fy = src_y - sy0 as f32;

        for x in 0..size {
            let src_x = (x0 + (x as f32 + 0.5) / size as f32 * crop_w - 0.5)
                .clamp(0.0, width as f32 - 1.0);
            let sx0 = src_x.floor() as usize;
            let sx1 = (sx0 + 1).min(width - 1);
            let fx = src_x - sx0 as f32;

            let tl = gray[sy0 * width + sx0] as f32;
            let tr = gray[sy0 * width + sx1] as f32;
            let bl = gray[sy1 * width + sx0] as f32;
            let br = gray[sy1 * width + sx1] as f32;

            let pixel = tl * (1.0 - fx) * (1.0 - fy)
                + tr * fx * (1.0 - fy)
                + bl * (1.0 - fx) * fy
                + br * fx * fy;

            let normalized = (pixel - EMBEDDER_MEAN) / EMBEDDER_STD;
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_frame_box(width: f32, height: f32) -> BoundingBox {
        BoundingBox { x: 0.0, y: 0.0, width, height, confidence: 1.0 }
    }

    #[test]
    fn test_crop_output_shape() {
        let gray = vec![128u8; 200 * 200];
        let tensor = crop_and_preprocess(&gray, 200, 200, &full_frame_box(200.0, 200.0));
        assert_eq!(tensor.shape(), &[1, 3, EMBEDDER_INPUT_SIZE, EMBEDDER_INPUT_SIZE]);
    }

    #[test]
    fn test_crop_normalization() {
        // Uniform 127.5-ish frame: 128 normalizes to (128-127.5)/127.5.
        let gray = vec![128u8; 200 * 200];
        let tensor = crop_and_preprocess(&gray, 200, 200, &full_frame_box(200.0, 200.0));
        let expected = (128.0 - EMBEDDER_MEAN) / EMBEDDER_STD;
        assert!((tensor[[0, 1, 50, 50]] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_crop_box_outside_frame_is_clamped() {
        // A box hanging past the frame edge must not index out of bounds.
        let gray = vec![64u8; 100 * 100];
        let face = BoundingBox { x: 80.0, y: 80.0, width: 50.0, height: 50.0, confidence: 0.9 };
        let tensor = crop_and_preprocess(&gray, 100, 100, &face);
        let expected = (64.0 - EMBEDDER_MEAN) / EMBEDDER_STD;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_crop_channels_identical() {
        let gray: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
        let tensor = crop_and_preprocess(&gray, 100, 100, &full_frame_box(100.0, 100.0));
        for y in [0, 55, 111] {
            for x in [0, 55, 111] {
                assert_eq!(tensor[[0, 0, y, x]], tensor[[0, 1, y, x]]);
                assert_eq!(tensor[[0, 1, y, x]], tensor[[0, 2, y, x]]);
            }
        }
    }
}
