//! UltraFace face detector via ONNX Runtime.
//!
//! Runs the version-RFB-320 model: a single forward pass produces
//! per-prior class scores and corner-form boxes normalized to [0, 1],
//! so decoding is a scale back to frame coordinates plus NMS.

use crate::extractor::ExtractorError;
use crate::types::BoundingBox;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const ULTRAFACE_INPUT_WIDTH: usize = 320;
const ULTRAFACE_INPUT_HEIGHT: usize = 240;
const ULTRAFACE_MEAN: f32 = 127.0;
const ULTRAFACE_STD: f32 = 128.0;
const ULTRAFACE_SCORE_THRESHOLD: f32 = 0.7;
const ULTRAFACE_NMS_THRESHOLD: f32 = 0.3;

/// UltraFace-based face detector.
pub struct FaceDetector {
    session: Session,
}

impl FaceDetector {
    /// Load the UltraFace ONNX model from the given path.
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
            "loaded UltraFace model"
        );

        Ok(Self { session })
    }

    /// Detect faces in a grayscale frame. Returns boxes in frame pixel
    /// coordinates, highest confidence first; empty when no face clears
    /// the score threshold.
    pub fn detect(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, ExtractorError> {
        let input = preprocess(gray, width as usize, height as usize);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("scores: {e}")))?;
        let (_, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("boxes: {e}")))?;

        let candidates = decode(scores, boxes, width as f32, height as f32, ULTRAFACE_SCORE_THRESHOLD);
        let mut result = nms(candidates, ULTRAFACE_NMS_THRESHOLD);
        result.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(result)
    }
}

/// Resize a grayscale frame to 320x240 (plain stretch; UltraFace boxes
/// come back normalized, so no letterbox bookkeeping is needed) and
/// normalize into a NCHW tensor with the Y value replicated per channel.
fn preprocess(gray: &[u8], width: usize, height: usize) -> Array4<f32> {
    let in_w = ULTRAFACE_INPUT_WIDTH;
    let in_h = ULTRAFACE_INPUT_HEIGHT;
    let mut tensor = Array4::<f32>::zeros((1, 3, in_h, in_w));

    let sx = width as f32 / in_w as f32;
    let sy = height as f32 / in_h as f32;

    for y in 0..in_h {
        let src_y = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, height as f32 - 1.0);
        let y0 = src_y.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = src_y - y0 as f32;

        for x in 0..in_w {
            let src_x = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, width as f32 - 1.0);
            let x0 = src_x.floor() as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = src_x - x0 as f32;

            let tl = gray[y0 * width + x0] as f32;
            let tr = gray[y0 * width + x1] as f32;
            let bl = gray[y1 * width + x0] as f32;
            let br = gray[y1 * width + x1] as f32;

            let pixel = tl * (1.0 - fx) * (1.0 - fy)
                + tr * fx * (1.0 - fy)
                + bl * (1.0 - fx) * fy
                + br * fx * fy;

            let normalized = (pixel - ULTRAFACE_MEAN) / ULTRAFACE_STD;
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }

    tensor
}

/// Decode UltraFace outputs into pixel-space boxes.
///
/// `scores` is [priors * 2] (background, face); `boxes` is [priors * 4]
/// corner-form coordinates normalized to the input.
fn decode(scores: &[f32], boxes: &[f32], frame_w: f32, frame_h: f32, threshold: f32) -> Vec<BoundingBox> {
    let priors = scores.len() / 2;
    let mut detections = Vec::new();

    for i in 0..priors {
        let confidence = scores[i * 2 + 1];
        if confidence <= threshold {
            continue;
        }
        let off = i * 4;
        if off + 3 >= boxes.len() {
            continue;
        }
        let x1 = boxes[off] * frame_w;
        let y1 = boxes[off + 1] * frame_h;
        let x2 = boxes[off + 2] * frame_w;
        let y2 = boxes[off + 3] * frame_h;

        detections.push(BoundingBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence,
        });
    }

    detections
}

/// Non-Maximum Suppression: drop boxes that overlap a higher-confidence
/// box by more than `iou_threshold`.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<BoundingBox> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| k.iou(&det) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}
