//! ONNX-backed face extraction: UltraFace detection + MobileFaceNet
//! embedding, composed behind the [`FaceExtractor`] trait.

pub mod detector;
pub mod embedder;

use crate::extractor::{Detection, ExtractorError, FaceExtractor};
use detector::FaceDetector;
use embedder::FaceEmbedder;

/// Default file names within the model directory.
pub const DETECTOR_MODEL_FILE: &str = "version-RFB-320.onnx";
pub const EMBEDDER_MODEL_FILE: &str = "mobilefacenet.onnx";

/// Production extractor: one detection pass, then one embedding pass
/// per detected face.
pub struct OnnxExtractor {
    detector: FaceDetector,
    embedder: FaceEmbedder,
}

impl OnnxExtractor {
    /// Load both models from `model_dir`. Fails fast if either file is
    /// missing so startup aborts before the camera is touched.
    pub fn load(model_dir: &std::path::Path) -> Result<Self, ExtractorError> {
        let det_path = model_dir.join(DETECTOR_MODEL_FILE);
        let emb_path = model_dir.join(EMBEDDER_MODEL_FILE);

        let detector = FaceDetector::load(&det_path.to_string_lossy())?;
        let embedder = FaceEmbedder::load(&emb_path.to_string_lossy())?;

        Ok(Self { detector, embedder })
    }
}

impl FaceExtractor for OnnxExtractor {
    fn extract(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, ExtractorError> {
        let faces = self.detector.detect(gray, width, height)?;
        if faces.is_empty() {
            return Ok(Vec::new());
        }

        let mut detections = Vec::with_capacity(faces.len());
        for bbox in faces {
            let embedding = self.embedder.embed(gray, width, height, &bbox)?;
            detections.push(Detection { bbox, embedding });
        }

        tracing::debug!(count = detections.len(), "extracted faces");
        Ok(detections)
    }
}
