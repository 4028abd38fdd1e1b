//! Face extraction contract.
//!
//! An extractor turns a grayscale frame into zero or more detections,
//! each pairing a bounding box with an embedding. A frame with no face
//! yields an empty vector, never an error; errors are reserved for
//! genuine inference failures.

use crate::types::{BoundingBox, Embedding};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

impl From<ort::Error<ort::session::builder::SessionBuilder>> for ExtractorError {
    fn from(e: ort::Error<ort::session::builder::SessionBuilder>) -> Self {
        ExtractorError::Ort(ort::Error::from(e))
    }
}

/// One detected face: a box and its embedding, paired by index.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// Source of face detections for a frame.
///
/// Result order is unspecified; callers must not rely on it beyond the
/// box/embedding pairing within each [`Detection`].
pub trait FaceExtractor {
    fn extract(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, ExtractorError>;
}
