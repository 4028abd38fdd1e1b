//! facelog-core — Face matching and embedding extraction.
//!
//! Detection uses UltraFace (version-RFB-320) and embedding extraction
//! uses MobileFaceNet, both running via ONNX Runtime for CPU inference.

pub mod extractor;
pub mod matcher;
pub mod onnx;
pub mod types;

pub use extractor::{Detection, ExtractorError, FaceExtractor};
pub use matcher::{FirstMatcher, Match, Matcher, DEFAULT_TOLERANCE};
pub use onnx::OnnxExtractor;
pub use types::{BoundingBox, Embedding, KnownFace, EMBEDDING_DIM};
