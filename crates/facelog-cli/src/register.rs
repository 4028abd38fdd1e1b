//! Registration flow: capture one fresh frame, ask for a name, extract
//! embeddings, persist them.
//!
//! The camera is opened only for the duration of the capture and is
//! released (dropped) before the name prompt, so the device is free
//! while the user types.

use crate::config::Config;
use facelog_core::{Embedding, ExtractorError, FaceExtractor, OnnxExtractor};
use facelog_hw::{Camera, CameraError, Frame};
use facelog_store::{IdentityStore, StoreError};
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("extractor: {0}")]
    Extractor(#[from] ExtractorError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("no name entered; registration cancelled")]
    NoName,
}

/// What a single registration attempt produced. A frame without a face
/// aborts the attempt but is not an error for the caller.
pub enum RegistrationOutcome {
    Registered { id: i64, count: usize },
    NoFaceDetected,
}

/// Open the camera, let exposure settle, grab one frame. The handle is
/// dropped on return (success or error), releasing the device.
pub fn capture_registration_frame(config: &Config) -> Result<Frame, CameraError> {
    println!("Starting the webcam...");
    let camera = Camera::open(&config.camera_device)?;
    camera.discard_warmup_frames(config.warmup_frames);
    camera.capture_frame()
}

/// Extract embeddings from the captured frame and store them under
/// `name`, one identity row per detected face.
pub fn register_face(
    store: &IdentityStore,
    extractor: &mut dyn FaceExtractor,
    frame: &Frame,
    name: &str,
) -> Result<RegistrationOutcome, RegisterError> {
    let detections = extractor.extract(&frame.data, frame.width, frame.height)?;
    if detections.is_empty() {
        return Ok(RegistrationOutcome::NoFaceDetected);
    }

    let embeddings: Vec<Embedding> = detections.into_iter().map(|d| d.embedding).collect();
    let count = embeddings.len();
    let id = store.register(name, &embeddings)?;
    Ok(RegistrationOutcome::Registered { id, count })
}

/// Run one registration attempt, reading the name from `read_name`
/// (direct stdin for the `register` subcommand, the monitor loop's line
/// channel otherwise). Prints the outcome.
pub fn run_registration(
    config: &Config,
    store: &IdentityStore,
    extractor: &mut dyn FaceExtractor,
    read_name: &mut dyn FnMut() -> Option<String>,
) -> Result<(), RegisterError> {
    let frame = capture_registration_frame(config)?;

    print!("Enter the name of the person: ");
    let _ = std::io::stdout().flush();
    let name = read_name().map(|n| n.trim().to_string()).ok_or(RegisterError::NoName)?;
    if name.is_empty() {
        return Err(RegisterError::NoName);
    }

    match register_face(store, extractor, &frame, &name)? {
        RegistrationOutcome::Registered { id, count } => {
            tracing::info!(name, id, count, "registration complete");
            println!("Facial data for {name} stored successfully.");
        }
        RegistrationOutcome::NoFaceDetected => {
            println!("No faces found in the image.");
        }
    }
    Ok(())
}

/// `facelog register` entry point: one-shot registration against a
/// fresh store and extractor, name read from stdin.
pub fn run(config: &Config) -> anyhow::Result<()> {
    let store = IdentityStore::open(&config.db_path)?;
    let mut extractor = OnnxExtractor::load(&config.model_dir)?;

    let mut read_name = || {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).ok().map(|_| line)
    };
    run_registration(config, &store, &mut extractor, &mut read_name)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use facelog_core::{BoundingBox, Detection};

    /// Extractor returning a canned set of detections for any frame.
    struct FakeExtractor {
        detections: Vec<Detection>,
    }

    impl FaceExtractor for FakeExtractor {
        fn extract(
            &mut self,
            _gray: &[u8],
            _width: u32,
            _height: u32,
        ) -> Result<Vec<Detection>, ExtractorError> {
            Ok(self.detections.clone())
        }
    }

    fn frame() -> Frame {
        Frame { data: vec![0u8; 16], width: 4, height: 4, sequence: 0 }
    }

    fn detection(values: &[f32]) -> Detection {
        Detection {
            bbox: BoundingBox { x: 0.0, y: 0.0, width: 4.0, height: 4.0, confidence: 0.9 },
            embedding: Embedding::new(values.to_vec()),
        }
    }

    #[test]
    fn test_register_face_stores_one_row_per_detection() {
        let store = IdentityStore::open_in_memory().unwrap();
        let mut extractor = FakeExtractor {
            detections: vec![detection(&[1.0, 0.0]), detection(&[0.0, 1.0])],
        };

        let outcome = register_face(&store, &mut extractor, &frame(), "alice").unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Registered { count: 2, .. }));

        let known = store.load_all().unwrap();
        assert_eq!(known.len(), 2);
        assert!(known.iter().all(|k| k.name == "alice"));
    }

    #[test]
    fn test_register_face_no_face_stores_nothing() {
        let store = IdentityStore::open_in_memory().unwrap();
        let mut extractor = FakeExtractor { detections: vec![] };

        let outcome = register_face(&store, &mut extractor, &frame(), "alice").unwrap();
        assert!(matches!(outcome, RegistrationOutcome::NoFaceDetected));
        assert!(store.load_all().unwrap().is_empty());
    }
}
