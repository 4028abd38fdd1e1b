//! Attendance monitoring loop.
//!
//! Single-threaded and blocking: each iteration grabs a frame,
//! downscales it, extracts faces, resolves each against the in-memory
//! identity snapshot, prints the overlay line, then polls one command
//! from the stdin channel. Only the first detected face in a frame is
//! actionable for check-in/check-out; the rest are display-only.

use crate::config::Config;
use crate::input::{self, Command};
use crate::register;
use chrono::{Local, NaiveDateTime};
use facelog_core::{
    BoundingBox, Detection, FaceExtractor, FirstMatcher, KnownFace, Match, Matcher, OnnxExtractor,
};
use facelog_hw::Camera;
use facelog_store::{EventKind, IdentityStore, StoreError};
use std::sync::mpsc::TryRecvError;

/// One face in the current frame, with its box mapped back to full-frame
/// coordinates and its identity resolved (or not).
pub struct ResolvedFace {
    pub bbox: BoundingBox,
    pub matched: Option<Match>,
}

/// `facelog monitor` entry point.
pub fn run(config: &Config) -> anyhow::Result<()> {
    let store = IdentityStore::open(&config.db_path)?;
    let mut extractor = OnnxExtractor::load(&config.model_dir)?;
    run_loop(config, &store, &mut extractor)
}

fn run_loop(
    config: &Config,
    store: &IdentityStore,
    extractor: &mut dyn FaceExtractor,
) -> anyhow::Result<()> {
    let mut known = store.load_all()?;
    tracing::info!(identities = known.len(), "loaded identity snapshot");

    // Camera open failure here is fatal; there is nothing to monitor.
    let mut camera = Camera::open(&config.camera_device)?;

    println!("Starting attendance monitoring...");
    println!("Type 'r' + Enter to register a new face");
    println!("Type 'c' + Enter to check-in the currently detected person");
    println!("Type 'g' + Enter to check-out the currently detected person");
    println!("Type 'q' + Enter to quit");

    let lines = input::spawn_stdin_lines();
    let mut last_overlay = String::new();

    loop {
        let frame = match camera.capture_frame() {
            Ok(f) => f,
            Err(e) => {
                // A failed read ends the loop; no retry.
                tracing::error!(error = %e, "frame capture failed, stopping monitor");
                println!("Failed to capture frame. Exiting...");
                break;
            }
        };

        let small = frame.downscaled(config.downscale);
        let detections = extractor.extract(&small.data, small.width, small.height)?;
        let resolved = resolve_faces(&detections, &known, config.tolerance, config.downscale as f32);

        let overlay = format_overlay(&resolved);
        if overlay != last_overlay {
            println!("{overlay}");
            last_overlay = overlay;
        }

        match lines.try_recv() {
            Ok(line) => match input::parse_command(&line) {
                Some(Command::Register) => {
                    // Release the device before the registration flow
                    // opens its own handle.
                    drop(camera);
                    if let Err(e) = register::run_registration(
                        config,
                        store,
                        extractor,
                        &mut || lines.recv().ok(),
                    ) {
                        println!("Registration failed: {e}");
                    }
                    known = store.load_all()?;
                    camera = Camera::open(&config.camera_device)?;
                    last_overlay.clear();
                }
                Some(Command::CheckIn) => handle_event(store, &resolved, EventKind::CheckIn),
                Some(Command::CheckOut) => handle_event(store, &resolved, EventKind::CheckOut),
                Some(Command::Quit) => break,
                None => {}
            },
            Err(TryRecvError::Empty) => {}
            // Stdin closed: nothing can ever command us again.
            Err(TryRecvError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Resolve every detection against the identity snapshot with the
/// first-match rule, scaling boxes back to full-frame coordinates.
fn resolve_faces(
    detections: &[Detection],
    known: &[KnownFace],
    tolerance: f32,
    scale: f32,
) -> Vec<ResolvedFace> {
    detections
        .iter()
        .map(|d| ResolvedFace {
            bbox: d.bbox.scaled(scale),
            matched: FirstMatcher.resolve(&d.embedding, known, tolerance),
        })
        .collect()
}

/// One status line describing the faces in the current frame.
fn format_overlay(faces: &[ResolvedFace]) -> String {
    if faces.is_empty() {
        return "[no face]".to_string();
    }
    let labels: Vec<String> = faces
        .iter()
        .map(|f| match &f.matched {
            Some(m) => format!("{} ({:.2})", m.name, m.distance),
            None => "Unknown".to_string(),
        })
        .collect();
    format!("[{} face(s)] {}", faces.len(), labels.join(", "))
}

fn handle_event(store: &IdentityStore, faces: &[ResolvedFace], kind: EventKind) {
    let label = match kind {
        EventKind::CheckIn => "check-in",
        EventKind::CheckOut => "check-out",
    };
    let now = Local::now().naive_local();
    match record_event(store, faces, kind, now) {
        Ok(Some(m)) => {
            println!("{} recorded for {} at {}", label, m.name, now.format("%Y-%m-%d %H:%M:%S"));
        }
        Ok(None) => println!("No recognized face to {label}."),
        // A storage failure abandons the event but keeps the loop alive.
        Err(e) => println!("Failed to record {label}: {e}"),
    }
}

/// Append an attendance event for the first detected face, if it
/// resolved to an identity. `Ok(None)` means no actionable face.
fn record_event(
    store: &IdentityStore,
    faces: &[ResolvedFace],
    kind: EventKind,
    now: NaiveDateTime,
) -> Result<Option<Match>, StoreError> {
    let Some(m) = faces.first().and_then(|f| f.matched.clone()) else {
        return Ok(None);
    };
    store.append_attendance(m.identity_id, kind, now)?;
    Ok(Some(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use facelog_core::{Embedding, DEFAULT_TOLERANCE};

    fn detection(values: &[f32]) -> Detection {
        Detection {
            bbox: BoundingBox { x: 10.0, y: 10.0, width: 20.0, height: 20.0, confidence: 0.9 },
            embedding: Embedding::new(values.to_vec()),
        }
    }

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 8, 29)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn store_with_alice() -> (IdentityStore, i64) {
        let store = IdentityStore::open_in_memory().unwrap();
        let id = store
            .register("alice", &[Embedding::new(vec![1.0, 0.0, 0.0])])
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_resolve_registered_probe_matches() {
        let (store, id) = store_with_alice();
        let known = store.load_all().unwrap();
        // Probe with the registered embedding itself: distance 0.
        let resolved = resolve_faces(&[detection(&[1.0, 0.0, 0.0])], &known, DEFAULT_TOLERANCE, 2.0);
        let m = resolved[0].matched.as_ref().unwrap();
        assert_eq!(m.identity_id, id);
        assert_eq!(m.name, "alice");
    }

    #[test]
    fn test_resolve_unrelated_probe_is_unknown() {
        let (store, _) = store_with_alice();
        let known = store.load_all().unwrap();
        let resolved = resolve_faces(&[detection(&[0.0, 0.0, 1.0])], &known, DEFAULT_TOLERANCE, 2.0);
        assert!(resolved[0].matched.is_none());
    }

    #[test]
    fn test_resolve_scales_boxes_to_full_frame() {
        let resolved = resolve_faces(&[detection(&[1.0])], &[], DEFAULT_TOLERANCE, 2.0);
        assert_eq!(resolved[0].bbox.x, 20.0);
        assert_eq!(resolved[0].bbox.width, 40.0);
    }

    #[test]
    fn test_record_event_no_face_writes_nothing() {
        let (store, _) = store_with_alice();
        let outcome = record_event(&store, &[], EventKind::CheckIn, now()).unwrap();
        assert!(outcome.is_none());
        assert!(store.attendance_log(10).unwrap().is_empty());
    }

    #[test]
    fn test_record_event_unknown_first_face_writes_nothing() {
        let (store, _id) = store_with_alice();
        let known = store.load_all().unwrap();
        // First face unknown, second face is alice: the first face rules.
        let detections = vec![detection(&[0.0, 0.0, 1.0]), detection(&[1.0, 0.0, 0.0])];
        let resolved = resolve_faces(&detections, &known, DEFAULT_TOLERANCE, 1.0);
        assert!(resolved[1].matched.is_some());

        let outcome = record_event(&store, &resolved, EventKind::CheckIn, now()).unwrap();
        assert!(outcome.is_none());
        assert!(store.attendance_log(10).unwrap().is_empty());
    }

    #[test]
    fn test_record_event_appends_for_first_face() {
        let (store, id) = store_with_alice();
        let known = store.load_all().unwrap();
        let resolved = resolve_faces(&[detection(&[1.0, 0.0, 0.0])], &known, DEFAULT_TOLERANCE, 1.0);

        let m = record_event(&store, &resolved, EventKind::CheckOut, now())
            .unwrap()
            .unwrap();
        assert_eq!(m.identity_id, id);

        let log = store.attendance_log(10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].identity_id, id);
        assert_eq!(log[0].event, "checkout");
    }

    #[test]
    fn test_format_overlay() {
        assert_eq!(format_overlay(&[]), "[no face]");

        let faces = vec![
            ResolvedFace {
                bbox: BoundingBox { x: 0.0, y: 0.0, width: 1.0, height: 1.0, confidence: 1.0 },
                matched: Some(Match { identity_id: 1, name: "alice".into(), distance: 0.25 }),
            },
            ResolvedFace {
                bbox: BoundingBox { x: 0.0, y: 0.0, width: 1.0, height: 1.0, confidence: 1.0 },
                matched: None,
            },
        ];
        assert_eq!(format_overlay(&faces), "[2 face(s)] alice (0.25), Unknown");
    }
}
