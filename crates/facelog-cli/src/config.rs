use std::path::PathBuf;

/// Runtime configuration, loaded from `FACELOG_*` environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0, the first camera).
    pub camera_device: String,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Maximum embedding distance for a positive match.
    pub tolerance: f32,
    /// Frames discarded before a registration capture (AE/AGC settling).
    pub warmup_frames: usize,
    /// Integer downscale factor applied before extraction in the
    /// monitoring loop.
    pub downscale: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("facelog");

        let model_dir = std::env::var("FACELOG_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("models"));

        let db_path = std::env::var("FACELOG_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("attendance.db"));

        Self {
            camera_device: std::env::var("FACELOG_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir,
            db_path,
            tolerance: env_f32("FACELOG_TOLERANCE", facelog_core::DEFAULT_TOLERANCE),
            warmup_frames: env_usize("FACELOG_WARMUP_FRAMES", 4),
            downscale: env_u32("FACELOG_DOWNSCALE", 2),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
