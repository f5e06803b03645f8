use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Listen address for the HTTP server.
    pub bind_addr: String,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Euclidean distance threshold for a positive watch-list match.
    pub tolerance: f32,
    /// Linear downscale factor applied to incoming frames before detection.
    pub frame_scale: f32,
    /// Maximum number of faces that may be registered.
    pub max_registered: usize,
    /// Upper bound on per-frame inference time, in milliseconds.
    pub frame_timeout_ms: u64,
}

impl Config {
    /// Load configuration from `LOOKOUT_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("lookout");

        let db_path = std::env::var("LOOKOUT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("faces.db"));

        let model_dir = std::env::var("LOOKOUT_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("models"));

        Self {
            bind_addr: std::env::var("LOOKOUT_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            db_path,
            model_dir,
            tolerance: env_f32("LOOKOUT_TOLERANCE", 0.6),
            frame_scale: env_f32("LOOKOUT_FRAME_SCALE", 0.25),
            max_registered: env_usize("LOOKOUT_MAX_REGISTERED", 10),
            frame_timeout_ms: env_u64("LOOKOUT_FRAME_TIMEOUT_MS", 2000),
        }
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("ultraface-rfb-320.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the face embedding model.
    pub fn encoder_model_path(&self) -> String {
        self.model_dir
            .join("face-encoder-128.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
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
