use rollcall_core::GeoPoint;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address (default: 0.0.0.0:8750).
    pub bind_addr: SocketAddr,
    /// Path to the SQLite document store.
    pub db_path: PathBuf,
    /// Path to the JSON enrollment store (parallel names/encodings).
    pub known_faces_path: PathBuf,
    /// Path to the ONNX face encoder model.
    pub encoder_model_path: String,
    /// The office's fixed coordinates for WFO geofencing.
    pub office: GeoPoint,
    /// Maximum Euclidean distance for an accepted face match.
    pub match_tolerance: f32,
    /// Collection holding the per-day attendance documents.
    pub attendance_collection: String,
    /// Base URL of the Nominatim-compatible reverse geocoder.
    pub geocode_base_url: String,
    /// Per-attempt timeout for reverse-geocode lookups.
    pub geocode_timeout_secs: u64,
    /// Shell command for the legacy background scan, if configured.
    pub scan_command: Option<String>,
    /// How long finished scan entries survive before pruning.
    pub scan_ttl_secs: u64,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let db_path = std::env::var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("attendance.db"));

        let known_faces_path = std::env::var("ROLLCALL_KNOWN_FACES")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("known_faces.json"));

        Self {
            bind_addr: std::env::var("ROLLCALL_BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8750))),
            db_path,
            known_faces_path,
            encoder_model_path: std::env::var("ROLLCALL_ENCODER_MODEL")
                .unwrap_or_else(|_| "models/face_encoder.onnx".to_string()),
            office: GeoPoint {
                latitude: env_f64("ROLLCALL_OFFICE_LAT", 3.205170),
                longitude: env_f64("ROLLCALL_OFFICE_LNG", 101.720107),
            },
            match_tolerance: env_f32("ROLLCALL_MATCH_TOLERANCE", rollcall_core::MATCH_TOLERANCE),
            attendance_collection: std::env::var("ROLLCALL_ATTENDANCE_COLLECTION")
                .unwrap_or_else(|_| "attendance".to_string()),
            geocode_base_url: std::env::var("ROLLCALL_GEOCODE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            geocode_timeout_secs: env_u64("ROLLCALL_GEOCODE_TIMEOUT_SECS", 5),
            scan_command: std::env::var("ROLLCALL_SCAN_COMMAND").ok(),
            scan_ttl_secs: env_u64("ROLLCALL_SCAN_TTL_SECS", 3600),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
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
