//! rollcall-core — face matching and attendance domain logic.
//!
//! Pure building blocks for the attendance daemon: great-circle distance,
//! work-mode geofence classification, embedding matching against the
//! enrollment set, place-label selection from reverse-geocode payloads,
//! the persisted record schema, and the ONNX face encoder.

pub mod clock;
pub mod encoder;
pub mod geo;
pub mod matcher;
pub mod place;
pub mod record;
pub mod types;

pub use matcher::{Embedding, FaceMatch, KnownFaceSet, MATCH_TOLERANCE};
pub use types::{GeoPoint, Identity, WorkMode};
