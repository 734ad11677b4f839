//! HTTP surface of the attendance daemon.

use crate::config::Config;
use crate::error::ApiError;
use crate::geocode::PlaceResolver;
use crate::pipeline::{self, CheckInContext};
use crate::scan::{ScanRegistry, ScanStatus};
use crate::store::DocumentStore;
use axum::extract::{FromRequest, Path, Request, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use chrono::{DateTime, Utc};
use rollcall_core::encoder::FaceEncoder;
use rollcall_core::{clock, GeoPoint, KnownFaceSet, WorkMode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

const STAFF_LOCATIONS_COLLECTION: &str = "staff_locations";

pub struct AppState {
    pub config: Config,
    pub store: DocumentStore,
    pub encoder: Arc<dyn FaceEncoder>,
    pub places: PlaceResolver,
    pub scans: Arc<ScanRegistry>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/recognize", post(recognize))
        .route("/checkout", post(checkout))
        .route("/get-attendance", get(get_attendance))
        .route("/api/staff-live-locations", get(staff_live_locations))
        .route("/api/update-location", post(update_location))
        .route("/scan", get(launch_scan))
        .route("/scan-status/:scan_id", get(scan_status))
        .route("/clear-scan/:scan_id", get(clear_scan))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

/// JSON extractor whose rejection keeps the `{success: false, error}`
/// envelope instead of axum's plain-text body.
struct ApiJson<T>(T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::InvalidBody(rejection.body_text())),
        }
    }
}

/// Coordinates arrive as numbers or numeric strings; anything else reads
/// as absent so a malformed value never rejects the whole body.
fn lenient_coord<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.as_ref().and_then(coord_f64))
}

fn coord_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct RecognizeRequest {
    image: Option<String>,
    #[serde(default, deserialize_with = "lenient_coord")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coord")]
    longitude: Option<f64>,
    work_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_coord")]
    home_lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coord")]
    home_lng: Option<f64>,
}

/// The recognition pipeline: decode, encode, match, build records.
async fn recognize(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RecognizeRequest>,
) -> Result<Json<Value>, ApiError> {
    let image_b64 = req
        .image
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::NoImage)?;
    // Accept "data:image/png;base64,...." payloads.
    let image_b64 = image_b64
        .split_once(',')
        .map(|(_, rest)| rest)
        .unwrap_or(image_b64);
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image_b64)
        .map_err(|_| ApiError::InvalidImage)?;
    let image = image::load_from_memory(&bytes).map_err(|_| ApiError::InvalidImage)?;

    // The enrollment store is re-read every call so new enrollments take
    // effect without a restart.
    let raw = tokio::fs::read_to_string(&state.config.known_faces_path)
        .await
        .map_err(|_| ApiError::EnrollmentMissing)?;
    let known = KnownFaceSet::from_json_str(&raw)?;

    let encoder = Arc::clone(&state.encoder);
    let probes = tokio::task::spawn_blocking(move || encoder.encode(&image))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    if probes.is_empty() {
        return Err(ApiError::NoFaceDetected);
    }
    tracing::debug!(probes = probes.len(), enrolled = known.len(), "image encoded");

    let ctx = CheckInContext {
        capture: GeoPoint::from_parts(req.latitude, req.longitude),
        mode: WorkMode::parse(req.work_mode.as_deref()),
        home: GeoPoint::from_parts(req.home_lat, req.home_lng),
    };

    // One lookup per request, shared by every recognized face.
    let place = state.places.resolve(ctx.capture).await;
    let entries = pipeline::record_check_ins(
        &state.store,
        &state.config.attendance_collection,
        state.config.office,
        &known,
        &probes,
        state.config.match_tolerance,
        &ctx,
        &place,
        clock::org_now(),
    )
    .await;

    let Some(primary) = entries.first().cloned() else {
        return Err(ApiError::FaceNotRecognized);
    };
    Ok(Json(json!({
        "success": true,
        "name": primary.name,
        "userId": primary.user_id,
        "status": primary.status,
        "address": place,
        "timestamp": primary.timestamp,
        "recognized": entries,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest {
    user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_coord")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coord")]
    longitude: Option<f64>,
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = req
        .user_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::MissingField("Missing userId"))?;
    let point = GeoPoint::from_parts(req.latitude, req.longitude);

    let outcome = pipeline::checkout(
        &state.store,
        &state.config.attendance_collection,
        user_id,
        point,
        clock::org_now(),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Checked out successfully",
        "checkOut": outcome.check_out,
    })))
}

/// Debug listing of attendance records, newest first. Degrades to an
/// empty list on store failure so dashboards keep rendering.
async fn get_attendance(State(state): State<Arc<AppState>>) -> Json<Vec<Value>> {
    let mut docs = match state.store.list(&state.config.attendance_collection).await {
        Ok(docs) => docs,
        Err(e) => {
            tracing::error!(error = %e, "failed to list attendance");
            return Json(Vec::new());
        }
    };
    docs.sort_by_key(|(_, body)| std::cmp::Reverse(record_instant(body)));

    let records = docs
        .into_iter()
        .map(|(_, body)| {
            json!({
                "name": body.get("name").and_then(Value::as_str).unwrap_or("Unknown"),
                "timestamp": body.get("timestamp").and_then(Value::as_str).unwrap_or(""),
                "status": body.get("status").and_then(Value::as_str).unwrap_or("Unknown"),
                "latitude": body.pointer("/checkInLocation/latitude"),
                "longitude": body.pointer("/checkInLocation/longitude"),
                "address": body.get("address").and_then(Value::as_str).unwrap_or("N/A"),
                "userId": body.get("userId").and_then(Value::as_str).unwrap_or(""),
            })
        })
        .collect();
    Json(records)
}

fn record_instant(body: &Value) -> DateTime<Utc> {
    body.get("timestamp")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Live-location document layout; camelCase on the wire.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StaffLocation {
    name: String,
    latitude: f64,
    longitude: f64,
    last_updated: String,
    status: String,
}

async fn staff_live_locations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let docs = state.store.list(STAFF_LOCATIONS_COLLECTION).await?;
    let locations = docs
        .into_iter()
        .map(|(user_id, body)| {
            json!({
                "userId": user_id,
                "name": body.get("name").and_then(Value::as_str).unwrap_or("Unknown"),
                "latitude": body.get("latitude"),
                "longitude": body.get("longitude"),
                "lastUpdated": body.get("lastUpdated"),
                "status": body.get("status").and_then(Value::as_str).unwrap_or("Offline"),
            })
        })
        .collect();
    Ok(Json(locations))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateLocationRequest {
    user_id: Option<String>,
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<UpdateLocationRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(user_id), Some(name), Some(latitude), Some(longitude)) =
        (req.user_id, req.name, req.latitude, req.longitude)
    else {
        return Err(ApiError::MissingField("Missing required fields"));
    };

    let location = StaffLocation {
        name,
        latitude,
        longitude,
        last_updated: Utc::now().to_rfc3339(),
        status: "Active".to_string(),
    };
    state
        .store
        .merge_set(
            STAFF_LOCATIONS_COLLECTION,
            &user_id,
            serde_json::to_value(&location)?,
        )
        .await?;

    Ok(Json(json!({"success": true})))
}

async fn launch_scan(State(state): State<Arc<AppState>>) -> Json<Value> {
    let id = state.scans.launch();
    Json(json!({"scanId": id.to_string()}))
}

async fn scan_status(
    State(state): State<Arc<AppState>>,
    Path(scan_id): Path<String>,
) -> Json<Value> {
    // Unparseable ids get the unknown-id answer, same as expired ones.
    let status = Uuid::parse_str(&scan_id)
        .map(|id| state.scans.status(id))
        .unwrap_or(ScanStatus::Running);
    Json(match status {
        ScanStatus::Running => json!({"status": "running"}),
        ScanStatus::Completed => json!({"status": "completed"}),
        ScanStatus::Failed(error) => json!({"status": "failed", "error": error}),
    })
}

async fn clear_scan(State(state): State<Arc<AppState>>, Path(scan_id): Path<String>) -> Json<Value> {
    if let Ok(id) = Uuid::parse_str(&scan_id) {
        state.scans.clear(id);
    }
    Json(json!({"status": "cleared"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_coordinates_are_coerced() {
        let req: CheckoutRequest = serde_json::from_value(json!({
            "userId": "u1",
            "latitude": "3.205170",
            "longitude": 101.720107,
        }))
        .unwrap();
        assert_eq!(req.latitude, Some(3.205170));
        assert_eq!(req.longitude, Some(101.720107));
    }

    #[test]
    fn test_malformed_coordinates_read_as_absent() {
        // A junk coordinate never rejects the body; the checkout proceeds
        // with the location omitted.
        let req: CheckoutRequest = serde_json::from_value(json!({
            "userId": "u1",
            "latitude": "not-a-number",
            "longitude": true,
        }))
        .unwrap();
        assert_eq!(req.user_id.as_deref(), Some("u1"));
        assert!(req.latitude.is_none());
        assert!(req.longitude.is_none());
    }

    #[test]
    fn test_recognize_coordinates_are_equally_lenient() {
        let req: RecognizeRequest = serde_json::from_value(json!({
            "image": "zzz",
            "latitude": "3.10",
            "home_lat": [1.0],
            "home_lng": "101.60",
        }))
        .unwrap();
        assert_eq!(req.latitude, Some(3.10));
        assert!(req.longitude.is_none());
        assert!(req.home_lat.is_none());
        assert_eq!(req.home_lng, Some(101.60));
    }

    #[test]
    fn test_whitespace_padded_string_coordinate_parses() {
        assert_eq!(coord_f64(&json!(" 101.72 ")), Some(101.72));
        assert_eq!(coord_f64(&json!(null)), None);
    }
}
