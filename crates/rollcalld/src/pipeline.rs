//! The attendance pipeline: record builder for check-ins and the
//! checkout resolver.

use crate::directory;
use crate::error::ApiError;
use crate::store::DocumentStore;
use chrono::{DateTime, FixedOffset, Utc};
use rollcall_core::record::{
    day_key, AttendanceRecord, CheckoutPatch, LOCATION_UNAVAILABLE, STATUS_CHECKED_IN,
    STATUS_CHECKED_OUT,
};
use rollcall_core::{clock, geo, Embedding, GeoPoint, KnownFaceSet, WorkMode};
use serde::Serialize;
use serde_json::Value;

/// Caller-supplied context for one recognition request.
#[derive(Debug, Clone, Copy)]
pub struct CheckInContext {
    /// Where the image was captured, if the caller shared coordinates.
    pub capture: Option<GeoPoint>,
    pub mode: Option<WorkMode>,
    /// Home coordinates sent by the front end for WFH geofencing.
    pub home: Option<GeoPoint>,
}

/// One recognized face's response entry; camelCase on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedEntry {
    pub name: String,
    pub user_id: String,
    pub status: String,
    pub address: String,
    pub timestamp: String,
    pub doc_id: String,
    pub distance: f32,
}

/// Build and persist one attendance record per accepted probe.
///
/// Probes beyond the match tolerance are skipped. Per-face persistence
/// failures are logged and do not abort the rest of the batch.
#[allow(clippy::too_many_arguments)]
pub async fn record_check_ins(
    store: &DocumentStore,
    collection: &str,
    office: GeoPoint,
    known: &KnownFaceSet,
    probes: &[Embedding],
    tolerance: f32,
    ctx: &CheckInContext,
    place: &str,
    now: DateTime<FixedOffset>,
) -> Vec<RecognizedEntry> {
    let check_in_time = clock::clock_12h_lower(now);
    let display_time = clock::clock_12h(now);
    let time_status = clock::time_status(now);
    let date_iso = clock::date_iso(now);
    let date_display = clock::date_display(now);
    let timestamp = now.to_rfc3339();

    let mut entries = Vec::new();
    for probe in probes {
        let Some(matched) = known.match_within(probe, tolerance) else {
            continue;
        };
        tracing::info!(
            name = %matched.name,
            distance = matched.distance,
            "face recognized"
        );

        let identity = directory::resolve_identity(store, &matched.name).await;

        let (distance_m, location_status) = match ctx.capture {
            Some(capture) => {
                // WFH is geofenced against home when the caller sent home
                // coordinates; otherwise everything anchors on the office.
                let anchor = match (ctx.mode, ctx.home) {
                    (Some(WorkMode::Home), Some(home)) => home,
                    _ => office,
                };
                let d = geo::haversine_m(anchor, capture);
                (Some(d), geo::location_status(d, ctx.mode).to_string())
            }
            None => (None, LOCATION_UNAVAILABLE.to_string()),
        };

        let doc_id = day_key(&identity.first_name, &date_iso);
        let record = AttendanceRecord {
            check_in: check_in_time.clone(),
            check_in_distance: distance_m.map(|d| format!("{d:.1}")).unwrap_or_default(),
            check_in_location: ctx.capture,
            check_in_status: location_status,
            check_in_time_status: time_status.to_string(),
            check_out: None,
            check_out_location: None,
            check_out_status: None,
            check_out_time_status: None,
            date: date_display.clone(),
            last_updated: timestamp.clone(),
            location_type: WorkMode::location_type(ctx.mode).to_string(),
            name: identity.full_name.clone(),
            status: STATUS_CHECKED_IN.to_string(),
            time: display_time.clone(),
            user_id: identity.user_id.clone(),
            user_name: identity.full_name.clone(),
            timestamp: timestamp.clone(),
            address: place.to_string(),
        };

        match serde_json::to_value(&record) {
            Ok(patch) => match store.merge_set(collection, &doc_id, patch).await {
                Ok(()) => {
                    tracing::info!(doc_id, name = %identity.full_name, "attendance saved");
                }
                Err(e) => {
                    tracing::error!(error = %e, doc_id, "failed to save attendance");
                }
            },
            Err(e) => {
                tracing::error!(error = %e, doc_id, "failed to serialize attendance");
            }
        }

        entries.push(RecognizedEntry {
            name: identity.full_name,
            user_id: identity.user_id,
            status: STATUS_CHECKED_IN.to_string(),
            address: place.to_string(),
            timestamp: clock::datetime_display(now),
            doc_id,
            distance: matched.distance,
        });
    }
    entries
}

#[derive(Debug)]
pub struct CheckoutOutcome {
    pub check_out: String,
}

/// Close today's open record for a user: find the most recently updated
/// record dated today and merge the checkout fields onto it. Never
/// creates a record.
pub async fn checkout(
    store: &DocumentStore,
    collection: &str,
    user_id: &str,
    point: Option<GeoPoint>,
    now: DateTime<FixedOffset>,
) -> Result<CheckoutOutcome, ApiError> {
    let candidates = store.query_eq(collection, "userId", user_id).await?;
    if candidates.is_empty() {
        return Err(ApiError::RecordNotFound(
            "No check-in record found to check out from.",
        ));
    }

    let today = clock::date_display(now);
    let target = candidates
        .into_iter()
        .filter(|(_, body)| body.get("date").and_then(Value::as_str) == Some(today.as_str()))
        .max_by_key(|(_, body)| last_update_instant(body));
    let Some((doc_id, _)) = target else {
        return Err(ApiError::RecordNotFound(
            "No check-in record found for today.",
        ));
    };

    let check_out = clock::clock_12h_lower(now);
    let patch = CheckoutPatch {
        check_out: check_out.clone(),
        last_updated: now.to_rfc3339(),
        status: STATUS_CHECKED_OUT.to_string(),
        check_out_location: point,
    };
    store
        .update(collection, &doc_id, serde_json::to_value(&patch)?)
        .await?;
    tracing::info!(user_id, doc_id, "checkout recorded");

    Ok(CheckoutOutcome { check_out })
}

/// Ordering instant for checkout candidates: lastUpdated, else the
/// timestamp string, else the minimum representable instant.
fn last_update_instant(body: &Value) -> DateTime<Utc> {
    for field in ["lastUpdated", "timestamp"] {
        if let Some(raw) = body.get(field).and_then(Value::as_str) {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return parsed.with_timezone(&Utc);
            }
        }
    }
    DateTime::<Utc>::MIN_UTC
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const OFFICE: GeoPoint = GeoPoint {
        latitude: 3.205170,
        longitude: 101.720107,
    };

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        clock::org_offset()
            .with_ymd_and_hms(2025, 11, 24, h, m, 0)
            .unwrap()
    }

    fn known() -> KnownFaceSet {
        KnownFaceSet::from_parallel(
            vec!["Alice".into()],
            vec![Embedding::new(vec![0.0, 0.0])],
        )
        .unwrap()
    }

    fn ctx_at_office() -> CheckInContext {
        CheckInContext {
            capture: Some(OFFICE),
            mode: Some(WorkMode::Office),
            home: None,
        }
    }

    async fn check_in_alice(store: &DocumentStore, now: DateTime<FixedOffset>) -> RecognizedEntry {
        let probes = vec![Embedding::new(vec![0.0, 0.0])];
        let mut entries = record_check_ins(
            store,
            "attendance",
            OFFICE,
            &known(),
            &probes,
            0.45,
            &ctx_at_office(),
            "Setapak Central Mall",
            now,
        )
        .await;
        assert_eq!(entries.len(), 1);
        entries.remove(0)
    }

    #[tokio::test]
    async fn test_check_in_at_office_is_at_office_and_on_time() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let entry = check_in_alice(&store, at(9, 0)).await;

        assert_eq!(entry.doc_id, "Alice_2025-11-24");
        let doc = store.get("attendance", &entry.doc_id).await.unwrap().unwrap();
        assert_eq!(doc["checkInStatus"], "At Office");
        assert_eq!(doc["checkInTimeStatus"], "On Time");
        assert_eq!(doc["checkInDistance"], "0.0");
        assert_eq!(doc["locationType"], "Office");
        assert_eq!(doc["status"], STATUS_CHECKED_IN);
        assert_eq!(doc["date"], "24/11/2025");
        assert_eq!(doc["address"], "Setapak Central Mall");
    }

    #[tokio::test]
    async fn test_duplicate_check_in_collapses_onto_one_record() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let first = check_in_alice(&store, at(9, 0)).await;
        let second = check_in_alice(&store, at(9, 5)).await;

        assert_eq!(first.doc_id, second.doc_id);
        assert_eq!(store.list("attendance").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_check_in_preserves_intervening_checkout() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        check_in_alice(&store, at(9, 0)).await;
        checkout(&store, "attendance", "", None, at(12, 0))
            .await
            .unwrap();

        check_in_alice(&store, at(12, 5)).await;

        let doc = store
            .get("attendance", "Alice_2025-11-24")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["checkOut"], "12:00 pm");
    }

    #[tokio::test]
    async fn test_unmatched_probe_is_skipped() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let probes = vec![Embedding::new(vec![5.0, 5.0])];
        let entries = record_check_ins(
            &store,
            "attendance",
            OFFICE,
            &known(),
            &probes,
            0.45,
            &ctx_at_office(),
            "",
            at(9, 0),
        )
        .await;
        assert!(entries.is_empty());
        assert!(store.list("attendance").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registered_user_gets_directory_identity() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        store
            .merge_set(
                "users",
                "u42",
                json!({"firstName": "Alice", "lastName": "Tan"}),
            )
            .await
            .unwrap();

        let entry = check_in_alice(&store, at(9, 0)).await;
        assert_eq!(entry.user_id, "u42");
        assert_eq!(entry.name, "Alice Tan");

        let doc = store.get("attendance", &entry.doc_id).await.unwrap().unwrap();
        assert_eq!(doc["userId"], "u42");
        assert_eq!(doc["userName"], "Alice Tan");
    }

    #[tokio::test]
    async fn test_wfh_anchors_on_home_coordinates() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let home = GeoPoint {
            latitude: 3.10,
            longitude: 101.60,
        };
        let probes = vec![Embedding::new(vec![0.0, 0.0])];
        let ctx = CheckInContext {
            capture: Some(home),
            mode: Some(WorkMode::Home),
            home: Some(home),
        };
        let entries = record_check_ins(
            &store,
            "attendance",
            OFFICE,
            &known(),
            &probes,
            0.45,
            &ctx,
            "",
            at(9, 0),
        )
        .await;

        let doc = store
            .get("attendance", &entries[0].doc_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["checkInStatus"], "At Home");
        assert_eq!(doc["locationType"], "Home");
    }

    #[tokio::test]
    async fn test_wfh_without_home_falls_back_to_office() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let probes = vec![Embedding::new(vec![0.0, 0.0])];
        let ctx = CheckInContext {
            capture: Some(OFFICE),
            mode: Some(WorkMode::Home),
            home: None,
        };
        let entries = record_check_ins(
            &store,
            "attendance",
            OFFICE,
            &known(),
            &probes,
            0.45,
            &ctx,
            "",
            at(9, 0),
        )
        .await;

        let doc = store
            .get("attendance", &entries[0].doc_id)
            .await
            .unwrap()
            .unwrap();
        // Capture is at the office, anchored on the office, labeled for home mode.
        assert_eq!(doc["checkInStatus"], "At Home");
        assert_eq!(doc["checkInDistance"], "0.0");
    }

    #[tokio::test]
    async fn test_no_capture_coordinates_is_location_unavailable() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let probes = vec![Embedding::new(vec![0.0, 0.0])];
        let ctx = CheckInContext {
            capture: None,
            mode: None,
            home: None,
        };
        let entries = record_check_ins(
            &store,
            "attendance",
            OFFICE,
            &known(),
            &probes,
            0.45,
            &ctx,
            "Location not provided",
            at(9, 0),
        )
        .await;

        let doc = store
            .get("attendance", &entries[0].doc_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["checkInStatus"], LOCATION_UNAVAILABLE);
        assert_eq!(doc["checkInDistance"], "");
        assert!(doc.get("checkInLocation").is_none());
    }

    #[tokio::test]
    async fn test_checkout_without_any_record_is_not_found() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        let err = checkout(&store, "attendance", "u1", None, at(17, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_checkout_with_only_stale_records_is_not_found() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        store
            .merge_set(
                "attendance",
                "Alice_2025-11-23",
                json!({"userId": "u1", "date": "23/11/2025"}),
            )
            .await
            .unwrap();

        let err = checkout(&store, "attendance", "u1", None, at(17, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_checkout_updates_todays_record_in_place() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        check_in_alice(&store, at(9, 0)).await;

        let outcome = checkout(
            &store,
            "attendance",
            "",
            Some(OFFICE),
            at(17, 32),
        )
        .await
        .unwrap();
        assert_eq!(outcome.check_out, "05:32 pm");

        let doc = store
            .get("attendance", "Alice_2025-11-24")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["checkOut"], "05:32 pm");
        assert_eq!(doc["status"], STATUS_CHECKED_OUT);
        assert_eq!(doc["checkOutLocation"]["latitude"], OFFICE.latitude);
        // Check-in fields survive the merge.
        assert_eq!(doc["checkIn"], "09:00 am");
        assert_eq!(store.list("attendance").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_checkout_reuses_the_same_record() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        check_in_alice(&store, at(9, 0)).await;

        checkout(&store, "attendance", "", None, at(17, 0))
            .await
            .unwrap();
        checkout(&store, "attendance", "", None, at(18, 15))
            .await
            .unwrap();

        let docs = store.list("attendance").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].1["checkOut"], "06:15 pm");
    }

    #[tokio::test]
    async fn test_checkout_picks_most_recently_updated_candidate() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        store
            .merge_set(
                "attendance",
                "older",
                json!({
                    "userId": "u1",
                    "date": "24/11/2025",
                    "lastUpdated": "2025-11-24T08:00:00+08:00"
                }),
            )
            .await
            .unwrap();
        store
            .merge_set(
                "attendance",
                "newer",
                json!({
                    "userId": "u1",
                    "date": "24/11/2025",
                    "lastUpdated": "2025-11-24T11:00:00+08:00"
                }),
            )
            .await
            .unwrap();

        checkout(&store, "attendance", "u1", None, at(17, 0))
            .await
            .unwrap();

        let newer = store.get("attendance", "newer").await.unwrap().unwrap();
        let older = store.get("attendance", "older").await.unwrap().unwrap();
        assert_eq!(newer["status"], STATUS_CHECKED_OUT);
        assert!(older.get("status").is_none());
    }

    #[tokio::test]
    async fn test_unparseable_timestamps_sort_last() {
        let store = DocumentStore::open_in_memory().await.unwrap();
        store
            .merge_set(
                "attendance",
                "garbled",
                json!({"userId": "u1", "date": "24/11/2025", "lastUpdated": "yesterday-ish"}),
            )
            .await
            .unwrap();
        store
            .merge_set(
                "attendance",
                "sound",
                json!({
                    "userId": "u1",
                    "date": "24/11/2025",
                    "timestamp": "2025-11-24T09:00:00+08:00"
                }),
            )
            .await
            .unwrap();

        checkout(&store, "attendance", "u1", None, at(17, 0))
            .await
            .unwrap();

        let sound = store.get("attendance", "sound").await.unwrap().unwrap();
        assert_eq!(sound["status"], STATUS_CHECKED_OUT);
    }
}
