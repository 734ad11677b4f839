//! Persisted attendance record schema and day-key synthesis.
//!
//! Field names are camelCase on the wire to stay compatible with the
//! existing store. A check-in write never lists the checkOut* fields,
//! so merge-writes preserve an intervening checkout on the same day-key.

use crate::types::GeoPoint;
use serde::{Deserialize, Serialize};

/// Lifecycle tags.
pub const STATUS_CHECKED_IN: &str = "Check In";
pub const STATUS_CHECKED_OUT: &str = "Checked out";

/// Status used when the caller supplied no capture coordinates.
pub const LOCATION_UNAVAILABLE: &str = "Location unavailable";

/// Deterministic document id for one person's day, e.g.
/// "Syed Omar_2025-11-24". Repeated check-ins the same day collapse
/// onto this one logical record.
pub fn day_key(first_name: &str, date_iso: &str) -> String {
    format!("{first_name}_{date_iso}")
}

/// The attendance document. `Option` fields are omitted from writes when
/// absent; deserializing an older or partial document fills defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceRecord {
    pub check_in: String,
    /// Geofence distance in meters, rounded to one decimal; empty when
    /// no capture coordinates were supplied.
    pub check_in_distance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_location: Option<GeoPoint>,
    pub check_in_status: String,
    pub check_in_time_status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_time_status: Option<String>,

    /// Display date, DD/MM/YYYY.
    pub date: String,
    /// ISO-8601 at the organization offset; the checkout resolver orders
    /// candidates by this field.
    pub last_updated: String,
    /// "Office" / "Home" / "" from the declared work mode.
    pub location_type: String,
    pub name: String,
    pub status: String,
    /// Display time, 12-hour uppercase.
    pub time: String,
    pub user_id: String,
    pub user_name: String,
    /// ISO-8601, kept for sorting in debug listings.
    pub timestamp: String,
    /// Best-effort place label from the reverse geocoder.
    pub address: String,
}

/// The fields a checkout touches; everything else on the record is left
/// as written by check-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPatch {
    pub check_out: String,
    pub last_updated: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_location: Option<GeoPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_key_is_deterministic() {
        assert_eq!(day_key("Syed Omar", "2025-11-24"), "Syed Omar_2025-11-24");
        assert_eq!(
            day_key("Syed Omar", "2025-11-24"),
            day_key("Syed Omar", "2025-11-24")
        );
    }

    #[test]
    fn test_check_in_write_omits_checkout_fields() {
        let record = AttendanceRecord {
            check_in: "09:56 am".into(),
            status: STATUS_CHECKED_IN.into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("checkOut"));
        assert!(!obj.contains_key("checkOutLocation"));
        assert!(!obj.contains_key("checkOutStatus"));
        assert!(obj.contains_key("checkIn"));
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let record = AttendanceRecord {
            user_id: "u1".into(),
            check_in_time_status: "On Time".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["checkInTimeStatus"], "On Time");
    }

    #[test]
    fn test_partial_document_deserializes_with_defaults() {
        let record: AttendanceRecord =
            serde_json::from_str(r#"{"checkOut": "05:32 pm", "status": "Checked out"}"#).unwrap();
        assert_eq!(record.check_out.as_deref(), Some("05:32 pm"));
        assert_eq!(record.status, STATUS_CHECKED_OUT);
        assert_eq!(record.check_in, "");
        assert!(record.check_in_location.is_none());
    }

    #[test]
    fn test_checkout_patch_omits_location_when_absent() {
        let patch = CheckoutPatch {
            check_out: "05:32 pm".into(),
            last_updated: "2025-11-24T17:32:00+08:00".into(),
            status: STATUS_CHECKED_OUT.into(),
            check_out_location: None,
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert!(!json.as_object().unwrap().contains_key("checkOutLocation"));
    }
}
