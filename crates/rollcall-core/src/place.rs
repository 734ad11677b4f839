//! Place-label selection from a reverse-geocode address payload.
//!
//! An ordered fallback pipeline over OpenStreetMap POI tags picks the most
//! specific human-readable label. The precedence order is load-bearing:
//! relabeling a point must be reproducible across requests.

use serde::Deserialize;

/// Sentinel labels. Geocoding never fails a request; it degrades to one
/// of these strings instead.
pub const LOCATION_NOT_PROVIDED: &str = "Location not provided";
pub const LOCATION_NOT_IDENTIFIED: &str = "Location not identified";
pub const UNKNOWN_LOCATION: &str = "Unknown location";
pub const GEOCODING_FAILED: &str = "Geocoding failed";

/// Structured address fields from the provider (`addressdetails=1`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressDetails {
    pub building: Option<String>,
    pub amenity: Option<String>,
    pub shop: Option<String>,
    pub leisure: Option<String>,
    pub tourism: Option<String>,
    pub public_building: Option<String>,
    pub university: Option<String>,
    pub school: Option<String>,
    pub house_number: Option<String>,
    pub road: Option<String>,
}

/// A reverse-geocode response. A payload carrying `error` (or nothing at
/// all) means the provider had no result for the point.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReverseGeocodePayload {
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: AddressDetails,
    pub error: Option<String>,
}

/// POI tags in priority order; the first non-empty one names the place.
const POI_TAGS: [fn(&AddressDetails) -> Option<&String>; 8] = [
    |a| a.building.as_ref(),
    |a| a.amenity.as_ref(),
    |a| a.shop.as_ref(),
    |a| a.leisure.as_ref(),
    |a| a.tourism.as_ref(),
    |a| a.public_building.as_ref(),
    |a| a.university.as_ref(),
    |a| a.school.as_ref(),
];

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Select the best label from a payload: POI tags first, then a
/// synthesized "house_number road" street line, then the provider's full
/// formatted address, then the not-identified sentinel.
pub fn place_label(payload: &ReverseGeocodePayload) -> String {
    let addr = &payload.address;

    for tag in POI_TAGS {
        if let Some(label) = tag(addr).map(String::as_str).and_then(non_empty) {
            return label.to_string();
        }
    }

    let street = format!(
        "{} {}",
        addr.house_number.as_deref().unwrap_or(""),
        addr.road.as_deref().unwrap_or("")
    );
    if let Some(street) = non_empty(&street) {
        return street.to_string();
    }

    if let Some(full) = payload.display_name.as_deref().and_then(non_empty) {
        return full.to_string();
    }

    LOCATION_NOT_IDENTIFIED.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> ReverseGeocodePayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_building_wins_over_everything() {
        let p = payload(
            r#"{
                "display_name": "200, Jalan Genting Kelang, Setapak, Kuala Lumpur",
                "address": {
                    "building": "Setapak Central Mall",
                    "amenity": "Food Court",
                    "shop": "Convenience Store",
                    "road": "Jalan Genting Kelang",
                    "house_number": "200"
                }
            }"#,
        );
        assert_eq!(place_label(&p), "Setapak Central Mall");
    }

    #[test]
    fn test_amenity_beats_shop() {
        let p = payload(r#"{"address": {"amenity": "Library", "shop": "Bookstore"}}"#);
        assert_eq!(place_label(&p), "Library");
    }

    #[test]
    fn test_street_line_synthesis() {
        let p = payload(r#"{"address": {"house_number": "12", "road": "Jalan Ampang"}}"#);
        assert_eq!(place_label(&p), "12 Jalan Ampang");
    }

    #[test]
    fn test_road_without_house_number_is_trimmed() {
        let p = payload(r#"{"address": {"road": "Jalan Ampang"}}"#);
        assert_eq!(place_label(&p), "Jalan Ampang");
    }

    #[test]
    fn test_display_name_fallback() {
        let p = payload(r#"{"display_name": "Setapak, Kuala Lumpur, Malaysia", "address": {}}"#);
        assert_eq!(place_label(&p), "Setapak, Kuala Lumpur, Malaysia");
    }

    #[test]
    fn test_nothing_present_is_not_identified() {
        let p = payload(r#"{"address": {}}"#);
        assert_eq!(place_label(&p), LOCATION_NOT_IDENTIFIED);
    }

    #[test]
    fn test_blank_tags_are_skipped() {
        let p = payload(r#"{"address": {"building": "  ", "school": "TARUMT"}}"#);
        assert_eq!(place_label(&p), "TARUMT");
    }
}
