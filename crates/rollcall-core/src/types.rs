use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in degrees. Both coordinates travel together;
/// a point with only one of them is represented as no point at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point only when both coordinates are present.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// Work mode declared by the caller at check-in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkMode {
    /// Work-from-office ("wfo") — geofenced against the office coordinates.
    Office,
    /// Work-from-home ("wfh") — geofenced against the user's home coordinates.
    Home,
}

impl WorkMode {
    /// Parse the wire form. Unknown or absent modes map to `None` and the
    /// classifier falls back to the office-labeled thresholds.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some("wfo") => Some(Self::Office),
            Some("wfh") => Some(Self::Home),
            _ => None,
        }
    }

    /// Display form stored in the record's `locationType` field.
    pub fn location_type(mode: Option<Self>) -> &'static str {
        match mode {
            Some(Self::Office) => "Office",
            Some(Self::Home) => "Home",
            None => "",
        }
    }
}

/// A directory record resolved from a recognized face label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Directory document id. Empty for a degraded identity.
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    /// Home coordinates for WFH geofencing, when the directory has them.
    pub home: Option<GeoPoint>,
}

impl Identity {
    /// Fallback identity for a recognized face with no directory record:
    /// the attendance entry is still written for audit purposes.
    pub fn degraded(label: &str) -> Self {
        Self {
            user_id: String::new(),
            first_name: label.to_string(),
            last_name: String::new(),
            full_name: label.to_string(),
            home: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_requires_both_coordinates() {
        assert!(GeoPoint::from_parts(Some(3.2), None).is_none());
        assert!(GeoPoint::from_parts(None, Some(101.7)).is_none());
        assert!(GeoPoint::from_parts(None, None).is_none());
        let p = GeoPoint::from_parts(Some(3.2), Some(101.7)).unwrap();
        assert_eq!(p.latitude, 3.2);
        assert_eq!(p.longitude, 101.7);
    }

    #[test]
    fn test_work_mode_parse() {
        assert_eq!(WorkMode::parse(Some("wfo")), Some(WorkMode::Office));
        assert_eq!(WorkMode::parse(Some("wfh")), Some(WorkMode::Home));
        assert_eq!(WorkMode::parse(Some("hybrid")), None);
        assert_eq!(WorkMode::parse(None), None);
    }

    #[test]
    fn test_location_type_display() {
        assert_eq!(WorkMode::location_type(Some(WorkMode::Office)), "Office");
        assert_eq!(WorkMode::location_type(Some(WorkMode::Home)), "Home");
        assert_eq!(WorkMode::location_type(None), "");
    }

    #[test]
    fn test_degraded_identity_keeps_raw_label() {
        let id = Identity::degraded("Syed Omar");
        assert_eq!(id.user_id, "");
        assert_eq!(id.full_name, "Syed Omar");
        assert!(id.home.is_none());
    }
}
