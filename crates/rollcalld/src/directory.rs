//! Identity resolution: recognized label → directory record.
//!
//! The enrollment label is the directory's firstName field. No match (or
//! any lookup failure) degrades to an audit identity instead of failing
//! the pipeline, so unregistered-but-recognized faces still produce an
//! attendance entry.

use crate::store::DocumentStore;
use rollcall_core::{GeoPoint, Identity};
use serde::Deserialize;

const USERS_COLLECTION: &str = "users";

/// Directory document layout for a user.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserRecord {
    first_name: String,
    last_name: String,
    home_location: Option<HomeLocation>,
}

#[derive(Debug, Default, Deserialize)]
struct HomeLocation {
    lat: Option<f64>,
    lng: Option<f64>,
}

/// Look up exactly one directory record whose firstName equals the label
/// (case-sensitive, trimmed). First hit wins.
pub async fn resolve_identity(store: &DocumentStore, label: &str) -> Identity {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Identity::degraded(label);
    }

    let hits = match store.query_eq(USERS_COLLECTION, "firstName", trimmed).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(error = %e, label = trimmed, "directory lookup failed");
            return Identity::degraded(trimmed);
        }
    };

    let Some((user_id, body)) = hits.into_iter().next() else {
        tracing::warn!(label = trimmed, "no directory record; saving with empty userId");
        return Identity::degraded(trimmed);
    };

    let user: UserRecord = match serde_json::from_value(body) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, user_id, "malformed directory record");
            return Identity::degraded(trimmed);
        }
    };

    let first_name = if user.first_name.is_empty() {
        trimmed.to_string()
    } else {
        user.first_name
    };
    let last_name = user.last_name.trim().to_string();
    let full_name = format!("{first_name} {last_name}").trim().to_string();
    let home = user
        .home_location
        .and_then(|h| GeoPoint::from_parts(h.lat, h.lng));

    tracing::debug!(user_id, name = %full_name, "directory record resolved");
    Identity {
        user_id,
        first_name,
        last_name,
        full_name,
        home,
    }
}
