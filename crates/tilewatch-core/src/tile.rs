// SPDX-License-Identifier: Apache-2.0

//! API Catalog tiles and the poll request that selects them.
//!
//! A tile is one API product shown by the catalog, grouping the services
//! registered under it. The poller never looks inside a tile; these types
//! exist so callers can render what the catalog returns.

use serde::{Deserialize, Serialize};

/// One API Catalog container ("tile").
///
/// Every field is optional and unknown fields are ignored, so any JSON
/// object the catalog sends is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tile {
    /// Container identifier (e.g. `apicatalog`).
    pub id: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Aggregated status (`UP`, `DOWN`, `WARNING`).
    pub status: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Container version.
    pub version: Option<String>,
    /// Services registered under this container, passed through untouched.
    pub services: Vec<serde_json::Value>,
    /// Number of services in the container.
    pub total_services: Option<u32>,
    /// Number of services currently up.
    pub active_services: Option<u32>,
    /// Last update time as sent by the catalog.
    pub last_updated_timestamp: Option<serde_json::Value>,
    /// Creation time as sent by the catalog.
    pub created_timestamp: Option<serde_json::Value>,
}

impl Tile {
    /// Number of services, preferring the catalog's own count.
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.total_services
            .map_or(self.services.len(), |n| n as usize)
    }
}

/// Decode a catalog payload into tiles.
///
/// Arrays decode element-wise, a lone object becomes a one-element list
/// and `null` becomes an empty list.
pub fn decode_tiles(payload: serde_json::Value) -> Result<Vec<Tile>, serde_json::Error> {
    match payload {
        serde_json::Value::Null => Ok(Vec::new()),
        value @ serde_json::Value::Array(_) => serde_json::from_value(value),
        value => Ok(vec![serde_json::from_value(value)?]),
    }
}

/// Which resource a polling session fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollRequest {
    /// Tile id, or `None` for every tile.
    pub resource_id: Option<String>,
}

impl PollRequest {
    /// Build a request, treating an empty id as "all tiles".
    #[must_use]
    pub fn new(resource_id: Option<&str>) -> Self {
        Self {
            resource_id: resource_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ToString::to_string),
        }
    }

    /// Request for every tile.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// True when no specific tile was asked for.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.resource_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_poll_request_empty_id_means_all() {
        assert!(PollRequest::new(Some("")).is_all());
        assert!(PollRequest::new(Some("   ")).is_all());
        assert!(PollRequest::new(None).is_all());
        assert_eq!(
            PollRequest::new(Some("apicatalog")).resource_id.as_deref(),
            Some("apicatalog")
        );
    }

    #[test]
    fn test_decode_tiles_array() {
        let payload = json!([
            {
                "id": "apicatalog",
                "title": "API Mediation Layer API",
                "status": "UP",
                "services": [{"serviceId": "apicatalog"}],
                "totalServices": 1,
                "activeServices": 1,
                "lastUpdatedTimestamp": "2024-05-01T10:00:00.000+0000",
                "somethingNew": true
            },
            {"id": "cademoapps"}
        ]);

        let tiles = decode_tiles(payload).expect("should decode");
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].id.as_deref(), Some("apicatalog"));
        assert_eq!(tiles[0].status.as_deref(), Some("UP"));
        assert_eq!(tiles[0].service_count(), 1);
        assert_eq!(tiles[1].title, None);
        assert!(tiles[1].services.is_empty());
    }

    #[test]
    fn test_decode_tiles_single_object() {
        let tiles = decode_tiles(json!({"id": "apicatalog"})).expect("should decode");
        assert_eq!(tiles.len(), 1);
    }

    #[test]
    fn test_decode_tiles_null_is_empty() {
        assert!(decode_tiles(serde_json::Value::Null).expect("should decode").is_empty());
    }

    #[test]
    fn test_decode_tiles_rejects_scalar() {
        assert!(decode_tiles(json!("not a tile")).is_err());
    }

    #[test]
    fn test_service_count_falls_back_to_list() {
        let tile = Tile {
            services: vec![json!({}), json!({})],
            ..Tile::default()
        };
        assert_eq!(tile.service_count(), 2);
    }
}
