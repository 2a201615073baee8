// Room catalog: the read side of the backend API

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::filters::CatalogQuery;
use crate::models::{IncompleteRecord, Room, RoomRecord};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    // Transport failure, timeout, non-success status or unreadable payload
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Incomplete room data: {0}")]
    IncompleteRoomData(#[from] IncompleteRecord),
}

#[async_trait]
pub trait RoomCatalog: Send + Sync + 'static {
    // Rooms matching the query; an empty list is a successful "no match"
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<Room>, CatalogError>;

    // A single bookable room, with its hotel resolved
    async fn get_by_id(&self, room_id: &str) -> Result<Room, CatalogError>;
}

/// Converts a search payload into rooms. Records that cannot be booked are
/// dropped from the listing with a warning rather than failing the search.
pub fn rooms_from_records(records: Vec<RoomRecord>) -> Vec<Room> {
    let mut hotels = HashMap::new();
    let mut rooms = Vec::with_capacity(records.len());

    for record in records {
        match Room::from_record(record, &mut hotels) {
            Ok(room) => rooms.push(room),
            Err(err) => warn!(error = %err, "skipping incomplete room record"),
        }
    }

    rooms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_backend::{sample_room, MockBackend};
    use std::sync::Arc;

    #[test]
    fn test_rooms_from_records_skips_incomplete() {
        let records: Vec<RoomRecord> = serde_json::from_str(
            r#"[
                {"_id": "r1", "roomType": "Deluxe Room", "pricePerNight": "9,000",
                 "hotel": {"_id": "h1", "name": "Villa Azul", "city": "Goa"}},
                {"_id": "r2", "roomType": "Family Room", "pricePerNight": "6,000",
                 "hotel": "h1"},
                {"_id": "r3", "roomType": "Premium Suite", "pricePerNight": 15000,
                 "hotel": {"_id": "h1", "name": "Villa Azul", "city": "Goa"}}
            ]"#,
        )
        .unwrap();

        let rooms = rooms_from_records(records);
        let ids: Vec<&str> = rooms.iter().map(|room| room.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r3"]);
        assert!(Arc::ptr_eq(&rooms[0].hotel, &rooms[1].hotel));
    }

    #[test]
    fn test_empty_payload_is_empty_listing() {
        assert!(rooms_from_records(Vec::new()).is_empty());
    }

    #[test]
    fn test_catalog_behind_trait_object() {
        let backend = MockBackend::new();
        backend.add_room(sample_room("r1", "Deluxe Room", "9,000"));
        let catalog: Arc<dyn RoomCatalog> = Arc::new(backend);

        let rooms = tokio_test::block_on(catalog.search(&CatalogQuery::default())).unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(
            tokio_test::block_on(catalog.get_by_id("missing")),
            Err(CatalogError::RoomNotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_incomplete_record_converts() {
        let err: CatalogError = IncompleteRecord::MissingRoomId.into();
        assert_eq!(
            err.to_string(),
            "Incomplete room data: room record has no identifier"
        );
    }
}
