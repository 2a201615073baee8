// Rooms, hotels and identities: wire records from the backend and the
// validated shapes the rest of the crate works with

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::{parse_nightly_price, PricingError};

// Records that cannot be turned into a bookable room
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IncompleteRecord {
    #[error("room record has no identifier")]
    MissingRoomId,

    #[error("room {room_id} has no hotel information")]
    MissingHotel { room_id: String },

    #[error("room {room_id} references a hotel without an identifier")]
    MissingHotelId { room_id: String },
}

// Data structures for the rooms endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub room_type: String,
    #[serde(default)]
    pub price_per_night: Option<WirePrice>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub hotel: Option<HotelRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// The backend sends `pricePerNight` either as a grouped label or as a number
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WirePrice {
    Label(String),
    Number(serde_json::Number),
}

impl WirePrice {
    pub fn into_label(self) -> String {
        match self {
            WirePrice::Label(label) => label,
            WirePrice::Number(number) => number.to_string(),
        }
    }
}

// A hotel reference is either populated or a bare id
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HotelRef {
    Embedded(HotelRecord),
    Id(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HotelRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: String,
    pub room_type: String,
    // Raw label as sent by the backend, e.g. "10,000"
    pub price_per_night: String,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub hotel: Arc<Hotel>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Room {
    pub fn hotel_id(&self) -> &str {
        &self.hotel.id
    }

    pub fn nightly_rate(&self) -> Result<Decimal, PricingError> {
        parse_nightly_price(&self.price_per_night)
    }

    // Amenities with upstream duplicates removed, first occurrence wins
    pub fn unique_amenities(&self) -> Vec<&str> {
        let mut seen = Vec::with_capacity(self.amenities.len());
        for amenity in &self.amenities {
            if !seen.contains(&amenity.as_str()) {
                seen.push(amenity.as_str());
            }
        }
        seen
    }

    // Short amenity list shown on listing cards
    pub fn preview_amenities(&self, limit: usize) -> Vec<&str> {
        self.unique_amenities().into_iter().take(limit).collect()
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Validates a wire record. Hotels are interned through `hotels` so that
    /// rooms of the same hotel share one [`Hotel`].
    pub fn from_record(
        record: RoomRecord,
        hotels: &mut HashMap<String, Arc<Hotel>>,
    ) -> Result<Self, IncompleteRecord> {
        let id = record
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(IncompleteRecord::MissingRoomId)?;

        let hotel = match record.hotel {
            Some(HotelRef::Embedded(hotel)) => hotel,
            Some(HotelRef::Id(_)) | None => {
                return Err(IncompleteRecord::MissingHotel { room_id: id });
            }
        };
        let hotel_id = match hotel.id.as_deref().map(str::trim) {
            Some(hotel_id) if !hotel_id.is_empty() => hotel_id.to_string(),
            _ => return Err(IncompleteRecord::MissingHotelId { room_id: id }),
        };

        let hotel = hotels
            .entry(hotel_id.clone())
            .or_insert_with(|| {
                Arc::new(Hotel {
                    id: hotel_id,
                    name: hotel.name,
                    address: hotel.address,
                    city: hotel.city,
                    contact: hotel.contact,
                })
            })
            .clone();

        Ok(Room {
            id,
            room_type: record.room_type,
            price_per_night: record
                .price_per_night
                .map(WirePrice::into_label)
                .unwrap_or_default(),
            amenities: record.amenities,
            images: record.images,
            hotel,
            created_at: record.created_at,
        })
    }
}

impl TryFrom<RoomRecord> for Room {
    type Error = IncompleteRecord;

    fn try_from(record: RoomRecord) -> Result<Self, Self::Error> {
        Room::from_record(record, &mut HashMap::new())
    }
}

// The signed-in user, as supplied by the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(alias = "_id", alias = "id")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Identity {
    // "First Last", or "Guest" when no first name is known
    pub fn display_name(&self) -> String {
        match self.first_name.as_deref().map(str::trim) {
            Some(first) if !first.is_empty() => {
                let last = self.last_name.as_deref().unwrap_or_default();
                format!("{first} {last}").trim().to_string()
            }
            _ => "Guest".to_string(),
        }
    }
}

// Identity plus the bearer token used for authenticated calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub identity: Identity,
    pub token: String,
}
