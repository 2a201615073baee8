// In-process stand-in for the storefront backend, used by the unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::booking::{BookingApi, BookingApiError, BookingConfirmation, BookingRequest};
use crate::catalog::{CatalogError, RoomCatalog};
use crate::filters::CatalogQuery;
use crate::models::{Hotel, Room};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    Normal,
    CompleteOutage,
}

pub fn sample_hotel() -> Arc<Hotel> {
    Arc::new(Hotel {
        id: "hotel-1".to_string(),
        name: "Villa Serena".to_string(),
        address: "12 Beach Road".to_string(),
        city: "Goa".to_string(),
        contact: "+91 98765 43210".to_string(),
    })
}

pub fn sample_room(id: &str, room_type: &str, price: &str) -> Room {
    Room {
        id: id.to_string(),
        room_type: room_type.to_string(),
        price_per_night: price.to_string(),
        amenities: vec!["Free WiFi".to_string(), "Room Service".to_string()],
        images: vec![format!("{id}.png")],
        hotel: sample_hotel(),
        created_at: None,
    }
}

pub struct MockBackend {
    outage: AtomicBool,
    rooms: Mutex<Vec<Room>>,
    search_delays: Mutex<VecDeque<Duration>>,
    search_count: AtomicUsize,
    lookup_count: AtomicUsize,
    booking_count: AtomicUsize,
    search_queries: Mutex<Vec<CatalogQuery>>,
    booking_rejection: Mutex<Option<(u16, String)>>,
    booking_delay: Mutex<Duration>,
    booking_requests: Mutex<Vec<(BookingRequest, String)>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            outage: AtomicBool::new(false),
            rooms: Mutex::new(Vec::new()),
            search_delays: Mutex::new(VecDeque::new()),
            search_count: AtomicUsize::new(0),
            lookup_count: AtomicUsize::new(0),
            booking_count: AtomicUsize::new(0),
            search_queries: Mutex::new(Vec::new()),
            booking_rejection: Mutex::new(None),
            booking_delay: Mutex::new(Duration::ZERO),
            booking_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: ServerMode) {
        self.outage
            .store(mode == ServerMode::CompleteOutage, Ordering::SeqCst);
    }

    fn mode(&self) -> ServerMode {
        if self.outage.load(Ordering::SeqCst) {
            ServerMode::CompleteOutage
        } else {
            ServerMode::Normal
        }
    }

    pub fn add_room(&self, room: Room) {
        self.rooms.lock().push(room);
    }

    // Delays applied to upcoming searches, one per call, in order
    pub fn queue_search_delays(&self, delays: Vec<Duration>) {
        self.search_delays.lock().extend(delays);
    }

    pub fn reject_bookings(&self, status: u16, message: &str) {
        *self.booking_rejection.lock() = Some((status, message.to_string()));
    }

    pub fn accept_bookings(&self) {
        *self.booking_rejection.lock() = None;
    }

    pub fn set_booking_delay(&self, delay: Duration) {
        *self.booking_delay.lock() = delay;
    }

    pub fn search_count(&self) -> usize {
        self.search_count.load(Ordering::SeqCst)
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }

    pub fn booking_count(&self) -> usize {
        self.booking_count.load(Ordering::SeqCst)
    }

    pub fn search_queries(&self) -> Vec<CatalogQuery> {
        self.search_queries.lock().clone()
    }

    pub fn booking_requests(&self) -> Vec<(BookingRequest, String)> {
        self.booking_requests.lock().clone()
    }

    fn check_catalog_health(&self) -> Result<(), CatalogError> {
        match self.mode() {
            ServerMode::CompleteOutage => Err(CatalogError::CatalogUnavailable(
                "Service unavailable".to_string(),
            )),
            ServerMode::Normal => Ok(()),
        }
    }
}

#[async_trait]
impl RoomCatalog for MockBackend {
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<Room>, CatalogError> {
        self.search_count.fetch_add(1, Ordering::SeqCst);
        self.search_queries.lock().push(query.clone());

        let delay = self.search_delays.lock().pop_front();
        if let Some(delay) = delay.filter(|d| !d.is_zero()) {
            tokio::time::sleep(delay).await;
        }

        self.check_catalog_health()?;
        let rooms = self.rooms.lock().clone();
        Ok(query.apply(&rooms))
    }

    async fn get_by_id(&self, room_id: &str) -> Result<Room, CatalogError> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.check_catalog_health()?;

        self.rooms
            .lock()
            .iter()
            .find(|room| room.id == room_id)
            .cloned()
            .ok_or_else(|| CatalogError::RoomNotFound(room_id.to_string()))
    }
}

#[async_trait]
impl BookingApi for MockBackend {
    async fn create_booking(
        &self,
        request: &BookingRequest,
        token: &str,
    ) -> Result<BookingConfirmation, BookingApiError> {
        let count = self.booking_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.booking_requests
            .lock()
            .push((request.clone(), token.to_string()));

        if self.mode() == ServerMode::CompleteOutage {
            return Err(BookingApiError::Transport(
                "connection refused".to_string(),
            ));
        }

        let delay = *self.booking_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let rejection = self.booking_rejection.lock().clone();
        if let Some((status, message)) = rejection {
            return Err(BookingApiError::Rejected { status, message });
        }

        Ok(BookingConfirmation::from_payload(serde_json::json!({
            "_id": format!("booking-{count}"),
            "roomId": request.room_id,
            "totalPrice": request.total_price,
            "status": "confirmed",
        })))
    }
}
