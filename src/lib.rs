// Room search and booking core for the villa storefront

pub mod booking;
pub mod catalog;
pub mod config;
pub mod contact;
pub mod dates;
pub mod filters;
pub mod http_client;
pub mod models;
pub mod pricing;
pub mod room_cache;
pub mod search;

#[cfg(test)]
pub mod mock_backend;

// Re-export key types for convenience
pub use booking::{
    BookingApi, BookingApiError, BookingConfirmation, BookingError, BookingForm, BookingPhase,
    BookingRequest, BookingWorkflow, PaymentMethod,
};
pub use catalog::{CatalogError, RoomCatalog};
pub use config::StorefrontConfig;
pub use contact::{DeviceEmailStore, EmailPrompt, FileEmailStore, InMemoryEmailStore};
pub use dates::{DateError, StayRange};
pub use filters::{CatalogQuery, FilterCriteria, FilterError, PriceRange, SortOption};
pub use http_client::{ClientError, StorefrontClient};
pub use models::{AuthContext, Hotel, Identity, Room};
pub use pricing::{PriceQuote, PricingError};
pub use room_cache::{CachedCatalog, RoomCache};
pub use search::{ResultView, RoomSearch, SearchOutcome};
