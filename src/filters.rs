// Room filtering: user-selected criteria and the catalog query derived from it

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Room;

// Selectable values offered by the storefront
pub const ROOM_TYPES: [&str; 6] = [
    "Deluxe Room",
    "Executive Suite",
    "Family Room",
    "Premium Suite",
    "Standard Room",
    "Ocean View Room",
];

pub const PRICE_RANGES: [&str; 4] = [
    "0 to 5000",
    "5000 to 10000",
    "10000 to 15000",
    "15000 to 20000",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Room type must not be empty")]
    EmptyRoomType,

    #[error("Invalid price range: {0:?}")]
    InvalidPriceRange(String),

    #[error("Unknown sort option: {0:?}")]
    UnknownSortOption(String),
}

// Closed interval [min, max] in the same unit as room prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriceRange {
    pub min: u64,
    pub max: u64,
}

impl FromStr for PriceRange {
    type Err = FilterError;

    /// Parses labels like `"0 to 5000"` or `" ₹ 0 to 5000"`; a leading
    /// currency symbol is ignored.
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let invalid = || FilterError::InvalidPriceRange(label.to_string());

        let cleaned = label.trim_start_matches(|c: char| !c.is_ascii_digit());
        let parts: Vec<&str> = cleaned.split_whitespace().collect();
        let (min, max) = match parts.as_slice() {
            [min, "to", max] => (min, max),
            _ => return Err(invalid()),
        };

        let min = min.parse::<u64>().map_err(|_| invalid())?;
        let max = max.parse::<u64>().map_err(|_| invalid())?;
        if min > max {
            return Err(invalid());
        }

        Ok(Self { min, max })
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOption {
    #[serde(rename = "Price Low to High")]
    PriceLowToHigh,
    #[serde(rename = "Price High to Low")]
    PriceHighToLow,
    #[serde(rename = "Newest First")]
    NewestFirst,
}

impl SortOption {
    pub const ALL: [SortOption; 3] = [
        SortOption::PriceLowToHigh,
        SortOption::PriceHighToLow,
        SortOption::NewestFirst,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortOption::PriceLowToHigh => "Price Low to High",
            SortOption::PriceHighToLow => "Price High to Low",
            SortOption::NewestFirst => "Newest First",
        }
    }
}

impl FromStr for SortOption {
    type Err = FilterError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        SortOption::ALL
            .into_iter()
            .find(|option| option.label() == label.trim())
            .ok_or_else(|| FilterError::UnknownSortOption(label.to_string()))
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Current filter/sort selection. Every mutation leaves a consistent value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    room_types: BTreeSet<String>,
    price_ranges: BTreeSet<PriceRange>,
    sort: Option<SortOption>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    // Adds or removes exactly one room type; returns whether anything changed
    pub fn set_room_type(&mut self, label: &str, selected: bool) -> Result<bool, FilterError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(FilterError::EmptyRoomType);
        }

        Ok(if selected {
            self.room_types.insert(label.to_string())
        } else {
            self.room_types.remove(label)
        })
    }

    pub fn set_price_range(&mut self, label: &str, selected: bool) -> Result<bool, FilterError> {
        let range = label.parse::<PriceRange>()?;

        Ok(if selected {
            self.price_ranges.insert(range)
        } else {
            self.price_ranges.remove(&range)
        })
    }

    // Radio semantics: the new option replaces any previous one
    pub fn select_sort(&mut self, option: Option<SortOption>) -> bool {
        let changed = self.sort != option;
        self.sort = option;
        changed
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.room_types.is_empty() && self.price_ranges.is_empty() && self.sort.is_none()
    }

    pub fn room_types(&self) -> impl Iterator<Item = &str> {
        self.room_types.iter().map(String::as_str)
    }

    pub fn price_ranges(&self) -> impl Iterator<Item = &PriceRange> {
        self.price_ranges.iter()
    }

    pub fn sort(&self) -> Option<SortOption> {
        self.sort
    }

    /// Normalized query for the catalog.
    ///
    /// Several selected price ranges collapse into their enclosing interval
    /// `[min(mins), max(maxes)]`, so a gap between two disjoint ranges is
    /// included in the query.
    pub fn to_query(&self) -> CatalogQuery {
        CatalogQuery {
            room_types: self.room_types.iter().cloned().collect(),
            min_price: self.price_ranges.iter().map(|range| range.min).min(),
            max_price: self.price_ranges.iter().map(|range| range.max).max(),
            sort_by: self.sort,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub room_types: Vec<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub sort_by: Option<SortOption>,
}

impl CatalogQuery {
    pub fn is_empty(&self) -> bool {
        self.room_types.is_empty()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.sort_by.is_none()
    }

    // Parameters for `GET /api/rooms`
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.room_types.is_empty() {
            pairs.push(("roomType", self.room_types.join(",")));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.to_string()));
        }
        if let Some(sort) = self.sort_by {
            pairs.push(("sortBy", sort.label().to_string()));
        }
        pairs
    }

    // Local equivalent of the backend's matching. Rooms with an unparseable
    // price only match when no price bound is set.
    pub fn matches(&self, room: &Room) -> bool {
        if !self.room_types.is_empty() && !self.room_types.contains(&room.room_type) {
            return false;
        }

        if self.min_price.is_none() && self.max_price.is_none() {
            return true;
        }

        let Ok(rate) = room.nightly_rate() else {
            return false;
        };
        if self.min_price.map_or(false, |min| rate < min.into()) {
            return false;
        }
        if self.max_price.map_or(false, |max| rate > max.into()) {
            return false;
        }
        true
    }

    // Filters and orders an in-memory room list the way the backend would
    pub fn apply(&self, rooms: &[Room]) -> Vec<Room> {
        let mut filtered: Vec<Room> = rooms
            .iter()
            .filter(|room| self.matches(room))
            .cloned()
            .collect();

        match self.sort_by {
            Some(SortOption::PriceLowToHigh) => {
                filtered.sort_by(|a, b| compare_price(a, b, false));
            }
            Some(SortOption::PriceHighToLow) => {
                filtered.sort_by(|a, b| compare_price(a, b, true));
            }
            Some(SortOption::NewestFirst) => {
                filtered.sort_by(|a, b| match (a.created_at, b.created_at) {
                    (Some(a), Some(b)) => b.cmp(&a),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                });
            }
            None => {}
        }

        filtered
    }
}

// Unparseable prices sort last in either direction
fn compare_price(a: &Room, b: &Room, descending: bool) -> Ordering {
    match (a.nightly_rate(), b.nightly_rate()) {
        (Ok(a), Ok(b)) if descending => b.cmp(&a),
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    }
}
