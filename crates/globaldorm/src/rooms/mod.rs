//! Read-only room catalog used to validate applications and capture room snapshots.

pub mod router;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use router::room_router;

/// Catalog entry. Applications embed a copy of this as their room snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: u64,
    pub name: String,
    pub location: RoomLocation,
    pub details: RoomDetails,
    pub price_per_month_gbp: f64,
    pub availability_date: NaiveDate,
    #[serde(default)]
    pub spoken_languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLocation {
    pub city: String,
    pub county: String,
    pub postcode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDetails {
    pub furnished: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub live_in_landlord: bool,
    pub shared_with: u32,
    pub bills_included: bool,
    pub bathroom_shared: bool,
}

/// Search criteria as received from callers. Values that fail to parse are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoomQuery {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub max_price: Option<String>,
    #[serde(default)]
    pub furnished: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl RoomQuery {
    pub fn matches(&self, room: &Room) -> bool {
        if let Some(city) = non_blank(&self.city) {
            if !room.location.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }

        if let Some(max_price) = non_blank(&self.max_price).and_then(|raw| raw.parse::<f64>().ok())
        {
            if room.price_per_month_gbp > max_price {
                return false;
            }
        }

        if let Some(furnished) = non_blank(&self.furnished).and_then(parse_flag) {
            if room.details.furnished != furnished {
                return false;
            }
        }

        if let Some(language) = non_blank(&self.language) {
            if !room.spoken_languages.iter().any(|spoken| spoken == language) {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Lookup seam so the application router can be exercised with fixture catalogs.
pub trait RoomCatalog: Send + Sync {
    fn room(&self, id: u64) -> Option<Room>;
    fn search(&self, query: &RoomQuery) -> Vec<Room>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Catalog loaded once from a `{"rooms": [...]}` JSON document.
#[derive(Debug, Clone, Default)]
pub struct StaticRoomCatalog {
    rooms: Vec<Room>,
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    rooms: Vec<Room>,
}

impl StaticRoomCatalog {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "room catalog not found; serving an empty catalog");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let document: CatalogDocument =
            serde_json::from_slice(&bytes).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), rooms = document.rooms.len(), "room catalog loaded");
        Ok(Self::new(document.rooms))
    }
}

impl RoomCatalog for StaticRoomCatalog {
    fn room(&self, id: u64) -> Option<Room> {
        self.rooms.iter().find(|room| room.id == id).cloned()
    }

    fn search(&self, query: &RoomQuery) -> Vec<Room> {
        self.rooms
            .iter()
            .filter(|room| query.matches(room))
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.rooms.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read room catalog {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("room catalog {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
