// Price source trait - the external pricing API as seen by the services
use crate::domain::station::StationRecord;
use async_trait::async_trait;
use serde::Serialize;

pub const DEFAULT_MAX_DISTANCE_MILES: f64 = 100.0;
pub const DEFAULT_TOTAL_LOCATIONS: u32 = 30;
pub const STATE_TOTAL_LOCATIONS: u32 = 50;

/// Query options understood by the pricing source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    pub total_locations: u32,
}

impl PriceQuery {
    fn empty() -> Self {
        Self {
            zip_code: None,
            state: None,
            location: None,
            latitude: None,
            longitude: None,
            max_distance: None,
            total_locations: DEFAULT_TOTAL_LOCATIONS,
        }
    }

    pub fn by_zip(zip_code: impl Into<String>) -> Self {
        Self {
            zip_code: Some(zip_code.into()),
            max_distance: Some(DEFAULT_MAX_DISTANCE_MILES),
            ..Self::empty()
        }
    }

    pub fn by_state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            total_locations: STATE_TOTAL_LOCATIONS,
            ..Self::empty()
        }
    }

    pub fn by_location(location_id: impl Into<String>) -> Self {
        Self {
            location: Some(location_id.into()),
            ..Self::empty()
        }
    }

    pub fn by_coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            max_distance: Some(DEFAULT_MAX_DISTANCE_MILES),
            ..Self::empty()
        }
    }

    pub fn with_max_distance(mut self, miles: f64) -> Self {
        self.max_distance = Some(miles);
        self
    }
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Stations matching `query`. Any transport or upstream failure is an error;
    /// callers decide whether to treat it as an empty result.
    async fn fetch_prices(&self, query: &PriceQuery) -> anyhow::Result<Vec<StationRecord>>;
}
