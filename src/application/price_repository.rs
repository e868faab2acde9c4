// Repository traits for snapshot writes and history reads
use crate::domain::fuel::{FuelType, PriceSet};
use crate::domain::report::{DatabaseStats, PricePoint, StationSnapshot, TrendPoint};
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Immutable per-fetch observation of a station (`StationGasPrices`).
#[derive(Debug, Clone, PartialEq)]
pub struct NewStationSnapshot {
    pub location_id: String,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub prices: PriceSet,
    pub price_date: NaiveDateTime,
}

/// Natural key: latitude, longitude and address.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Natural key: name, brand and location id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGasStation {
    pub name: String,
    pub brand: String,
    pub location_id: i64,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFuelPrice {
    pub station_id: i64,
    pub fuel_type: FuelType,
    pub price: f64,
    pub price_date: NaiveDateTime,
}

/// Averaged price of a region ("US", a named region or a state code).
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegionalPrice {
    pub region: String,
    pub fuel_type: FuelType,
    pub price: f64,
    pub price_date: NaiveDateTime,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Open a transaction holding one pooled connection until it is committed,
    /// rolled back or dropped.
    async fn begin(&self) -> anyhow::Result<Box<dyn SnapshotTransaction>>;
}

#[async_trait]
pub trait SnapshotTransaction: Send {
    async fn insert_station_snapshot(&mut self, snapshot: &NewStationSnapshot) -> anyhow::Result<()>;

    /// Insert-or-fetch by natural key; returns the row id.
    async fn upsert_location(&mut self, location: &NewLocation) -> anyhow::Result<i64>;

    /// Insert-or-fetch by natural key; returns the row id.
    async fn upsert_gas_station(&mut self, station: &NewGasStation) -> anyhow::Result<i64>;

    async fn insert_fuel_price(&mut self, price: &NewFuelPrice) -> anyhow::Result<()>;

    async fn insert_regional_price(&mut self, price: &NewRegionalPrice) -> anyhow::Result<()>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;

    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait PriceHistoryRepository: Send + Sync {
    async fn latest_station_snapshot(&self, location_id: &str) -> anyhow::Result<Option<StationSnapshot>>;

    /// Newest first.
    async fn station_history(
        &self,
        location_id: &str,
        fuel: FuelType,
        limit: u32,
    ) -> anyhow::Result<Vec<PricePoint>>;

    /// Regional snapshots of every fuel type for `region`, oldest first.
    async fn regional_trend(
        &self,
        region: &str,
        days: u32,
    ) -> anyhow::Result<Vec<(FuelType, TrendPoint)>>;

    /// Daily averages of the station snapshots in `state`, oldest first.
    async fn state_trend(&self, state: &str, fuel: FuelType, days: u32) -> anyhow::Result<Vec<TrendPoint>>;

    async fn stats(&self) -> anyhow::Result<DatabaseStats>;
}
