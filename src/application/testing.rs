// In-memory fakes of the price source and repositories for service and handler tests
use crate::application::price_repository::{
    NewFuelPrice, NewGasStation, NewLocation, NewRegionalPrice, NewStationSnapshot,
    PriceHistoryRepository, SnapshotStore, SnapshotTransaction,
};
use crate::application::price_source::{PriceQuery, PriceSource};
use crate::domain::aggregation::average;
use crate::domain::fuel::{FuelPriceEntry, FuelType, PriceSet};
use crate::domain::geography::Geography;
use crate::domain::report::{DatabaseStats, PricePoint, StationSnapshot, TrendPoint};
use crate::domain::station::StationRecord;
use crate::infrastructure::config::parse_geography;
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, NaiveTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

pub fn geography() -> Arc<Geography> {
    Arc::new(parse_geography(include_str!("../../config/geography.toml")).unwrap())
}

pub fn station(id: &str, state: &str, prices: &[(&str, f64)]) -> StationRecord {
    StationRecord {
        location_id: id.to_string(),
        name: Some(format!("Station {id}")),
        brand: Some("Shell".to_string()),
        address: Some(format!("{id} Main St")),
        city: Some("Springfield".to_string()),
        state: Some(state.to_string()),
        zip_code: Some("62701".to_string()),
        latitude: Some(39.78),
        longitude: Some(-89.65),
        distance: Some(1.5),
        phone: None,
        prices: prices
            .iter()
            .map(|(label, price)| FuelPriceEntry::new(*label, Some(*price), None))
            .collect(),
        last_update: Some("2025-04-01T10:30:00-05:00".to_string()),
    }
}

type Responder = Box<dyn Fn(&PriceQuery) -> anyhow::Result<Vec<StationRecord>> + Send + Sync>;

/// Answers queries with a closure and records every query it saw.
pub struct FakePriceSource {
    respond: Responder,
    calls: Mutex<Vec<PriceQuery>>,
}

impl FakePriceSource {
    pub fn new(
        respond: impl Fn(&PriceQuery) -> anyhow::Result<Vec<StationRecord>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    pub fn calls(&self) -> Vec<PriceQuery> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for FakePriceSource {
    async fn fetch_prices(&self, query: &PriceQuery) -> anyhow::Result<Vec<StationRecord>> {
        self.calls.lock().unwrap().push(query.clone());
        (self.respond)(query)
    }
}

/// Committed rows; ids are 1-based positions.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    pub station_snapshots: Vec<NewStationSnapshot>,
    pub locations: Vec<NewLocation>,
    pub gas_stations: Vec<NewGasStation>,
    pub fuel_prices: Vec<NewFuelPrice>,
    pub regional_prices: Vec<NewRegionalPrice>,
}

#[derive(Debug, Default)]
struct Counters {
    begun: usize,
    rollbacks: usize,
}

#[derive(Debug, Clone, Default)]
struct Failures {
    station_snapshot: Option<String>,
    regional_price: Option<String>,
}

/// Transactions work on a copy of the committed rows; commit swaps it in.
#[derive(Default)]
pub struct MemoryStore {
    db: Arc<Mutex<MemoryDb>>,
    counters: Arc<Mutex<Counters>>,
    failures: Mutex<Failures>,
}

impl MemoryStore {
    pub fn committed(&self) -> MemoryDb {
        self.db.lock().unwrap().clone()
    }

    pub fn transactions_begun(&self) -> usize {
        self.counters.lock().unwrap().begun
    }

    pub fn rollbacks(&self) -> usize {
        self.counters.lock().unwrap().rollbacks
    }

    /// Fail the snapshot insert of the station with this location id.
    pub fn fail_station_snapshot(&self, location_id: &str) {
        self.failures.lock().unwrap().station_snapshot = Some(location_id.to_string());
    }

    /// Fail any regional price insert for this region.
    pub fn fail_regional_price(&self, region: &str) {
        self.failures.lock().unwrap().regional_price = Some(region.to_string());
    }
}

struct MemoryTransaction {
    working: MemoryDb,
    db: Arc<Mutex<MemoryDb>>,
    counters: Arc<Mutex<Counters>>,
    failures: Failures,
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn begin(&self) -> anyhow::Result<Box<dyn SnapshotTransaction>> {
        self.counters.lock().unwrap().begun += 1;
        Ok(Box::new(MemoryTransaction {
            working: self.committed(),
            db: self.db.clone(),
            counters: self.counters.clone(),
            failures: self.failures.lock().unwrap().clone(),
        }))
    }
}

#[async_trait]
impl SnapshotTransaction for MemoryTransaction {
    async fn insert_station_snapshot(&mut self, snapshot: &NewStationSnapshot) -> anyhow::Result<()> {
        if self.failures.station_snapshot.as_deref() == Some(snapshot.location_id.as_str()) {
            anyhow::bail!("simulated insert failure for {}", snapshot.location_id);
        }
        self.working.station_snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn upsert_location(&mut self, location: &NewLocation) -> anyhow::Result<i64> {
        let locations = &mut self.working.locations;
        let existing = locations.iter().position(|l| {
            l.latitude == location.latitude
                && l.longitude == location.longitude
                && l.address == location.address
        });
        if let Some(position) = existing {
            return Ok(position as i64 + 1);
        }
        locations.push(location.clone());
        Ok(locations.len() as i64)
    }

    async fn upsert_gas_station(&mut self, station: &NewGasStation) -> anyhow::Result<i64> {
        let stations = &mut self.working.gas_stations;
        let existing = stations.iter().position(|s| {
            s.name == station.name && s.brand == station.brand && s.location_id == station.location_id
        });
        if let Some(position) = existing {
            return Ok(position as i64 + 1);
        }
        stations.push(station.clone());
        Ok(stations.len() as i64)
    }

    async fn insert_fuel_price(&mut self, price: &NewFuelPrice) -> anyhow::Result<()> {
        self.working.fuel_prices.push(price.clone());
        Ok(())
    }

    async fn insert_regional_price(&mut self, price: &NewRegionalPrice) -> anyhow::Result<()> {
        if self.failures.regional_price.as_deref() == Some(price.region.as_str()) {
            anyhow::bail!("simulated insert failure for {}", price.region);
        }
        self.working.regional_prices.push(price.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryTransaction { working, db, .. } = *self;
        *db.lock().unwrap() = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        self.counters.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

fn window_start(days: u32) -> NaiveDateTime {
    Utc::now().naive_utc() - Duration::days(i64::from(days))
}

#[async_trait]
impl PriceHistoryRepository for MemoryStore {
    async fn latest_station_snapshot(&self, location_id: &str) -> anyhow::Result<Option<StationSnapshot>> {
        let db = self.db.lock().unwrap();
        Ok(db
            .station_snapshots
            .iter()
            .filter(|s| s.location_id == location_id)
            .max_by_key(|s| s.price_date)
            .map(|s| StationSnapshot {
                location_id: s.location_id.clone(),
                name: s.name.clone(),
                brand: s.brand.clone(),
                address: s.address.clone(),
                city: s.city.clone(),
                state: s.state.clone(),
                zip_code: s.zip_code.clone(),
                latitude: s.latitude,
                longitude: s.longitude,
                prices: s.prices,
                price_date: s.price_date,
            }))
    }

    async fn station_history(
        &self,
        location_id: &str,
        fuel: FuelType,
        limit: u32,
    ) -> anyhow::Result<Vec<PricePoint>> {
        let db = self.db.lock().unwrap();
        let mut points: Vec<PricePoint> = db
            .station_snapshots
            .iter()
            .filter(|s| s.location_id == location_id)
            .filter_map(|s| {
                Some(PricePoint {
                    price: s.prices.get(fuel)?,
                    price_date: s.price_date,
                })
            })
            .collect();
        points.sort_by(|a, b| b.price_date.cmp(&a.price_date));
        points.truncate(limit as usize);
        Ok(points)
    }

    async fn regional_trend(&self, region: &str, days: u32) -> anyhow::Result<Vec<(FuelType, TrendPoint)>> {
        let since = window_start(days);
        let db = self.db.lock().unwrap();
        let mut rows: Vec<(FuelType, TrendPoint)> = db
            .regional_prices
            .iter()
            .filter(|row| row.region == region && row.price_date >= since)
            .map(|row| {
                (
                    row.fuel_type,
                    TrendPoint {
                        date: row.price_date,
                        price: row.price,
                    },
                )
            })
            .collect();
        rows.sort_by(|a, b| (a.0, a.1.date).cmp(&(b.0, b.1.date)));
        Ok(rows)
    }

    async fn state_trend(&self, state: &str, fuel: FuelType, days: u32) -> anyhow::Result<Vec<TrendPoint>> {
        let since = window_start(days);
        let db = self.db.lock().unwrap();
        let mut by_day: BTreeMap<_, Vec<f64>> = BTreeMap::new();
        for snapshot in &db.station_snapshots {
            if snapshot.state.as_deref() != Some(state) || snapshot.price_date < since {
                continue;
            }
            if let Some(price) = snapshot.prices.get(fuel) {
                by_day.entry(snapshot.price_date.date()).or_default().push(price);
            }
        }
        Ok(by_day
            .into_iter()
            .filter_map(|(day, prices)| {
                Some(TrendPoint {
                    date: day.and_time(NaiveTime::MIN),
                    price: average(&prices)?,
                })
            })
            .collect())
    }

    async fn stats(&self) -> anyhow::Result<DatabaseStats> {
        let since = window_start(7);
        let db = self.db.lock().unwrap();
        let snapshots = &db.station_snapshots;
        let stations: BTreeSet<_> = snapshots.iter().map(|s| &s.location_id).collect();
        let states: BTreeSet<_> = snapshots.iter().filter_map(|s| s.state.as_ref()).collect();
        let recent: Vec<_> = snapshots.iter().filter(|s| s.price_date >= since).collect();
        let average_prices = PriceSet::from_fn(|fuel| {
            let prices: Vec<f64> = recent.iter().filter_map(|s| s.prices.get(fuel)).collect();
            average(&prices)
        });
        Ok(DatabaseStats {
            stations: stations.len() as i64,
            states: states.len() as i64,
            last_update: snapshots.iter().map(|s| s.price_date).max(),
            average_prices,
        })
    }
}
