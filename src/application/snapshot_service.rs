// Snapshot service - all-or-nothing writes of station and regional snapshots
use crate::application::price_repository::{
    NewFuelPrice, NewGasStation, NewLocation, NewRegionalPrice, NewStationSnapshot, SnapshotStore,
    SnapshotTransaction,
};
use crate::domain::aggregation::{NATIONAL_REGION, RegionalAverages};
use crate::domain::fuel::FuelType;
use crate::domain::station::{StationRecord, parse_timestamp};
use anyhow::Context;
use chrono::{NaiveDateTime, SubsecRound, Utc};
use std::sync::Arc;

const UNKNOWN_STATION_NAME: &str = "Unknown Station";

#[derive(Clone)]
pub struct SnapshotService {
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotService {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Persist one snapshot per station together with its normalized location,
    /// station and fuel price rows. Returns `false` when nothing was committed.
    pub async fn save_station_snapshot(&self, stations: &[StationRecord]) -> bool {
        if stations.is_empty() {
            tracing::info!("No station data to save");
            return false;
        }

        match self.write_stations(stations).await {
            Ok(()) => {
                tracing::info!(stations = stations.len(), "Saved station snapshot");
                true
            }
            Err(e) => {
                tracing::error!("Error saving station-level data: {:#}", e);
                false
            }
        }
    }

    /// Persist the national ("US") and regional averages of every fuel type.
    /// Returns `false` without writing when no region has any average.
    pub async fn save_regional_snapshot(&self, aggregates: &RegionalAverages) -> bool {
        let rows = regional_rows(aggregates, now());
        if rows.is_empty() {
            tracing::warn!("No regional averages to save");
            return false;
        }

        match self.write_regional(&rows).await {
            Ok(()) => {
                tracing::info!(rows = rows.len(), "Saved regional price snapshot");
                true
            }
            Err(e) => {
                tracing::error!("Error saving national price data: {:#}", e);
                false
            }
        }
    }

    async fn write_stations(&self, stations: &[StationRecord]) -> anyhow::Result<()> {
        let batch_time = now();
        let mut tx = self
            .store
            .begin()
            .await
            .context("Failed to open snapshot transaction")?;

        for station in stations {
            if let Err(e) = write_station(tx.as_mut(), station, batch_time).await {
                rollback(tx).await;
                return Err(e.context(format!("Failed to save station {}", station.location_id)));
            }
        }

        tx.commit().await.context("Failed to commit station snapshot")
    }

    async fn write_regional(&self, rows: &[NewRegionalPrice]) -> anyhow::Result<()> {
        let mut tx = self
            .store
            .begin()
            .await
            .context("Failed to open snapshot transaction")?;

        for row in rows {
            if let Err(e) = tx.insert_regional_price(row).await {
                rollback(tx).await;
                return Err(e.context(format!(
                    "Failed to save {} price for {}",
                    row.fuel_type, row.region
                )));
            }
        }

        tx.commit()
            .await
            .context("Failed to commit regional snapshot")
    }
}

async fn write_station(
    tx: &mut dyn SnapshotTransaction,
    station: &StationRecord,
    batch_time: NaiveDateTime,
) -> anyhow::Result<()> {
    tx.insert_station_snapshot(&NewStationSnapshot {
        location_id: station.location_id.clone(),
        name: station.name.clone(),
        brand: station.brand.clone(),
        address: station.address.clone(),
        zip_code: station.zip_code.clone(),
        city: station.city.clone(),
        state: station.state.clone(),
        latitude: station.latitude,
        longitude: station.longitude,
        prices: station.price_set(),
        price_date: station.observed_at().unwrap_or(batch_time),
    })
    .await?;

    let location_id = tx
        .upsert_location(&NewLocation {
            latitude: station.latitude.unwrap_or_default(),
            longitude: station.longitude.unwrap_or_default(),
            address: station.address.clone().unwrap_or_default(),
            city: station.city.clone().unwrap_or_default(),
            state: station.state.clone().unwrap_or_default(),
            zip_code: station.zip_code.clone().unwrap_or_default(),
        })
        .await?;

    let station_id = tx
        .upsert_gas_station(&NewGasStation {
            name: station
                .name
                .clone()
                .unwrap_or_else(|| UNKNOWN_STATION_NAME.to_string()),
            brand: station.brand.clone().unwrap_or_default(),
            location_id,
            phone: station.phone.clone(),
        })
        .await?;

    for (fuel_type, entry, price) in station.classified_prices() {
        let price_date = entry
            .date
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(batch_time);
        tx.insert_fuel_price(&NewFuelPrice {
            station_id,
            fuel_type,
            price,
            price_date,
        })
        .await?;
    }

    Ok(())
}

/// National rows first, then every other region with an average.
fn regional_rows(aggregates: &RegionalAverages, price_date: NaiveDateTime) -> Vec<NewRegionalPrice> {
    let row = |region: &str, fuel_type: FuelType, price: f64| NewRegionalPrice {
        region: region.to_string(),
        fuel_type,
        price,
        price_date,
    };

    let national = FuelType::ALL.into_iter().filter_map(|fuel| {
        let price = aggregates.get(NATIONAL_REGION)?.get(fuel)?;
        Some(row(NATIONAL_REGION, fuel, price))
    });
    let regional = FuelType::ALL.into_iter().flat_map(move |fuel| {
        aggregates
            .iter()
            .filter(|(region, _)| region.as_str() != NATIONAL_REGION)
            .filter_map(move |(region, prices)| Some(row(region, fuel, prices.get(fuel)?)))
    });

    national.chain(regional).collect()
}

async fn rollback(tx: Box<dyn SnapshotTransaction>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!("Rollback failed: {:#}", e);
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{MemoryStore, station};
    use crate::domain::fuel::PriceSet;

    fn service(store: &Arc<MemoryStore>) -> SnapshotService {
        SnapshotService::new(store.clone())
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_saved() {
        let store = Arc::new(MemoryStore::default());
        assert!(!service(&store).save_station_snapshot(&[]).await);
        assert_eq!(store.transactions_begun(), 0);
    }

    #[tokio::test]
    async fn test_station_snapshot_writes_every_table() {
        let store = Arc::new(MemoryStore::default());
        let stations = vec![
            station("1", "IL", &[("Regular Gas", 3.199), ("Diesel", 3.899), ("DEF", 4.5)]),
            station("2", "IL", &[("Premium Gas", 4.399)]),
        ];

        assert!(service(&store).save_station_snapshot(&stations).await);

        let db = store.committed();
        assert_eq!(db.station_snapshots.len(), 2);
        assert_eq!(db.station_snapshots[0].prices.regular, Some(3.199));
        assert_eq!(db.station_snapshots[0].prices.diesel, Some(3.899));
        assert_eq!(db.locations.len(), 2);
        assert_eq!(db.gas_stations.len(), 2);
        // DEF is not a fuel type we track
        assert_eq!(db.fuel_prices.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_station_rolls_back_whole_batch() {
        let store = Arc::new(MemoryStore::default());
        store.fail_station_snapshot("2");
        let stations = vec![
            station("1", "IL", &[("Regular Gas", 3.199)]),
            station("2", "IL", &[("Regular Gas", 3.299)]),
            station("3", "IL", &[("Regular Gas", 3.399)]),
        ];

        assert!(!service(&store).save_station_snapshot(&stations).await);

        let db = store.committed();
        assert!(db.station_snapshots.is_empty());
        assert!(db.locations.is_empty());
        assert!(db.gas_stations.is_empty());
        assert!(db.fuel_prices.is_empty());
        assert_eq!(store.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_repeated_station_reuses_natural_keys() {
        let store = Arc::new(MemoryStore::default());
        let stations = vec![station("1", "IL", &[("Regular Gas", 3.199)])];
        let service = service(&store);

        assert!(service.save_station_snapshot(&stations).await);
        assert!(service.save_station_snapshot(&stations).await);

        let db = store.committed();
        assert_eq!(db.locations.len(), 1);
        assert_eq!(db.gas_stations.len(), 1);
        // snapshots and prices are history, they accumulate
        assert_eq!(db.station_snapshots.len(), 2);
        assert_eq!(db.fuel_prices.len(), 2);
    }

    #[tokio::test]
    async fn test_regional_snapshot_skips_missing_averages() {
        let store = Arc::new(MemoryStore::default());
        let mut aggregates = RegionalAverages::new();
        aggregates.insert(
            "US".to_string(),
            PriceSet {
                regular: Some(3.25),
                diesel: Some(3.9),
                ..Default::default()
            },
        );
        aggregates.insert(
            "West".to_string(),
            PriceSet {
                regular: Some(4.1),
                ..Default::default()
            },
        );
        aggregates.insert("Midwest".to_string(), PriceSet::default());

        assert!(service(&store).save_regional_snapshot(&aggregates).await);

        let rows: Vec<_> = store
            .committed()
            .regional_prices
            .into_iter()
            .map(|row| (row.region, row.fuel_type, row.price))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("US".to_string(), FuelType::Regular, 3.25),
                ("US".to_string(), FuelType::Diesel, 3.9),
                ("West".to_string(), FuelType::Regular, 4.1),
            ]
        );
    }

    #[tokio::test]
    async fn test_regional_snapshot_without_averages_is_not_saved() {
        let store = Arc::new(MemoryStore::default());
        let aggregates: RegionalAverages = ["US", "West", "Midwest"]
            .into_iter()
            .map(|region| (region.to_string(), PriceSet::default()))
            .collect();

        assert!(!service(&store).save_regional_snapshot(&aggregates).await);
        assert_eq!(store.transactions_begun(), 0);
    }

    #[tokio::test]
    async fn test_failed_regional_insert_commits_nothing() {
        let store = Arc::new(MemoryStore::default());
        store.fail_regional_price("West");
        let mut aggregates = RegionalAverages::new();
        for region in ["US", "West"] {
            aggregates.insert(
                region.to_string(),
                PriceSet {
                    regular: Some(3.5),
                    ..Default::default()
                },
            );
        }

        assert!(!service(&store).save_regional_snapshot(&aggregates).await);
        assert!(store.committed().regional_prices.is_empty());
    }
}
