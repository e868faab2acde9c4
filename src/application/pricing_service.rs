// Pricing service - Use cases behind the fuel price endpoints
use crate::application::price_repository::PriceHistoryRepository;
use crate::application::price_source::{PriceQuery, PriceSource};
use crate::application::snapshot_service::SnapshotService;
use crate::domain::aggregation::{NATIONAL_REGION, aggregate_by_region, average_prices};
use crate::domain::fuel::FuelType;
use crate::domain::geography::{Geography, SampleRoster};
use crate::domain::report::{
    DatabaseStats, LocalStation, NationalAverages, PerFuel, PricePoint, StateAverages,
    StationDetail, TrendPoint,
};
use crate::domain::station::StationRecord;
use anyhow::Context;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;

/// Direct state queries returning fewer stations than this fall back to ZIP sampling.
pub const STATE_FALLBACK_THRESHOLD: usize = 5;
pub const STATE_FALLBACK_RADIUS_MILES: f64 = 150.0;
pub const ADMIN_REFRESH_RADIUS_MILES: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("desc") => SortOrder::Descending,
            _ => SortOrder::Ascending,
        }
    }
}

/// Data served to the caller along with whether persisting it succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub saved: bool,
}

#[derive(Clone)]
pub struct PricingService {
    source: Arc<dyn PriceSource>,
    snapshots: SnapshotService,
    history: Arc<dyn PriceHistoryRepository>,
    geography: Arc<Geography>,
}

impl PricingService {
    pub fn new(
        source: Arc<dyn PriceSource>,
        snapshots: SnapshotService,
        history: Arc<dyn PriceHistoryRepository>,
        geography: Arc<Geography>,
    ) -> Self {
        Self {
            source,
            snapshots,
            history,
            geography,
        }
    }

    pub fn geography(&self) -> &Geography {
        &self.geography
    }

    /// Upstream failures are logged and read as "no stations".
    async fn fetch(&self, query: PriceQuery) -> Vec<StationRecord> {
        match self.source.fetch_prices(&query).await {
            Ok(stations) => stations,
            Err(e) => {
                tracing::warn!(?query, "Error fetching fuel prices: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Stations around a ZIP code or coordinates that sell `fuel`, sorted by its price.
    /// Every fetched station is saved, including those dropped from the listing.
    pub async fn local_prices(
        &self,
        query: PriceQuery,
        fuel: FuelType,
        sort: SortOrder,
    ) -> Fetched<Vec<LocalStation>> {
        let stations = self.fetch(query).await;
        if stations.is_empty() {
            return Fetched {
                data: Vec::new(),
                saved: false,
            };
        }

        let mut listed: Vec<LocalStation> = stations
            .iter()
            .filter_map(|station| LocalStation::from_record(station, fuel))
            .collect();
        listed.sort_by(|a, b| match sort {
            SortOrder::Ascending => a.price.total_cmp(&b.price),
            SortOrder::Descending => b.price.total_cmp(&a.price),
        });

        let saved = self.snapshots.save_station_snapshot(&stations).await;
        Fetched {
            data: listed,
            saved,
        }
    }

    /// Stations located in `state`: the direct state query, topped up with
    /// representative ZIP code searches when it returns too few.
    pub async fn state_stations(&self, state: &str) -> Vec<StationRecord> {
        let mut stations = self.fetch(PriceQuery::by_state(state)).await;

        if stations.len() < STATE_FALLBACK_THRESHOLD {
            let zip_codes = self.geography.zip_codes_for(state);
            tracing::debug!(
                state,
                direct = stations.len(),
                zip_codes = zip_codes.len(),
                "Falling back to ZIP code sampling"
            );
            let sampled = join_all(zip_codes.iter().map(|zip| {
                let query =
                    PriceQuery::by_zip(zip.as_str()).with_max_distance(STATE_FALLBACK_RADIUS_MILES);
                self.fetch(query)
            }))
            .await;
            stations.extend(sampled.into_iter().flatten());
        }

        // ZIP searches near a border pick up neighbouring states
        stations.retain(|station| station.is_in_state(state));
        stations
    }

    /// `None` when no station could be found in the state.
    pub async fn state_averages(&self, state: &str) -> Option<Fetched<StateAverages>> {
        let state = state.trim().to_uppercase();
        let stations = self.state_stations(&state).await;
        if stations.is_empty() {
            return None;
        }

        let now = Utc::now();
        let today = now.date_naive();
        let averages = StateAverages {
            region: state.clone(),
            stations: stations.len(),
            update_date: now,
            averages: average_prices(&stations),
            latest_date: PerFuel::from_fn(|_| today),
            state,
        };

        let saved = self.snapshots.save_station_snapshot(&stations).await;
        Some(Fetched {
            data: averages,
            saved,
        })
    }

    /// Average prices per region and nationwide over the states sampled by `roster`.
    pub async fn national_averages(&self, roster: SampleRoster) -> Fetched<NationalAverages> {
        let sample = self.geography.sample_states(roster);
        let results = join_all(
            sample
                .iter()
                .map(|state| self.fetch(PriceQuery::by_state(*state))),
        )
        .await;
        let stations: Vec<StationRecord> = results.into_iter().flatten().collect();
        tracing::debug!(
            states = sample.len(),
            stations = stations.len(),
            "Fetched sample states"
        );

        let aggregates = aggregate_by_region(
            &stations,
            |station| {
                station
                    .state
                    .as_deref()
                    .and_then(|state| self.geography.region_of_state(state))
            },
            self.geography.region_names(),
        );

        let today = Utc::now().date_naive();
        let national = NationalAverages {
            averages: PerFuel::from_fn(|fuel| {
                aggregates
                    .iter()
                    .map(|(region, prices)| (region.clone(), prices.get(fuel)))
                    .collect()
            }),
            latest_date: PerFuel::from_fn(|_| today),
        };

        let saved = self.snapshots.save_regional_snapshot(&aggregates).await;
        Fetched {
            data: national,
            saved,
        }
    }

    /// Latest saved snapshot, else a fresh lookup that is saved on the way out.
    pub async fn station_detail(&self, station_id: &str) -> anyhow::Result<Option<StationDetail>> {
        if let Some(snapshot) = self
            .history
            .latest_station_snapshot(station_id)
            .await
            .context("Failed to read station snapshot")?
        {
            return Ok(Some(snapshot.into()));
        }

        let stations = self.fetch(PriceQuery::by_location(station_id)).await;
        let Some(station) = stations.into_iter().next() else {
            return Ok(None);
        };
        let detail = StationDetail::from(&station);
        self.snapshots
            .save_station_snapshot(std::slice::from_ref(&station))
            .await;
        Ok(Some(detail))
    }

    pub async fn station_history(
        &self,
        station_id: &str,
        fuel: FuelType,
        limit: u32,
    ) -> anyhow::Result<Vec<PricePoint>> {
        self.history
            .station_history(station_id, fuel, limit)
            .await
            .context("Failed to read station price history")
    }

    pub async fn national_trends(&self, days: u32) -> anyhow::Result<PerFuel<Vec<TrendPoint>>> {
        let rows = self
            .history
            .regional_trend(NATIONAL_REGION, days)
            .await
            .context("Failed to read national price trends")?;

        let mut trends: PerFuel<Vec<TrendPoint>> = PerFuel::default();
        for (fuel, point) in rows {
            trends.get_mut(fuel).push(point);
        }
        Ok(trends)
    }

    /// Trend of a named region or "US" from the regional snapshots, or of a
    /// state from the daily average of its station snapshots.
    pub async fn area_trend(
        &self,
        area: &str,
        fuel: FuelType,
        days: u32,
    ) -> anyhow::Result<Vec<TrendPoint>> {
        let area = area.trim();
        let region = if area.eq_ignore_ascii_case(NATIONAL_REGION) {
            Some(NATIONAL_REGION)
        } else {
            self.geography.region_name(area)
        };

        match region {
            Some(region) => {
                let rows = self
                    .history
                    .regional_trend(region, days)
                    .await
                    .with_context(|| format!("Failed to read price trends for {region}"))?;
                Ok(rows
                    .into_iter()
                    .filter(|(row_fuel, _)| *row_fuel == fuel)
                    .map(|(_, point)| point)
                    .collect())
            }
            None => {
                let state = area.to_uppercase();
                self.history
                    .state_trend(&state, fuel, days)
                    .await
                    .with_context(|| format!("Failed to read price trends for state {state}"))
            }
        }
    }

    pub async fn stats(&self) -> anyhow::Result<DatabaseStats> {
        self.history
            .stats()
            .await
            .context("Failed to read database stats")
    }

    /// Fetch and save the stations around a ZIP code. `Ok(None)` when there are none.
    pub async fn refresh_zip(&self, zip_code: &str) -> anyhow::Result<Option<usize>> {
        let stations = self
            .fetch(PriceQuery::by_zip(zip_code).with_max_distance(ADMIN_REFRESH_RADIUS_MILES))
            .await;
        if stations.is_empty() {
            return Ok(None);
        }
        if !self.snapshots.save_station_snapshot(&stations).await {
            anyhow::bail!("Failed to save data to database");
        }
        Ok(Some(stations.len()))
    }

    /// Re-pull a state with a direct query and save what came back.
    pub async fn refresh_state(&self, state: &str) -> bool {
        let stations = self.fetch(PriceQuery::by_state(state)).await;
        self.snapshots.save_station_snapshot(&stations).await
    }
}
