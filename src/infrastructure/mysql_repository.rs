// MySQL repository - snapshot writes and history reads over a sqlx pool
use crate::application::price_repository::{
    NewFuelPrice, NewGasStation, NewLocation, NewRegionalPrice, NewStationSnapshot,
    PriceHistoryRepository, SnapshotStore, SnapshotTransaction,
};
use crate::domain::aggregation::round_price;
use crate::domain::fuel::{FuelType, PriceSet};
use crate::domain::report::{DatabaseStats, PricePoint, StationSnapshot, TrendPoint};
use crate::infrastructure::config::DatabaseSettings;
use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{FromRow, MySql, Transaction};
use std::time::Duration;

const STATS_WINDOW_DAYS: u32 = 7;

#[derive(Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Opens the pool and one connection, so bad credentials fail here.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.username)
            .password(&settings.password)
            .database(&settings.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .connect_with(options)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to MySQL at {}:{}/{}",
                    settings.host, settings.port, settings.database
                )
            })?;

        tracing::info!(
            host = %settings.host,
            database = %settings.database,
            max_connections = settings.max_connections,
            "Connected to MySQL"
        );
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

#[async_trait]
impl SnapshotStore for MySqlRepository {
    async fn begin(&self) -> anyhow::Result<Box<dyn SnapshotTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to acquire a database connection")?;
        Ok(Box::new(MySqlSnapshotTransaction { tx }))
    }
}

pub struct MySqlSnapshotTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl SnapshotTransaction for MySqlSnapshotTransaction {
    async fn insert_station_snapshot(&mut self, snapshot: &NewStationSnapshot) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO StationGasPrices (
                location_id, location, company, address, zip_code, city, state,
                latitude, longitude, regular, midgrade, premium, diesel, price_date
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&snapshot.location_id)
        .bind(&snapshot.name)
        .bind(&snapshot.brand)
        .bind(&snapshot.address)
        .bind(&snapshot.zip_code)
        .bind(&snapshot.city)
        .bind(&snapshot.state)
        .bind(snapshot.latitude)
        .bind(snapshot.longitude)
        .bind(snapshot.prices.regular)
        .bind(snapshot.prices.midgrade)
        .bind(snapshot.prices.premium)
        .bind(snapshot.prices.diesel)
        .bind(snapshot.price_date)
        .execute(&mut *self.tx)
        .await
        .context("Failed to insert station snapshot")?;
        Ok(())
    }

    async fn upsert_location(&mut self, location: &NewLocation) -> anyhow::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO Locations (latitude, longitude, address, city, state, zip_code)
            VALUES (?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE id = LAST_INSERT_ID(id)",
        )
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(&location.address)
        .bind(&location.city)
        .bind(&location.state)
        .bind(&location.zip_code)
        .execute(&mut *self.tx)
        .await
        .context("Failed to upsert location")?;
        Ok(result.last_insert_id() as i64)
    }

    async fn upsert_gas_station(&mut self, station: &NewGasStation) -> anyhow::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO GasStations (name, brand, location_id, phone_number)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                id = LAST_INSERT_ID(id),
                phone_number = COALESCE(VALUES(phone_number), phone_number)",
        )
        .bind(&station.name)
        .bind(&station.brand)
        .bind(station.location_id)
        .bind(&station.phone)
        .execute(&mut *self.tx)
        .await
        .context("Failed to upsert gas station")?;
        Ok(result.last_insert_id() as i64)
    }

    async fn insert_fuel_price(&mut self, price: &NewFuelPrice) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO FuelPrices (station_id, fuel_type, price, price_date) VALUES (?, ?, ?, ?)",
        )
        .bind(price.station_id)
        .bind(price.fuel_type.as_str())
        .bind(price.price)
        .bind(price.price_date)
        .execute(&mut *self.tx)
        .await
        .context("Failed to insert fuel price")?;
        Ok(())
    }

    async fn insert_regional_price(&mut self, price: &NewRegionalPrice) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO NationalGasPrices (region, fuel_type, price, price_date) VALUES (?, ?, ?, ?)",
        )
        .bind(&price.region)
        .bind(price.fuel_type.as_str())
        .bind(price.price)
        .bind(price.price_date)
        .execute(&mut *self.tx)
        .await
        .context("Failed to insert regional price")?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MySqlSnapshotTransaction { tx } = *self;
        tx.commit().await.context("Failed to commit transaction")
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        let MySqlSnapshotTransaction { tx } = *self;
        tx.rollback().await.context("Failed to roll back transaction")
    }
}

#[derive(FromRow)]
struct SnapshotRow {
    location_id: String,
    location: Option<String>,
    company: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    regular: Option<f64>,
    midgrade: Option<f64>,
    premium: Option<f64>,
    diesel: Option<f64>,
    price_date: NaiveDateTime,
}

impl From<SnapshotRow> for StationSnapshot {
    fn from(row: SnapshotRow) -> Self {
        StationSnapshot {
            location_id: row.location_id,
            name: row.location,
            brand: row.company,
            address: row.address,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            latitude: row.latitude,
            longitude: row.longitude,
            prices: PriceSet {
                regular: row.regular,
                midgrade: row.midgrade,
                premium: row.premium,
                diesel: row.diesel,
            },
            price_date: row.price_date,
        }
    }
}

#[derive(FromRow)]
struct PricePointRow {
    price: f64,
    price_date: NaiveDateTime,
}

#[derive(FromRow)]
struct RegionalRow {
    fuel_type: String,
    price: f64,
    price_date: NaiveDateTime,
}

#[derive(FromRow)]
struct DailyAverageRow {
    day: NaiveDateTime,
    price: Option<f64>,
}

#[derive(FromRow)]
struct CountsRow {
    stations: i64,
    states: i64,
    last_update: Option<NaiveDateTime>,
}

#[derive(FromRow)]
struct AveragesRow {
    regular: Option<f64>,
    midgrade: Option<f64>,
    premium: Option<f64>,
    diesel: Option<f64>,
}

#[async_trait]
impl PriceHistoryRepository for MySqlRepository {
    async fn latest_station_snapshot(&self, location_id: &str) -> anyhow::Result<Option<StationSnapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            "SELECT location_id, location, company, address, city, state, zip_code,
                latitude, longitude, regular, midgrade, premium, diesel, price_date
            FROM StationGasPrices
            WHERE location_id = ?
            ORDER BY price_date DESC, id DESC
            LIMIT 1",
        )
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(StationSnapshot::from))
    }

    async fn station_history(
        &self,
        location_id: &str,
        fuel: FuelType,
        limit: u32,
    ) -> anyhow::Result<Vec<PricePoint>> {
        // column names come from the closed FuelType set
        let sql = format!(
            "SELECT {column} AS price, price_date
            FROM StationGasPrices
            WHERE location_id = ? AND {column} IS NOT NULL
            ORDER BY price_date DESC, id DESC
            LIMIT ?",
            column = fuel.as_str()
        );
        let rows = sqlx::query_as::<_, PricePointRow>(&sql)
            .bind(location_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| PricePoint {
                price: row.price,
                price_date: row.price_date,
            })
            .collect())
    }

    async fn regional_trend(&self, region: &str, days: u32) -> anyhow::Result<Vec<(FuelType, TrendPoint)>> {
        let rows = sqlx::query_as::<_, RegionalRow>(
            "SELECT fuel_type, price, price_date
            FROM NationalGasPrices
            WHERE region = ? AND price_date >= UTC_TIMESTAMP() - INTERVAL ? DAY
            ORDER BY fuel_type, price_date",
        )
        .bind(region)
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let fuel = FuelType::parse(&row.fuel_type)?;
                Some((
                    fuel,
                    TrendPoint {
                        date: row.price_date,
                        price: row.price,
                    },
                ))
            })
            .collect())
    }

    async fn state_trend(&self, state: &str, fuel: FuelType, days: u32) -> anyhow::Result<Vec<TrendPoint>> {
        let sql = format!(
            "SELECT CAST(DATE(price_date) AS DATETIME) AS day, AVG({column}) AS price
            FROM StationGasPrices
            WHERE state = ? AND {column} IS NOT NULL
                AND price_date >= UTC_TIMESTAMP() - INTERVAL ? DAY
            GROUP BY day
            ORDER BY day",
            column = fuel.as_str()
        );
        let rows = sqlx::query_as::<_, DailyAverageRow>(&sql)
            .bind(state)
            .bind(days)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(TrendPoint {
                    date: row.day,
                    price: round_price(row.price?),
                })
            })
            .collect())
    }

    async fn stats(&self) -> anyhow::Result<DatabaseStats> {
        let counts = sqlx::query_as::<_, CountsRow>(
            "SELECT COUNT(DISTINCT location_id) AS stations,
                COUNT(DISTINCT state) AS states,
                MAX(price_date) AS last_update
            FROM StationGasPrices",
        )
        .fetch_one(&self.pool)
        .await?;

        let averages = sqlx::query_as::<_, AveragesRow>(
            "SELECT AVG(regular) AS regular, AVG(midgrade) AS midgrade,
                AVG(premium) AS premium, AVG(diesel) AS diesel
            FROM StationGasPrices
            WHERE price_date >= UTC_TIMESTAMP() - INTERVAL ? DAY",
        )
        .bind(STATS_WINDOW_DAYS)
        .fetch_one(&self.pool)
        .await?;

        Ok(DatabaseStats {
            stations: counts.stations,
            states: counts.states,
            last_update: counts.last_update,
            average_prices: PriceSet {
                regular: averages.regular.map(round_price),
                midgrade: averages.midgrade.map(round_price),
                premium: averages.premium.map(round_price),
                diesel: averages.diesel.map(round_price),
            },
        })
    }
}
