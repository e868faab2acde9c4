// Views served by the API: local listings, averages, station details, trends
use super::fuel::{FuelType, PriceSet};
use super::station::StationRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One value per fuel type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerFuel<T> {
    pub regular: T,
    pub midgrade: T,
    pub premium: T,
    pub diesel: T,
}

impl<T> PerFuel<T> {
    pub fn from_fn(mut value_of: impl FnMut(FuelType) -> T) -> Self {
        Self {
            regular: value_of(FuelType::Regular),
            midgrade: value_of(FuelType::Midgrade),
            premium: value_of(FuelType::Premium),
            diesel: value_of(FuelType::Diesel),
        }
    }

    pub fn get_mut(&mut self, fuel: FuelType) -> &mut T {
        match fuel {
            FuelType::Regular => &mut self.regular,
            FuelType::Midgrade => &mut self.midgrade,
            FuelType::Premium => &mut self.premium,
            FuelType::Diesel => &mut self.diesel,
        }
    }
}

/// A station in a local search, priced for one fuel type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStation {
    pub id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub price: f64,
    pub distance: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub brand: Option<String>,
    pub last_update: Option<String>,
    pub fuel_type: FuelType,
}

impl LocalStation {
    /// `None` when the station does not sell `fuel`.
    pub fn from_record(station: &StationRecord, fuel: FuelType) -> Option<Self> {
        let price = station.extract_price(fuel)?;
        Some(Self {
            id: station.location_id.clone(),
            name: station.name.clone(),
            address: station.address.clone(),
            city: station.city.clone(),
            state: station.state.clone(),
            price,
            distance: station.distance,
            latitude: station.latitude,
            longitude: station.longitude,
            brand: station.brand.clone(),
            last_update: station.last_update.clone(),
            fuel_type: fuel,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateAverages {
    pub state: String,
    /// Region the averages are keyed under; the state code itself.
    pub region: String,
    pub stations: usize,
    pub update_date: DateTime<Utc>,
    #[serde(flatten)]
    pub averages: PriceSet,
    pub latest_date: PerFuel<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NationalAverages {
    #[serde(flatten)]
    pub averages: PerFuel<BTreeMap<String, Option<f64>>>,
    pub latest_date: PerFuel<NaiveDate>,
}

/// Most recent persisted observation of a station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    pub location_id: String,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub prices: PriceSet,
    pub price_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDetail {
    pub id: String,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(flatten)]
    pub prices: PriceSet,
    pub last_update: Option<NaiveDateTime>,
}

impl From<StationSnapshot> for StationDetail {
    fn from(snapshot: StationSnapshot) -> Self {
        Self {
            id: snapshot.location_id,
            name: snapshot.name,
            brand: snapshot.brand,
            address: snapshot.address,
            city: snapshot.city,
            state: snapshot.state,
            zip_code: snapshot.zip_code,
            latitude: snapshot.latitude,
            longitude: snapshot.longitude,
            prices: snapshot.prices,
            last_update: Some(snapshot.price_date),
        }
    }
}

impl From<&StationRecord> for StationDetail {
    fn from(station: &StationRecord) -> Self {
        Self {
            id: station.location_id.clone(),
            name: station.name.clone(),
            brand: station.brand.clone(),
            address: station.address.clone(),
            city: station.city.clone(),
            state: station.state.clone(),
            zip_code: station.zip_code.clone(),
            latitude: station.latitude,
            longitude: station.longitude,
            prices: station.price_set(),
            last_update: station.observed_at(),
        }
    }
}

/// One row of a station's price history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub price: f64,
    pub price_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDateTime,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub stations: i64,
    pub states: i64,
    pub last_update: Option<NaiveDateTime>,
    pub average_prices: PriceSet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fuel::FuelPriceEntry;
    use serde_json::json;

    #[test]
    fn test_local_station_requires_requested_fuel() {
        let station = StationRecord {
            location_id: "42".to_string(),
            name: Some("Corner Fuel".to_string()),
            prices: vec![FuelPriceEntry::new("Regular Gas", Some(3.099), None)],
            ..Default::default()
        };
        let local = LocalStation::from_record(&station, FuelType::Regular).unwrap();
        assert_eq!(local.price, 3.099);
        assert_eq!(local.fuel_type, FuelType::Regular);
        assert!(LocalStation::from_record(&station, FuelType::Diesel).is_none());
    }

    #[test]
    fn test_station_detail_serializes_flat_prices() {
        let detail = StationDetail {
            id: "42".to_string(),
            name: None,
            brand: None,
            address: None,
            city: None,
            state: Some("IL".to_string()),
            zip_code: Some("60606".to_string()),
            latitude: None,
            longitude: None,
            prices: PriceSet {
                regular: Some(3.1),
                ..Default::default()
            },
            last_update: None,
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["regular"], json!(3.1));
        assert_eq!(value["diesel"], json!(null));
        assert_eq!(value["zipCode"], json!("60606"));
    }

    #[test]
    fn test_national_averages_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let mut averages: PerFuel<BTreeMap<String, Option<f64>>> = PerFuel::default();
        averages.get_mut(FuelType::Regular).insert("US".to_string(), Some(3.25));
        let national = NationalAverages {
            averages,
            latest_date: PerFuel::from_fn(|_| date),
        };
        let value = serde_json::to_value(&national).unwrap();
        assert_eq!(value["regular"]["US"], json!(3.25));
        assert_eq!(value["latestDate"]["diesel"], json!("2025-04-01"));
    }
}
