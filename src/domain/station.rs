// Station domain model
use super::fuel::{FuelPriceEntry, FuelType, PriceSet};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// One station as returned by the pricing source for a single query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationRecord {
    pub location_id: String,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance: Option<f64>,
    pub phone: Option<String>,
    pub prices: Vec<FuelPriceEntry>,
    pub last_update: Option<String>,
}

impl StationRecord {
    /// Price of the first entry, in source order, whose label classifies to `fuel`.
    /// A later entry of the same type is never consulted, even when the first has no price.
    pub fn extract_price(&self, fuel: FuelType) -> Option<f64> {
        self.prices
            .iter()
            .find(|entry| entry.fuel_type() == Some(fuel))
            .and_then(|entry| entry.price)
    }

    pub fn price_set(&self) -> PriceSet {
        PriceSet::from_fn(|fuel| self.extract_price(fuel))
    }

    /// Entries that classify to a fuel type and carry a price.
    pub fn classified_prices(&self) -> impl Iterator<Item = (FuelType, &FuelPriceEntry, f64)> {
        self.prices.iter().filter_map(|entry| {
            let fuel = entry.fuel_type()?;
            let price = entry.price?;
            Some((fuel, entry, price))
        })
    }

    pub fn is_in_state(&self, state: &str) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(state))
    }

    pub fn observed_at(&self) -> Option<NaiveDateTime> {
        self.last_update.as_deref().and_then(parse_timestamp)
    }
}

/// Parse the timestamp formats the pricing source emits, normalized to naive UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
