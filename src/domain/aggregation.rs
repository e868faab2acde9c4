// Price aggregation - averages per state, region and nation
use super::fuel::{FuelType, PriceSet};
use super::station::StationRecord;
use std::collections::BTreeMap;

/// Bucket every station accumulates into, regardless of its region.
pub const NATIONAL_REGION: &str = "US";

/// Averages keyed by region name ("US", a named region or a state code).
pub type RegionalAverages = BTreeMap<String, PriceSet>;

/// Arithmetic mean rounded to 3 decimals, `None` for no values.
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(round_price(mean))
}

pub fn round_price(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Default)]
struct PriceSamples {
    regular: Vec<f64>,
    midgrade: Vec<f64>,
    premium: Vec<f64>,
    diesel: Vec<f64>,
}

impl PriceSamples {
    fn samples_mut(&mut self, fuel: FuelType) -> &mut Vec<f64> {
        match fuel {
            FuelType::Regular => &mut self.regular,
            FuelType::Midgrade => &mut self.midgrade,
            FuelType::Premium => &mut self.premium,
            FuelType::Diesel => &mut self.diesel,
        }
    }

    fn add_station(&mut self, station: &StationRecord) {
        for fuel in FuelType::ALL {
            if let Some(price) = station.extract_price(fuel) {
                self.samples_mut(fuel).push(price);
            }
        }
    }

    fn averages(&self) -> PriceSet {
        PriceSet {
            regular: average(&self.regular),
            midgrade: average(&self.midgrade),
            premium: average(&self.premium),
            diesel: average(&self.diesel),
        }
    }
}

/// Average each fuel type over the given stations.
pub fn average_prices<'a>(stations: impl IntoIterator<Item = &'a StationRecord>) -> PriceSet {
    let mut samples = PriceSamples::default();
    for station in stations {
        samples.add_station(station);
    }
    samples.averages()
}

/// Group station prices by `region_of` and average them.
///
/// Every name in `regions` appears in the result, with empty averages when no
/// station fell into it. Every station also counts towards [`NATIONAL_REGION`],
/// including those `region_of` cannot place.
pub fn aggregate_by_region<'a, 'r, F>(
    stations: impl IntoIterator<Item = &'a StationRecord>,
    region_of: F,
    regions: impl IntoIterator<Item = &'r str>,
) -> RegionalAverages
where
    F: Fn(&StationRecord) -> Option<&'r str>,
{
    let mut buckets: BTreeMap<String, PriceSamples> = regions
        .into_iter()
        .map(|region| (region.to_string(), PriceSamples::default()))
        .collect();
    buckets.insert(NATIONAL_REGION.to_string(), PriceSamples::default());

    for station in stations {
        if let Some(region) = region_of(station).filter(|region| *region != NATIONAL_REGION) {
            buckets
                .entry(region.to_string())
                .or_default()
                .add_station(station);
        }
        if let Some(national) = buckets.get_mut(NATIONAL_REGION) {
            national.add_station(station);
        }
    }

    buckets
        .into_iter()
        .map(|(region, samples)| (region, samples.averages()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fuel::FuelPriceEntry;

    fn station(state: &str, regular: Option<f64>, diesel: Option<f64>) -> StationRecord {
        let mut prices = Vec::new();
        if let Some(price) = regular {
            prices.push(FuelPriceEntry::new("Regular Gas", Some(price), None));
        }
        if let Some(price) = diesel {
            prices.push(FuelPriceEntry::new("Diesel", Some(price), None));
        }
        StationRecord {
            location_id: format!("{state}-{regular:?}"),
            state: Some(state.to_string()),
            prices,
            ..Default::default()
        }
    }

    #[test]
    fn test_average_rounds_to_three_decimals() {
        assert_eq!(average(&[3.0, 3.5]), Some(3.25));
        assert_eq!(average(&[3.1234]), Some(3.123));
        assert_eq!(average(&[3.1236]), Some(3.124));
        assert_eq!(average(&[3.199, 3.299, 3.399]), Some(3.299));
        assert_eq!(average(&[1.0, 1.0, 2.0]), Some(1.333));
    }

    #[test]
    fn test_average_of_nothing_is_none() {
        assert_eq!(average(&[]), None);
    }

    #[test]
    fn test_average_prices_per_fuel() {
        let stations = vec![
            station("IL", Some(3.0), Some(4.0)),
            station("IL", Some(4.0), None),
        ];
        let averages = average_prices(&stations);
        assert_eq!(averages.regular, Some(3.5));
        assert_eq!(averages.diesel, Some(4.0));
        assert_eq!(averages.premium, None);
    }

    #[test]
    fn test_aggregate_by_region_fills_national_bucket() {
        let stations = vec![
            station("NY", Some(3.0), None),
            station("CA", Some(5.0), Some(6.0)),
            station("ZZ", Some(4.0), None),
        ];
        let region_of = |s: &StationRecord| match s.state.as_deref() {
            Some("NY") => Some("Northeast"),
            Some("CA") => Some("West"),
            _ => None,
        };
        let averages =
            aggregate_by_region(&stations, region_of, ["Northeast", "West", "Midwest"]);

        assert_eq!(averages["Northeast"].regular, Some(3.0));
        assert_eq!(averages["West"].diesel, Some(6.0));
        assert_eq!(averages["Midwest"], PriceSet::default());
        assert_eq!(averages[NATIONAL_REGION].regular, Some(4.0));
        assert_eq!(averages[NATIONAL_REGION].diesel, Some(6.0));
        assert_eq!(averages.len(), 4);
    }
}
