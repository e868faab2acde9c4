// Fuel type domain model
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Regular,
    Midgrade,
    Premium,
    Diesel,
}

impl FuelType {
    /// Classification precedence: the first label found in a series name wins.
    pub const ALL: [FuelType; 4] = [
        FuelType::Regular,
        FuelType::Midgrade,
        FuelType::Premium,
        FuelType::Diesel,
    ];

    /// Substring the pricing source uses in its series names.
    pub fn series_label(self) -> &'static str {
        match self {
            FuelType::Regular => "Regular Gas",
            FuelType::Midgrade => "Midgrade Gas",
            FuelType::Premium => "Premium Gas",
            FuelType::Diesel => "Diesel",
        }
    }

    /// Stored value in `fuel_type` columns; also the snapshot column name.
    pub fn as_str(self) -> &'static str {
        match self {
            FuelType::Regular => "regular",
            FuelType::Midgrade => "midgrade",
            FuelType::Premium => "premium",
            FuelType::Diesel => "diesel",
        }
    }

    /// Case-sensitive containment test, in `ALL` order.
    pub fn classify(series_name: &str) -> Option<FuelType> {
        Self::ALL
            .into_iter()
            .find(|fuel| series_name.contains(fuel.series_label()))
    }

    /// Parse a user supplied fuel name ("Diesel", "premium", ...).
    pub fn parse(value: &str) -> Option<FuelType> {
        Self::ALL
            .into_iter()
            .find(|fuel| fuel.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a station's price list as reported by the pricing source.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelPriceEntry {
    pub series_name: String,
    pub price: Option<f64>,
    pub date: Option<String>,
}

impl FuelPriceEntry {
    pub fn new(series_name: impl Into<String>, price: Option<f64>, date: Option<String>) -> Self {
        Self {
            series_name: series_name.into(),
            price,
            date,
        }
    }

    pub fn fuel_type(&self) -> Option<FuelType> {
        FuelType::classify(&self.series_name)
    }
}

/// Four optional prices, one per fuel type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PriceSet {
    pub regular: Option<f64>,
    pub midgrade: Option<f64>,
    pub premium: Option<f64>,
    pub diesel: Option<f64>,
}

impl PriceSet {
    pub fn get(&self, fuel: FuelType) -> Option<f64> {
        match fuel {
            FuelType::Regular => self.regular,
            FuelType::Midgrade => self.midgrade,
            FuelType::Premium => self.premium,
            FuelType::Diesel => self.diesel,
        }
    }

    pub fn set(&mut self, fuel: FuelType, price: Option<f64>) {
        match fuel {
            FuelType::Regular => self.regular = price,
            FuelType::Midgrade => self.midgrade = price,
            FuelType::Premium => self.premium = price,
            FuelType::Diesel => self.diesel = price,
        }
    }

    pub fn from_fn(mut price_of: impl FnMut(FuelType) -> Option<f64>) -> Self {
        let mut prices = Self::default();
        for fuel in FuelType::ALL {
            prices.set(fuel, price_of(fuel));
        }
        prices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_canonical_labels() {
        assert_eq!(FuelType::classify("Regular Gas"), Some(FuelType::Regular));
        assert_eq!(FuelType::classify("Midgrade Gas"), Some(FuelType::Midgrade));
        assert_eq!(FuelType::classify("Premium Gas"), Some(FuelType::Premium));
        assert_eq!(FuelType::classify("Diesel"), Some(FuelType::Diesel));
        assert_eq!(FuelType::classify("Retail Regular Gas Price"), Some(FuelType::Regular));
    }

    #[test]
    fn test_classify_unmatched_labels() {
        assert_eq!(FuelType::classify("DEF"), None);
        assert_eq!(FuelType::classify("Propane"), None);
        assert_eq!(FuelType::classify("E85"), None);
        // matching is case-sensitive
        assert_eq!(FuelType::classify("regular gas"), None);
        assert_eq!(FuelType::classify(""), None);
    }

    #[test]
    fn test_classify_precedence() {
        assert_eq!(FuelType::classify("Premium Gas / Regular Gas"), Some(FuelType::Regular));
        assert_eq!(FuelType::classify("Diesel or Midgrade Gas"), Some(FuelType::Midgrade));
        assert_eq!(FuelType::classify("Premium Gas Diesel"), Some(FuelType::Premium));
    }

    #[test]
    fn test_parse_user_fuel_names() {
        assert_eq!(FuelType::parse("diesel"), Some(FuelType::Diesel));
        assert_eq!(FuelType::parse("Premium"), Some(FuelType::Premium));
        assert_eq!(FuelType::parse("kerosene"), None);
    }

    #[test]
    fn test_price_set_accessors() {
        let prices = PriceSet::from_fn(|fuel| match fuel {
            FuelType::Diesel => Some(4.109),
            _ => None,
        });
        assert_eq!(prices.get(FuelType::Diesel), Some(4.109));
        assert_eq!(prices.get(FuelType::Regular), None);
    }
}
