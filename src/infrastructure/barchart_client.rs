// Barchart OnDemand fuel price client
use crate::application::price_source::{PriceQuery, PriceSource};
use crate::domain::fuel::FuelPriceEntry;
use crate::domain::station::StationRecord;
use crate::infrastructure::config::UpstreamSettings;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const FUEL_PRICES_PATH: &str = "getFuelPrices.json";

pub struct BarchartClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BarchartClient {
    pub fn new(settings: &UpstreamSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        if settings.api_key.is_empty() {
            tracing::warn!("No upstream API key configured, fuel price requests will be rejected");
        }
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl PriceSource for BarchartClient {
    async fn fetch_prices(&self, query: &PriceQuery) -> anyhow::Result<Vec<StationRecord>> {
        tracing::debug!(?query, "Fetching fuel prices");
        let body = self
            .client
            .get(format!("{}/{}", self.base_url, FUEL_PRICES_PATH))
            .query(&[("apikey", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .context("Fuel price request failed")?
            .error_for_status()
            .context("Fuel price request was rejected")?
            .text()
            .await
            .context("Failed to read fuel price response")?;

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> anyhow::Result<Vec<StationRecord>> {
    let response: Response =
        serde_json::from_str(body).context("Failed to decode fuel price response")?;

    match response {
        Response {
            status: Some(Status { code: Some(200), .. }),
            results: Some(results),
        } => Ok(results.into_iter().map(StationRecord::from).collect()),
        Response { status, .. } => {
            let status = status.unwrap_or_default();
            anyhow::bail!(
                "No valid data returned from pricing API: code {:?}, message {:?}",
                status.code,
                status.message
            )
        }
    }
}

#[derive(Deserialize)]
struct Response {
    status: Option<Status>,
    results: Option<Vec<StationDto>>,
}

#[derive(Deserialize, Default)]
struct Status {
    code: Option<u16>,
    message: Option<String>,
}

/// Some numeric fields arrive as JSON numbers or as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl NumberOrString {
    fn into_f64(self) -> Option<f64> {
        match self {
            NumberOrString::Integer(value) => Some(value as f64),
            NumberOrString::Float(value) => Some(value),
            NumberOrString::Text(text) => text.trim().parse().ok(),
        }
    }

    fn into_string(self) -> String {
        match self {
            NumberOrString::Integer(value) => value.to_string(),
            NumberOrString::Float(value) => value.to_string(),
            NumberOrString::Text(text) => text,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationDto {
    location_id: Option<NumberOrString>,
    location: Option<String>,
    company: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<NumberOrString>,
    latitude: Option<NumberOrString>,
    longitude: Option<NumberOrString>,
    distance: Option<NumberOrString>,
    phone: Option<String>,
    #[serde(default)]
    prices: Vec<PriceDto>,
    last_update_timestamp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceDto {
    #[serde(default)]
    series_name: String,
    price: Option<NumberOrString>,
    date: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<StationDto> for StationRecord {
    fn from(dto: StationDto) -> Self {
        StationRecord {
            location_id: dto
                .location_id
                .map(NumberOrString::into_string)
                .unwrap_or_default(),
            name: non_empty(dto.location),
            brand: non_empty(dto.company),
            address: non_empty(dto.address),
            city: non_empty(dto.city),
            state: non_empty(dto.state).map(|state| state.trim().to_uppercase()),
            zip_code: non_empty(dto.zip_code.map(NumberOrString::into_string)),
            latitude: dto.latitude.and_then(NumberOrString::into_f64),
            longitude: dto.longitude.and_then(NumberOrString::into_f64),
            distance: dto.distance.and_then(NumberOrString::into_f64),
            phone: non_empty(dto.phone),
            prices: dto
                .prices
                .into_iter()
                .map(|price| {
                    FuelPriceEntry::new(
                        price.series_name,
                        price.price.and_then(NumberOrString::into_f64),
                        non_empty(price.date),
                    )
                })
                .collect(),
            last_update: non_empty(dto.last_update_timestamp),
        }
    }
}
