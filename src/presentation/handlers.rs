// HTTP request handlers
use crate::application::price_source::PriceQuery;
use crate::application::pricing_service::{Fetched, SortOrder};
use crate::domain::fuel::FuelType;
use crate::domain::geography::SampleRoster;
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

const DEFAULT_ZIP_CODE: &str = "60606";
const LOCAL_MAX_DISTANCE_MILES: f64 = 25.0;
const DEFAULT_HISTORY_LIMIT: u32 = 30;
const MAX_HISTORY_LIMIT: u32 = 1000;
const DEFAULT_TREND_DAYS: u32 = 30;
const MAX_TREND_DAYS: u32 = 3650;

pub const SNAPSHOT_SAVED_HEADER: &str = "x-snapshot-saved";
const ADMIN_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalQuery {
    pub zip: Option<String>,
    pub max_distance: Option<String>,
    pub fuel_type: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub max_distance: Option<String>,
    pub fuel_type: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub fuel_type: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendQuery {
    pub days: Option<String>,
    pub fuel_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResult {
    pub success: bool,
    pub message: String,
    pub stations: usize,
}

/// Unknown or missing fuel names mean regular.
fn fuel_type(value: Option<&str>) -> FuelType {
    value.and_then(FuelType::parse).unwrap_or(FuelType::Regular)
}

/// Numeric query values are parsed leniently; anything unparsable reads as absent.
fn parse_param<T: FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|value| value.trim().parse().ok())
}

fn trend_days(days: Option<&str>) -> u32 {
    parse_param::<u32>(days)
        .filter(|days| *days > 0)
        .unwrap_or(DEFAULT_TREND_DAYS)
        .min(MAX_TREND_DAYS)
}

fn history_limit(limit: Option<&str>) -> u32 {
    parse_param::<u32>(limit)
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

fn max_distance(miles: Option<&str>) -> f64 {
    parse_param::<f64>(miles)
        .filter(|miles| miles.is_finite() && *miles > 0.0)
        .unwrap_or(LOCAL_MAX_DISTANCE_MILES)
}

fn coordinate(value: Option<&str>, range: f64) -> Option<f64> {
    parse_param::<f64>(value).filter(|v| v.is_finite() && v.abs() <= range)
}

fn with_saved_header<T: Serialize>(fetched: Fetched<T>) -> impl IntoResponse {
    let saved = if fetched.saved { "true" } else { "false" };
    ([(SNAPSHOT_SAVED_HEADER, saved)], Json(fetched.data))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Stations around a ZIP code, priced for one fuel type
pub async fn local_prices(
    Query(query): Query<LocalQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let zip = query
        .zip
        .as_deref()
        .map(str::trim)
        .filter(|zip| !zip.is_empty())
        .unwrap_or(DEFAULT_ZIP_CODE);
    let source_query =
        PriceQuery::by_zip(zip).with_max_distance(max_distance(query.max_distance.as_deref()));

    let fetched = state
        .pricing_service
        .local_prices(
            source_query,
            fuel_type(query.fuel_type.as_deref()),
            SortOrder::parse(query.sort.as_deref()),
        )
        .await;
    with_saved_header(fetched)
}

/// Stations around a coordinate pair, priced for one fuel type
pub async fn geo_prices(
    Query(query): Query<GeoQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(lat), Some(lng)) = (
        coordinate(query.lat.as_deref(), 90.0),
        coordinate(query.lng.as_deref(), 180.0),
    ) else {
        return Err(ApiError::BadRequest {
            error: "Latitude and longitude are required".to_string(),
        });
    };
    let source_query = PriceQuery::by_coordinates(lat, lng)
        .with_max_distance(max_distance(query.max_distance.as_deref()));

    let fetched = state
        .pricing_service
        .local_prices(
            source_query,
            fuel_type(query.fuel_type.as_deref()),
            SortOrder::parse(query.sort.as_deref()),
        )
        .await;
    Ok(with_saved_header(fetched))
}

pub async fn state_prices(
    Path(state_code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let state_code = state_code.trim().to_uppercase();
    match state.pricing_service.state_averages(&state_code).await {
        Some(fetched) => Ok(with_saved_header(fetched)),
        None => Err(ApiError::NotFound {
            error: format!("No gas stations found in {state_code}"),
            message: Some("Try searching for a different state or by ZIP code instead".to_string()),
        }),
    }
}

pub async fn national_prices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let fetched = state
        .pricing_service
        .national_averages(SampleRoster::National)
        .await;
    with_saved_header(fetched)
}

pub async fn station_detail(
    Path(station_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    match state.pricing_service.station_detail(&station_id).await {
        Ok(Some(detail)) => Ok(Json(detail)),
        Ok(None) => Err(ApiError::not_found("Station not found")),
        Err(e) => Err(ApiError::internal("Failed to fetch station details", e)),
    }
}

pub async fn station_history(
    Path(station_id): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = history_limit(query.limit.as_deref());
    let history = state
        .pricing_service
        .station_history(&station_id, fuel_type(query.fuel_type.as_deref()), limit)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch price history", e))?;
    Ok(Json(history))
}

pub async fn national_trends(
    Query(query): Query<TrendQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let trends = state
        .pricing_service
        .national_trends(trend_days(query.days.as_deref()))
        .await
        .map_err(|e| ApiError::internal("Failed to fetch national price trends", e))?;
    Ok(Json(trends))
}

/// Trend of a state, a named region or "US"
pub async fn area_trends(
    Path(area): Path<String>,
    Query(query): Query<TrendQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let trend = state
        .pricing_service
        .area_trend(
            &area,
            fuel_type(query.fuel_type.as_deref()),
            trend_days(query.days.as_deref()),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to fetch price trends for state {area}"), e))?;
    Ok(Json(trend))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .pricing_service
        .stats()
        .await
        .map_err(|e| ApiError::internal("Failed to fetch database stats", e))?;
    Ok(Json(stats))
}

/// Re-fetch and save the stations around a ZIP code
pub async fn admin_refresh(
    Path(zip_code): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let presented = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if !state.is_admin(presented) {
        tracing::warn!(%zip_code, "Rejected admin refresh");
        return Err(ApiError::Unauthorized);
    }

    match state.pricing_service.refresh_zip(&zip_code).await {
        Ok(Some(stations)) => Ok(Json(RefreshResult {
            success: true,
            message: format!("Successfully refreshed data for {zip_code}"),
            stations,
        })),
        Ok(None) => Err(ApiError::not_found(format!(
            "No stations found for ZIP code {zip_code}"
        ))),
        Err(e) => Err(ApiError::internal("Failed to save data to database", e)),
    }
}
