use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FlightSearchParams {
    pub origin: String,
    pub destination: String,
    pub date: Option<String>,
    pub max_results: Option<usize>,
}

pub async fn search_flights(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FlightSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    for (name, value) in [("origin", &params.origin), ("destination", &params.destination)] {
        let len = value.trim().chars().count();
        if !(2..=50).contains(&len) {
            return Err(ApiError::BadRequest(format!(
                "{} must be between 2 and 50 characters",
                name
            )));
        }
    }

    let max_results = params.max_results.unwrap_or(5).clamp(1, 20);

    let flights = state
        .flights
        .search_flights(
            &params.origin,
            &params.destination,
            params.date.as_deref(),
            max_results,
        )
        .await?;

    Ok(Json(json!({
        "count": flights.len(),
        "flights": flights,
    })))
}

pub async fn flight_details(
    State(state): State<Arc<AppState>>,
    Path(flight_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let flight = state
        .flights
        .get_flight_by_number(&flight_number)
        .ok_or_else(|| ApiError::NotFound(format!("Flight {} not found", flight_number)))?;

    Ok(Json(json!(flight)))
}
