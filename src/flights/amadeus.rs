//! Amadeus self-service API client.
//!
//! Handles the OAuth2 client-credentials token (cached until shortly before
//! expiry), flight-offers search, and airport/city location lookup.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;

use super::Flight;
use crate::core::errors::ApiError;

const TEST_BASE_URL: &str = "https://test.api.amadeus.com";
const PRODUCTION_BASE_URL: &str = "https://api.amadeus.com";

/// Refresh the token this many seconds before the reported expiry.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct AmadeusClient {
    base_url: String,
    api_key: String,
    api_secret: String,
    client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl AmadeusClient {
    pub fn new(api_key: String, api_secret: String, use_test_env: bool, timeout_secs: u64) -> Self {
        let base_url = if use_test_env {
            TEST_BASE_URL
        } else {
            PRODUCTION_BASE_URL
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        tracing::info!(
            "Amadeus client initialized ({} environment)",
            if use_test_env { "TEST" } else { "PRODUCTION" }
        );

        Self {
            base_url: base_url.to_string(),
            api_key,
            api_secret,
            client,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.access_token.clone());
            }
        }

        let url = format!("{}/v1/security/oauth2/token", self.base_url);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.api_key.as_str()),
            ("client_secret", self.api_secret.as_str()),
        ];

        let res = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let detail = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Amadeus auth failed ({}): {}",
                status, detail
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let access_token = payload["access_token"]
            .as_str()
            .ok_or_else(|| ApiError::Upstream("Amadeus auth response missing token".to_string()))?
            .to_string();
        let expires_in = payload["expires_in"].as_i64().unwrap_or(1799);

        let expires_at =
            Utc::now() + chrono::Duration::seconds((expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0));
        *guard = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at,
        });

        Ok(access_token)
    }

    /// Search flight offers for a route on a given date (YYYY-MM-DD).
    pub async fn search_flight_offers(
        &self,
        origin: &str,
        destination: &str,
        departure_date: &str,
        adults: u32,
        max_results: usize,
    ) -> Result<Vec<Flight>, ApiError> {
        let token = self.access_token().await?;
        let url = format!("{}/v2/shopping/flight-offers", self.base_url);

        tracing::info!(
            "Searching Amadeus: {} -> {} on {}",
            origin,
            destination,
            departure_date
        );

        let res = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[
                ("originLocationCode", origin.to_uppercase().as_str()),
                ("destinationLocationCode", destination.to_uppercase().as_str()),
                ("departureDate", departure_date),
                ("adults", adults.to_string().as_str()),
                ("max", max_results.to_string().as_str()),
            ])
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let detail = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Amadeus flight search failed ({}): {}",
                status, detail
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let flights = parse_offers(&payload["data"]);
        tracing::info!("Found {} flights from Amadeus", flights.len());
        Ok(flights)
    }

    /// Resolve a city or airport keyword to an IATA code.
    pub async fn lookup_location(&self, keyword: &str) -> Result<Option<String>, ApiError> {
        let token = self.access_token().await?;
        let url = format!("{}/v1/reference-data/locations", self.base_url);

        let res = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("keyword", keyword), ("subType", "AIRPORT,CITY")])
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            return Ok(None);
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        Ok(payload["data"][0]["iataCode"]
            .as_str()
            .map(|code| code.to_string()))
    }
}

/// Turn raw flight offers into [`Flight`]s. Offers that do not parse are
/// skipped rather than failing the whole response.
pub(crate) fn parse_offers(data: &Value) -> Vec<Flight> {
    let Some(offers) = data.as_array() else {
        return Vec::new();
    };

    let mut flights = Vec::new();
    for offer in offers {
        match parse_offer(offer) {
            Some(flight) => flights.push(flight),
            None => tracing::warn!("Failed to parse a flight offer, skipping"),
        }
    }
    flights
}

fn parse_offer(offer: &Value) -> Option<Flight> {
    let itinerary = offer["itineraries"].get(0)?;
    let segments = itinerary["segments"].as_array()?;
    let first = segments.first()?;
    let last = segments.last()?;

    let total_price: f64 = offer["price"]["total"].as_str()?.parse().ok()?;

    let carrier = first["carrierCode"].as_str()?;
    let number = first["number"].as_str()?;

    Some(Flight {
        flight_number: format!("{} {}", carrier, number),
        origin: first["departure"]["iataCode"].as_str()?.to_string(),
        origin_city: first["departure"]["cityName"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        destination: last["arrival"]["iataCode"].as_str()?.to_string(),
        destination_city: last["arrival"]["cityName"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        departure_time: format_time(first["departure"]["at"].as_str()?),
        arrival_time: format_time(last["arrival"]["at"].as_str()?),
        duration: format_duration(itinerary["duration"].as_str().unwrap_or_default()),
        aircraft: first["aircraft"]["code"]
            .as_str()
            .unwrap_or("Unknown")
            .to_string(),
        price_economy: total_price as i64,
        // Business fares are not in the offer; estimate from the total.
        price_business: (total_price * 2.5) as i64,
        available_seats: offer["numberOfBookableSeats"].as_i64().unwrap_or(9),
    })
}

/// `PT2H15M` -> `2h 15m`
pub(crate) fn format_duration(iso_duration: &str) -> String {
    let duration = iso_duration.trim_start_matches("PT");

    let mut hours = 0u32;
    let mut minutes = 0u32;
    let mut rest = duration;

    if let Some(pos) = rest.find('H') {
        hours = rest[..pos].parse().unwrap_or(0);
        rest = &rest[pos + 1..];
    }
    if let Some(pos) = rest.find('M') {
        minutes = rest[..pos].parse().unwrap_or(0);
    }

    format!("{}h {}m", hours, minutes)
}

/// `2024-12-26T09:30:00` (optionally with a zone) -> `09:30`
pub(crate) fn format_time(iso_time: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso_time) {
        return dt.format("%H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(iso_time, "%Y-%m-%dT%H:%M:%S") {
        return dt.format("%H:%M").to_string();
    }
    iso_time.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration("PT2H15M"), "2h 15m");
        assert_eq!(format_duration("PT45M"), "0h 45m");
        assert_eq!(format_duration("PT9H"), "9h 0m");
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time("2024-12-26T09:30:00"), "09:30");
        assert_eq!(format_time("2024-12-26T21:05:00+05:30"), "21:05");
        assert_eq!(format_time("not-a-time"), "not-a-time");
    }

    #[test]
    fn offers_parse_into_flights() {
        let data = json!([{
            "itineraries": [{
                "duration": "PT2H10M",
                "segments": [{
                    "carrierCode": "AI",
                    "number": "865",
                    "departure": {"iataCode": "DEL", "at": "2025-08-06T06:00:00"},
                    "arrival": {"iataCode": "BOM", "at": "2025-08-06T08:10:00"},
                    "aircraft": {"code": "32N"},
                }],
            }],
            "price": {"total": "4500.00"},
            "numberOfBookableSeats": 4,
        }]);

        let flights = parse_offers(&data);
        assert_eq!(flights.len(), 1);
        let flight = &flights[0];
        assert_eq!(flight.flight_number, "AI 865");
        assert_eq!(flight.origin, "DEL");
        assert_eq!(flight.departure_time, "06:00");
        assert_eq!(flight.duration, "2h 10m");
        assert_eq!(flight.price_economy, 4500);
        assert_eq!(flight.price_business, 11250);
        assert_eq!(flight.available_seats, 4);
    }

    #[test]
    fn malformed_offers_are_skipped() {
        let data = json!([
            {"itineraries": []},
            {
                "itineraries": [{
                    "duration": "PT1H30M",
                    "segments": [{
                        "carrierCode": "AI",
                        "number": "619",
                        "departure": {"iataCode": "BOM", "at": "2025-08-06T10:00:00"},
                        "arrival": {"iataCode": "BLR", "at": "2025-08-06T11:30:00"},
                    }],
                }],
                "price": {"total": "4000.00"},
            },
        ]);

        let flights = parse_offers(&data);
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].aircraft, "Unknown");
        assert_eq!(flights[0].available_seats, 9);
    }
}
