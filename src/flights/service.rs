//! Flight search orchestration.
//!
//! Resolves locations and dates, asks Amadeus when it is configured and
//! enabled, and falls back to the mock schedule on any failure so the
//! assistant always has something to say about a route.

use std::sync::Arc;

use chrono::{Duration, Local};

use super::amadeus::AmadeusClient;
use super::iata::IataService;
use super::{data, Flight};
use crate::core::errors::ApiError;

pub struct FlightService {
    mock_flights: Vec<Flight>,
    amadeus: Option<Arc<AmadeusClient>>,
    iata: IataService,
    use_real_api: bool,
}

impl FlightService {
    pub fn new(amadeus: Option<Arc<AmadeusClient>>, use_real_api: bool) -> Self {
        let mock_flights = data::all_flights();
        tracing::info!(
            "FlightService initialized with {} mock flights (real API: {})",
            mock_flights.len(),
            use_real_api && amadeus.is_some()
        );
        Self {
            iata: IataService::new(amadeus.clone()),
            mock_flights,
            amadeus,
            use_real_api,
        }
    }

    pub fn iata(&self) -> &IataService {
        &self.iata
    }

    pub async fn search_flights(
        &self,
        origin: &str,
        destination: &str,
        date: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Flight>, ApiError> {
        let origin_code = self.resolve_location(origin).await;
        let dest_code = self.resolve_location(destination).await;
        let departure_date = resolve_date(date);

        tracing::info!(
            "Searching flights: {} -> {} on {}",
            origin_code,
            dest_code,
            departure_date
        );

        if self.use_real_api {
            if let Some(amadeus) = &self.amadeus {
                match amadeus
                    .search_flight_offers(&origin_code, &dest_code, &departure_date, 1, max_results)
                    .await
                {
                    Ok(flights) if !flights.is_empty() => {
                        return Ok(sorted_and_limited(flights, max_results))
                    }
                    Ok(_) => {
                        tracing::info!("Amadeus returned no offers, using mock schedule");
                    }
                    Err(err) => {
                        tracing::warn!("Amadeus search failed, using mock schedule: {}", err);
                    }
                }
            }
        }

        let matching: Vec<Flight> = self
            .mock_flights
            .iter()
            .filter(|f| f.origin == origin_code && f.destination == dest_code)
            .cloned()
            .collect();

        if matching.is_empty() {
            tracing::info!("No flights found for route {} -> {}", origin_code, dest_code);
        }
        Ok(sorted_and_limited(matching, max_results))
    }

    pub fn get_flight_by_number(&self, flight_number: &str) -> Option<Flight> {
        let wanted = flight_number.trim().to_uppercase();
        self.mock_flights
            .iter()
            .find(|f| f.flight_number.to_uppercase() == wanted)
            .cloned()
    }

    async fn resolve_location(&self, location: &str) -> String {
        match self.iata.lookup(location).await {
            Some(code) => code,
            // unknown input passes through uppercased
            None => location.trim().to_uppercase(),
        }
    }

    pub fn format_flight_for_display(&self, flight: &Flight) -> String {
        format!(
            "✈️ **{}** - {} ({}) → {} ({})\n   ⏰ {} - {} ({})\n   💺 {}\n   💰 Economy: ₹{} | Business: ₹{}",
            flight.flight_number,
            flight.origin_city,
            flight.origin,
            flight.destination_city,
            flight.destination,
            flight.departure_time,
            flight.arrival_time,
            flight.duration,
            flight.aircraft,
            group_thousands(flight.price_economy),
            group_thousands(flight.price_business),
        )
    }

    pub fn format_flights_list(&self, flights: &[Flight]) -> String {
        if flights.is_empty() {
            return "No flights found for this route.".to_string();
        }

        let mut output = format!("Found {} flight(s):\n\n", flights.len());
        for flight in flights {
            output.push_str(&self.format_flight_for_display(flight));
            output.push_str("\n\n");
        }
        output.trim_end().to_string()
    }
}

fn sorted_and_limited(mut flights: Vec<Flight>, max_results: usize) -> Vec<Flight> {
    flights.sort_by(|a, b| a.departure_time.cmp(&b.departure_time));
    flights.truncate(max_results);
    flights
}

/// Resolve `today` / `tomorrow` / `YYYY-MM-DD` to a concrete date string.
/// No date means tomorrow.
pub(crate) fn resolve_date(date: Option<&str>) -> String {
    let today = Local::now().date_naive();
    match date.map(|d| d.trim().to_lowercase()) {
        None => (today + Duration::days(1)).format("%Y-%m-%d").to_string(),
        Some(keyword) if keyword.is_empty() || keyword == "any" || keyword == "tomorrow" => {
            (today + Duration::days(1)).format("%Y-%m-%d").to_string()
        }
        Some(keyword) if keyword == "today" => today.format("%Y-%m-%d").to_string(),
        Some(explicit) => explicit,
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.to_string();
    let mut grouped = String::new();
    for (index, c) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> FlightService {
        FlightService::new(None, false)
    }

    #[tokio::test]
    async fn search_matches_route_in_order() {
        let flights = service()
            .search_flights("Delhi", "Mumbai", None, 10)
            .await
            .unwrap();

        assert_eq!(flights.len(), 4);
        assert_eq!(flights[0].flight_number, "AI 865");
        assert!(flights.windows(2).all(|w| w[0].departure_time <= w[1].departure_time));
    }

    #[tokio::test]
    async fn search_respects_max_results() {
        let flights = service()
            .search_flights("DEL", "BOM", Some("today"), 2)
            .await
            .unwrap();
        assert_eq!(flights.len(), 2);
    }

    #[tokio::test]
    async fn unknown_route_returns_empty() {
        let flights = service()
            .search_flights("Goa", "Delhi", None, 10)
            .await
            .unwrap();
        assert!(flights.is_empty());
    }

    #[tokio::test]
    async fn aliases_resolve_before_matching() {
        let flights = service()
            .search_flights("Bombay", "दिल्ली", None, 10)
            .await
            .unwrap();
        assert!(!flights.is_empty());
        assert!(flights.iter().all(|f| f.origin == "BOM" && f.destination == "DEL"));
    }

    #[test]
    fn flight_lookup_is_case_insensitive() {
        let service = service();
        assert!(service.get_flight_by_number("ai 865").is_some());
        assert!(service.get_flight_by_number(" AI 677 ").is_some());
        assert!(service.get_flight_by_number("AI 999").is_none());
    }

    #[test]
    fn date_keywords_resolve() {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let tomorrow = (Local::now().date_naive() + Duration::days(1))
            .format("%Y-%m-%d")
            .to_string();

        assert_eq!(resolve_date(Some("today")), today);
        assert_eq!(resolve_date(Some("tomorrow")), tomorrow);
        assert_eq!(resolve_date(Some("any")), tomorrow);
        assert_eq!(resolve_date(None), tomorrow);
        assert_eq!(resolve_date(Some("2025-12-31")), "2025-12-31");
    }

    #[test]
    fn list_formatting_includes_prices() {
        let service = service();
        let flight = service.get_flight_by_number("AI 865").unwrap();
        let text = service.format_flights_list(&[flight]);

        assert!(text.starts_with("Found 1 flight(s):"));
        assert!(text.contains("₹4,500"));
        assert!(text.contains("Delhi (DEL) → Mumbai (BOM)"));
    }

    #[test]
    fn empty_list_has_friendly_message() {
        assert_eq!(
            service().format_flights_list(&[]),
            "No flights found for this route."
        );
    }
}
