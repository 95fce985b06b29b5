//! Tools the model can call during a chat turn.
//!
//! Each tool is described to the provider as a JSON-schema function; the
//! executor returns display text. Tool failures become apologetic text
//! rather than errors so the turn can still complete.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::flights::FlightService;
use crate::llm::types::{ToolCall, ToolSpec};

pub const SEARCH_FLIGHTS: &str = "search_flights";
pub const GET_FLIGHT_DETAILS: &str = "get_flight_details";
pub const LOOKUP_IATA_CODE: &str = "lookup_iata_code";

#[derive(Clone)]
pub struct ToolRegistry {
    flights: Arc<FlightService>,
}

impl ToolRegistry {
    pub fn new(flights: Arc<FlightService>) -> Self {
        Self { flights }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: SEARCH_FLIGHTS.to_string(),
                description: "Search for Air India flights between two airports. \
                              Use when users ask about flight schedules, times, availability, or prices. \
                              CRITICAL: You MUST convert city names to 3-letter IATA airport codes. \
                              Examples: 'Beijing' -> 'PEK', 'Delhi' -> 'DEL', 'Mumbai' -> 'BOM', \
                              'London' -> 'LHR', 'New York' -> 'JFK', 'Tokyo' -> 'NRT'. \
                              Also convert dates like 'tomorrow' or 'January 2nd' to YYYY-MM-DD format."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "origin": {
                            "type": "string",
                            "description": "Origin airport as a 3-letter IATA code (REQUIRED), e.g. 'DEL', 'BOM', 'PEK'.",
                        },
                        "destination": {
                            "type": "string",
                            "description": "Destination airport as a 3-letter IATA code (REQUIRED), e.g. 'DEL', 'BOM', 'PEK'.",
                        },
                        "date": {
                            "type": "string",
                            "description": "Travel date: 'today', 'tomorrow', or YYYY-MM-DD. Defaults to 'tomorrow'.",
                        },
                    },
                    "required": ["origin", "destination"],
                }),
            },
            ToolSpec {
                name: GET_FLIGHT_DETAILS.to_string(),
                description: "Get detailed information about a specific Air India flight by flight number. \
                              Use when users ask about a specific flight like 'AI 865'."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "flight_number": {
                            "type": "string",
                            "description": "Air India flight number, e.g. 'AI 865', 'AI677', '865'. The 'AI' prefix is optional.",
                        },
                    },
                    "required": ["flight_number"],
                }),
            },
            ToolSpec {
                name: LOOKUP_IATA_CODE.to_string(),
                description: "Look up the 3-letter IATA airport code for a city or airport. \
                              Supports city names in multiple languages. \
                              Examples: 'Cancún' -> 'CUN', 'São Paulo' -> 'GRU', '北京' -> 'PEK'."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "city_name": {
                            "type": "string",
                            "description": "Name of the city or airport to look up, in any language.",
                        },
                    },
                    "required": ["city_name"],
                }),
            },
        ]
    }

    pub async fn execute(&self, call: &ToolCall) -> String {
        tracing::info!("Tool called: {}({})", call.name, call.arguments);
        match call.name.as_str() {
            SEARCH_FLIGHTS => self.search_flights(&call.arguments).await,
            GET_FLIGHT_DETAILS => self.get_flight_details(&call.arguments),
            LOOKUP_IATA_CODE => self.lookup_iata_code(&call.arguments).await,
            other => format!("Unknown tool: {}", other),
        }
    }

    async fn search_flights(&self, args: &Value) -> String {
        let origin = str_arg(args, "origin");
        let destination = str_arg(args, "destination");
        if origin.is_empty() || destination.is_empty() {
            return "Both origin and destination are required to search for flights.".to_string();
        }

        let date = match str_arg(args, "date").as_str() {
            "" | "any" | "tomorrow" => None,
            explicit => Some(explicit.to_string()),
        };

        match self
            .flights
            .search_flights(&origin, &destination, date.as_deref(), 10)
            .await
        {
            Ok(flights) if flights.is_empty() => format!(
                "No Air India flights found from {} to {}. \
                 Please check if the city names or airport codes are correct, \
                 or try a different route.",
                origin, destination
            ),
            Ok(flights) => self.flights.format_flights_list(&flights),
            Err(err) => {
                tracing::error!("search_flights tool failed: {}", err);
                format!(
                    "Sorry, I encountered an error while searching for flights: {}",
                    err
                )
            }
        }
    }

    fn get_flight_details(&self, args: &Value) -> String {
        let mut flight_number = str_arg(args, "flight_number");
        if flight_number.is_empty() {
            return "A flight number is required.".to_string();
        }
        if !flight_number.to_uppercase().starts_with("AI") {
            flight_number = format!("AI {}", flight_number);
        }

        match self.flights.get_flight_by_number(&flight_number) {
            Some(flight) => self.flights.format_flight_for_display(&flight),
            None => format!(
                "Flight {} not found. Please check the flight number.",
                flight_number
            ),
        }
    }

    async fn lookup_iata_code(&self, args: &Value) -> String {
        let city_name = str_arg(args, "city_name");
        if city_name.is_empty() {
            return "A city name is required.".to_string();
        }

        match self.flights.iata().lookup(&city_name).await {
            Some(code) => format!("The IATA airport code for {} is: {}", city_name, code),
            None => format!(
                "Could not find IATA code for '{}'. \
                 Please verify the city name spelling or try the official airport name.",
                city_name
            ),
        }
    }
}

fn str_arg(args: &Value, key: &str) -> String {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(FlightService::new(None, false)))
    }

    #[test]
    fn specs_cover_all_tools() {
        let specs = registry().specs();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![SEARCH_FLIGHTS, GET_FLIGHT_DETAILS, LOOKUP_IATA_CODE]
        );
        assert!(specs
            .iter()
            .all(|s| s.parameters["type"] == "object" && s.parameters["required"].is_array()));
    }

    #[tokio::test]
    async fn search_flights_formats_results() {
        let call = ToolCall {
            name: SEARCH_FLIGHTS.to_string(),
            arguments: json!({"origin": "DEL", "destination": "BOM"}),
        };
        let result = registry().execute(&call).await;
        assert!(result.contains("Found 4 flight(s)"));
        assert!(result.contains("AI 865"));
    }

    #[tokio::test]
    async fn search_flights_reports_unknown_route() {
        let call = ToolCall {
            name: SEARCH_FLIGHTS.to_string(),
            arguments: json!({"origin": "GOI", "destination": "DEL"}),
        };
        let result = registry().execute(&call).await;
        assert!(result.contains("No Air India flights found from GOI to DEL"));
    }

    #[tokio::test]
    async fn flight_details_normalizes_the_prefix() {
        let call = ToolCall {
            name: GET_FLIGHT_DETAILS.to_string(),
            arguments: json!({"flight_number": "865"}),
        };
        let result = registry().execute(&call).await;
        assert!(result.contains("AI 865"));
        assert!(result.contains("Delhi (DEL)"));
    }

    #[tokio::test]
    async fn iata_lookup_answers_in_prose() {
        let call = ToolCall {
            name: LOOKUP_IATA_CODE.to_string(),
            arguments: json!({"city_name": "Londres"}),
        };
        let result = registry().execute(&call).await;
        assert!(result.contains("LHR"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let call = ToolCall {
            name: "book_hotel".to_string(),
            arguments: json!({}),
        };
        assert_eq!(registry().execute(&call).await, "Unknown tool: book_hotel");
    }

    #[tokio::test]
    async fn missing_arguments_do_not_panic() {
        let call = ToolCall {
            name: SEARCH_FLIGHTS.to_string(),
            arguments: Value::Null,
        };
        let result = registry().execute(&call).await;
        assert!(result.contains("origin and destination are required"));
    }
}
