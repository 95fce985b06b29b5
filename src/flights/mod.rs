pub mod amadeus;
pub mod data;
pub mod iata;
pub mod service;

use serde::{Deserialize, Serialize};

pub use service::FlightService;

/// A flight as presented to the API and the chat tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub flight_number: String,
    pub origin: String,
    pub origin_city: String,
    pub destination: String,
    pub destination_city: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
    pub aircraft: String,
    pub price_economy: i64,
    pub price_business: i64,
    pub available_seats: i64,
}
