//! Mock Air India flight table.
//!
//! Realistic schedule data used whenever the Amadeus API is unconfigured or
//! fails; the shape matches what the live API parser produces.

use super::Flight;

const DEFAULT_SEATS: i64 = 9;

struct FlightRow {
    flight_number: &'static str,
    origin: &'static str,
    origin_city: &'static str,
    destination: &'static str,
    destination_city: &'static str,
    departure_time: &'static str,
    arrival_time: &'static str,
    duration: &'static str,
    aircraft: &'static str,
    price_economy: i64,
    price_business: i64,
}

const FLIGHTS: &[FlightRow] = &[
    // Delhi - Mumbai (high frequency)
    FlightRow { flight_number: "AI 865", origin: "DEL", origin_city: "Delhi", destination: "BOM", destination_city: "Mumbai", departure_time: "06:00", arrival_time: "08:10", duration: "2h 10m", aircraft: "Airbus A320", price_economy: 4500, price_business: 12000 },
    FlightRow { flight_number: "AI 677", origin: "DEL", origin_city: "Delhi", destination: "BOM", destination_city: "Mumbai", departure_time: "09:30", arrival_time: "11:45", duration: "2h 15m", aircraft: "Boeing 787", price_economy: 5200, price_business: 14000 },
    FlightRow { flight_number: "AI 863", origin: "DEL", origin_city: "Delhi", destination: "BOM", destination_city: "Mumbai", departure_time: "14:15", arrival_time: "16:30", duration: "2h 15m", aircraft: "Airbus A320", price_economy: 4800, price_business: 13000 },
    FlightRow { flight_number: "AI 805", origin: "DEL", origin_city: "Delhi", destination: "BOM", destination_city: "Mumbai", departure_time: "18:00", arrival_time: "20:15", duration: "2h 15m", aircraft: "Airbus A321", price_economy: 5500, price_business: 15000 },
    // Mumbai - Delhi
    FlightRow { flight_number: "AI 866", origin: "BOM", origin_city: "Mumbai", destination: "DEL", destination_city: "Delhi", departure_time: "07:00", arrival_time: "09:15", duration: "2h 15m", aircraft: "Airbus A320", price_economy: 4600, price_business: 12500 },
    FlightRow { flight_number: "AI 678", origin: "BOM", origin_city: "Mumbai", destination: "DEL", destination_city: "Delhi", departure_time: "12:00", arrival_time: "14:20", duration: "2h 20m", aircraft: "Boeing 787", price_economy: 5300, price_business: 14500 },
    // Delhi - Bangalore
    FlightRow { flight_number: "AI 503", origin: "DEL", origin_city: "Delhi", destination: "BLR", destination_city: "Bangalore", departure_time: "08:00", arrival_time: "10:45", duration: "2h 45m", aircraft: "Airbus A320", price_economy: 5500, price_business: 15000 },
    FlightRow { flight_number: "AI 807", origin: "DEL", origin_city: "Delhi", destination: "BLR", destination_city: "Bangalore", departure_time: "15:30", arrival_time: "18:15", duration: "2h 45m", aircraft: "Airbus A321", price_economy: 6000, price_business: 16000 },
    // Mumbai - Bangalore
    FlightRow { flight_number: "AI 619", origin: "BOM", origin_city: "Mumbai", destination: "BLR", destination_city: "Bangalore", departure_time: "10:00", arrival_time: "11:30", duration: "1h 30m", aircraft: "Airbus A320", price_economy: 4000, price_business: 11000 },
    FlightRow { flight_number: "AI 623", origin: "BOM", origin_city: "Mumbai", destination: "BLR", destination_city: "Bangalore", departure_time: "16:45", arrival_time: "18:15", duration: "1h 30m", aircraft: "Airbus A320", price_economy: 4200, price_business: 11500 },
    // Mumbai - Goa
    FlightRow { flight_number: "AI 631", origin: "BOM", origin_city: "Mumbai", destination: "GOI", destination_city: "Goa", departure_time: "09:00", arrival_time: "10:15", duration: "1h 15m", aircraft: "Airbus A319", price_economy: 3500, price_business: 9000 },
    FlightRow { flight_number: "AI 635", origin: "BOM", origin_city: "Mumbai", destination: "GOI", destination_city: "Goa", departure_time: "14:30", arrival_time: "15:45", duration: "1h 15m", aircraft: "Airbus A319", price_economy: 3800, price_business: 9500 },
    // International
    FlightRow { flight_number: "AI 161", origin: "DEL", origin_city: "Delhi", destination: "LHR", destination_city: "London", departure_time: "02:00", arrival_time: "07:15", duration: "9h 15m", aircraft: "Boeing 787-8", price_economy: 45000, price_business: 180000 },
    FlightRow { flight_number: "AI 101", origin: "DEL", origin_city: "Delhi", destination: "JFK", destination_city: "New York", departure_time: "11:30", arrival_time: "15:00", duration: "15h 30m", aircraft: "Boeing 777-300ER", price_economy: 65000, price_business: 250000 },
    FlightRow { flight_number: "AI 971", origin: "BOM", origin_city: "Mumbai", destination: "DXB", destination_city: "Dubai", departure_time: "04:00", arrival_time: "06:15", duration: "3h 15m", aircraft: "Airbus A320", price_economy: 18000, price_business: 65000 },
    FlightRow { flight_number: "AI 975", origin: "BOM", origin_city: "Mumbai", destination: "DXB", destination_city: "Dubai", departure_time: "21:00", arrival_time: "23:15", duration: "3h 15m", aircraft: "Airbus A321", price_economy: 19000, price_business: 68000 },
    FlightRow { flight_number: "AI 381", origin: "DEL", origin_city: "Delhi", destination: "SIN", destination_city: "Singapore", departure_time: "23:00", arrival_time: "07:30", duration: "6h 30m", aircraft: "Boeing 787-8", price_economy: 35000, price_business: 140000 },
];

pub fn all_flights() -> Vec<Flight> {
    FLIGHTS
        .iter()
        .map(|row| Flight {
            flight_number: row.flight_number.to_string(),
            origin: row.origin.to_string(),
            origin_city: row.origin_city.to_string(),
            destination: row.destination.to_string(),
            destination_city: row.destination_city.to_string(),
            departure_time: row.departure_time.to_string(),
            arrival_time: row.arrival_time.to_string(),
            duration: row.duration.to_string(),
            aircraft: row.aircraft.to_string(),
            price_economy: row.price_economy,
            price_business: row.price_business,
            available_seats: DEFAULT_SEATS,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_both_directions_for_del_bom() {
        let flights = all_flights();
        assert!(flights.iter().any(|f| f.origin == "DEL" && f.destination == "BOM"));
        assert!(flights.iter().any(|f| f.origin == "BOM" && f.destination == "DEL"));
    }

    #[test]
    fn all_flights_carry_ai_numbers() {
        assert!(all_flights().iter().all(|f| f.flight_number.starts_with("AI ")));
    }
}
