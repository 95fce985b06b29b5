//! City name to IATA code resolution.
//!
//! Hybrid strategy: local multilingual table first, 3-letter codes pass
//! through untouched, and unknown names fall back to the Amadeus location
//! API. Remote hits are cached for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::amadeus::AmadeusClient;

// City and airport names in English plus the aliases the assistant sees in
// practice (Spanish, Hindi, historic names).
const IATA_TABLE: &[(&str, &str)] = &[
    // India
    ("delhi", "DEL"),
    ("new delhi", "DEL"),
    ("nueva delhi", "DEL"),
    ("दिल्ली", "DEL"),
    ("नई दिल्ली", "DEL"),
    ("mumbai", "BOM"),
    ("bombay", "BOM"),
    ("मुंबई", "BOM"),
    ("bangalore", "BLR"),
    ("bengaluru", "BLR"),
    ("बेंगलुरु", "BLR"),
    ("chennai", "MAA"),
    ("madras", "MAA"),
    ("kolkata", "CCU"),
    ("calcutta", "CCU"),
    ("hyderabad", "HYD"),
    ("goa", "GOI"),
    ("गोवा", "GOI"),
    ("pune", "PNQ"),
    ("ahmedabad", "AMD"),
    ("jaipur", "JAI"),
    ("kochi", "COK"),
    ("cochin", "COK"),
    ("lucknow", "LKO"),
    ("amritsar", "ATQ"),
    ("varanasi", "VNS"),
    // East Asia
    ("tokyo", "NRT"),
    ("tokio", "NRT"),
    ("東京", "NRT"),
    ("osaka", "KIX"),
    ("beijing", "PEK"),
    ("pekín", "PEK"),
    ("北京", "PEK"),
    ("shanghai", "PVG"),
    ("上海", "PVG"),
    ("hong kong", "HKG"),
    ("香港", "HKG"),
    ("seoul", "ICN"),
    ("서울", "ICN"),
    // Southeast Asia
    ("singapore", "SIN"),
    ("singapur", "SIN"),
    ("kuala lumpur", "KUL"),
    ("bangkok", "BKK"),
    ("jakarta", "CGK"),
    ("bali", "DPS"),
    ("denpasar", "DPS"),
    // Middle East
    ("dubai", "DXB"),
    ("dubái", "DXB"),
    ("دبي", "DXB"),
    ("abu dhabi", "AUH"),
    ("doha", "DOH"),
    ("riyadh", "RUH"),
    ("jeddah", "JED"),
    ("muscat", "MCT"),
    ("tel aviv", "TLV"),
    // Europe
    ("london", "LHR"),
    ("londres", "LHR"),
    ("लंदन", "LHR"),
    ("paris", "CDG"),
    ("parís", "CDG"),
    ("frankfurt", "FRA"),
    ("amsterdam", "AMS"),
    ("madrid", "MAD"),
    ("barcelona", "BCN"),
    ("rome", "FCO"),
    ("roma", "FCO"),
    ("milan", "MXP"),
    ("zurich", "ZRH"),
    ("vienna", "VIE"),
    ("berlin", "BER"),
    ("munich", "MUC"),
    ("brussels", "BRU"),
    ("lisbon", "LIS"),
    ("lisboa", "LIS"),
    ("dublin", "DUB"),
    ("moscow", "SVO"),
    ("москва", "SVO"),
    ("copenhagen", "CPH"),
    ("stockholm", "ARN"),
    ("istanbul", "IST"),
    // North America
    ("new york", "JFK"),
    ("nueva york", "JFK"),
    ("newark", "EWR"),
    ("los angeles", "LAX"),
    ("chicago", "ORD"),
    ("san francisco", "SFO"),
    ("miami", "MIA"),
    ("washington", "IAD"),
    ("boston", "BOS"),
    ("seattle", "SEA"),
    ("toronto", "YYZ"),
    ("vancouver", "YVR"),
    // Oceania
    ("sydney", "SYD"),
    ("sídney", "SYD"),
    ("melbourne", "MEL"),
    ("auckland", "AKL"),
];

pub struct IataService {
    amadeus: Option<Arc<AmadeusClient>>,
    resolved: RwLock<HashMap<String, String>>,
}

impl IataService {
    pub fn new(amadeus: Option<Arc<AmadeusClient>>) -> Self {
        Self {
            amadeus,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Look up the IATA code for a city name in any supported language.
    pub async fn lookup(&self, city_name: &str) -> Option<String> {
        let normalized = city_name.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(code) = local_lookup(&normalized) {
            tracing::debug!("IATA found locally: {} -> {}", city_name, code);
            return Some(code.to_string());
        }

        if normalized.chars().count() == 3 && normalized.chars().all(|c| c.is_ascii_alphabetic()) {
            return Some(normalized.to_uppercase());
        }

        if let Some(code) = self.resolved.read().await.get(&normalized) {
            return Some(code.clone());
        }

        if let Some(amadeus) = &self.amadeus {
            match amadeus.lookup_location(city_name).await {
                Ok(Some(code)) => {
                    tracing::info!("IATA from Amadeus: {} -> {}", city_name, code);
                    self.resolved
                        .write()
                        .await
                        .insert(normalized, code.clone());
                    return Some(code);
                }
                Ok(None) => {}
                Err(err) => tracing::warn!("Amadeus IATA lookup failed: {}", err),
            }
        }

        tracing::warn!("IATA code not found for: {}", city_name);
        None
    }

    /// Reverse lookup: a display city name for a code, if we know it.
    pub fn city_name(&self, iata_code: &str) -> Option<String> {
        let code = iata_code.to_uppercase();
        IATA_TABLE
            .iter()
            .find(|(name, c)| *c == code && name.is_ascii())
            .map(|(name, _)| title_case(name))
    }
}

fn local_lookup(normalized: &str) -> Option<&'static str> {
    IATA_TABLE
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, code)| *code)
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_table_resolves_aliases() {
        let service = IataService::new(None);
        assert_eq!(service.lookup("Delhi").await, Some("DEL".to_string()));
        assert_eq!(service.lookup("Bombay").await, Some("BOM".to_string()));
        assert_eq!(service.lookup("Londres").await, Some("LHR".to_string()));
        assert_eq!(service.lookup("東京").await, Some("NRT".to_string()));
        assert_eq!(service.lookup("दिल्ली").await, Some("DEL".to_string()));
    }

    #[tokio::test]
    async fn three_letter_codes_pass_through() {
        let service = IataService::new(None);
        assert_eq!(service.lookup("blr").await, Some("BLR".to_string()));
        assert_eq!(service.lookup("JFK").await, Some("JFK".to_string()));
    }

    #[tokio::test]
    async fn unknown_city_without_amadeus_is_none() {
        let service = IataService::new(None);
        assert_eq!(service.lookup("atlantis").await, None);
        assert_eq!(service.lookup("").await, None);
    }

    #[test]
    fn reverse_lookup_prefers_ascii_names() {
        let service = IataService::new(None);
        assert_eq!(service.city_name("DEL"), Some("Delhi".to_string()));
        assert_eq!(service.city_name("ZZZ"), None);
    }
}
