use std::sync::Arc;

use serde_json::Value;

use crate::chat::ChatService;
use crate::core::config::{settings, AppPaths, ConfigService};
use crate::flights::amadeus::AmadeusClient;
use crate::flights::FlightService;
use crate::llm::LlmManager;
use crate::memory::MemoryService;
use crate::rag::{PolicyStore, Retriever};
use crate::tools::ToolRegistry;

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Holds the configuration snapshot taken at startup plus the services the
/// handlers talk to: LLM dispatch, chat orchestration, flight search, and
/// (when Postgres is reachable) the policy vector store.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config_service: ConfigService,
    pub config: Value,
    pub llm: LlmManager,
    pub memory: MemoryService,
    pub flights: Arc<FlightService>,
    pub policies: Option<Arc<PolicyStore>>,
    pub chat: ChatService,
}

impl AppState {
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());
        let config = config_service
            .load_config()
            .map_err(|e| InitializationError::Config(e.to_string()))?;

        let llm = LlmManager::from_config(&config_service, &config);

        let amadeus = build_amadeus(&config_service, &config);
        let flights = Arc::new(FlightService::new(
            amadeus,
            settings::use_real_flight_api(&config),
        ));

        let policies = match PolicyStore::connect(
            &settings::database_url(&config),
            &settings::rag_collection(&config),
            settings::embedding_dimension(&config),
        )
        .await
        {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                tracing::warn!(
                    "Policy store unavailable, chat will answer without RAG context: {}",
                    err
                );
                None
            }
        };

        let retriever = policies
            .clone()
            .map(|store| Retriever::new(store, llm.clone(), settings::rag_top_k(&config)));

        let memory = MemoryService::new(settings::memory_ttl_minutes(&config));
        let tools = ToolRegistry::new(flights.clone());
        let chat = ChatService::new(
            llm.clone(),
            memory.clone(),
            retriever,
            tools,
            settings::history_limit(&config),
        );

        Ok(Arc::new(AppState {
            paths,
            config_service,
            config,
            llm,
            memory,
            flights,
            policies,
            chat,
        }))
    }
}

fn build_amadeus(config_service: &ConfigService, config: &Value) -> Option<Arc<AmadeusClient>> {
    let api_key = config_service.secret(config, "flights.amadeus_api_key", "AMADEUS_API_KEY");
    let api_secret =
        config_service.secret(config, "flights.amadeus_api_secret", "AMADEUS_API_SECRET");

    match (api_key, api_secret) {
        (Some(key), Some(secret)) => Some(Arc::new(AmadeusClient::new(
            key,
            secret,
            settings::amadeus_test_env(config),
            settings::flight_api_timeout_secs(config),
        ))),
        _ => {
            tracing::warn!(
                "Amadeus API credentials not configured, flight search uses the mock schedule"
            );
            None
        }
    }
}
