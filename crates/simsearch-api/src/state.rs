//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! The pipeline and search service are generic over the port traits; AppState
//! pins them to the Google Cloud clients from simsearch-infra.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use simsearch_core::pipeline::{PipelineOrchestrator, TaskPoller};
use simsearch_core::search::SearchService;
use simsearch_infra::bigquery::BigQueryClient;
use simsearch_infra::config::load_app_config;
use simsearch_infra::earthengine::EarthEngineClient;
use simsearch_infra::google::GoogleApi;
use simsearch_infra::plots::GeoJsonPlotReader;
use simsearch_types::config::AppConfig;
use simsearch_types::table::DatasetRef;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteOrchestrator =
    PipelineOrchestrator<GeoJsonPlotReader, EarthEngineClient, BigQueryClient>;

pub type ConcreteSearchService = SearchService<BigQueryClient>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Dataset every table is written to and searched in.
    pub target: DatasetRef,
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub search_service: Arc<ConcreteSearchService>,
    /// Cancelled on shutdown; background preparation runs observe it.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Load configuration and wire services.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_app_config(config_path).await?;
        Self::from_config(config)
    }

    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        if config.gcp.access_token.is_none() {
            tracing::warn!("GCP_ACCESS_TOKEN is not set; Google API calls will be unauthenticated");
        }
        let api = GoogleApi::new(config.gcp.access_token.as_ref())?;

        let compute = Arc::new(EarthEngineClient::new(
            api.clone(),
            &config.earthengine,
            config.gcp.project.clone(),
        ));
        let warehouse = Arc::new(BigQueryClient::new(api.clone(), &config.bigquery));
        let reader = Arc::new(GeoJsonPlotReader::new(api, &config.storage));

        let orchestrator = PipelineOrchestrator::new(
            reader,
            compute,
            warehouse.clone(),
            TaskPoller::from_config(&config.polling),
        );
        let search_service = SearchService::new(warehouse);

        Ok(Self {
            target: DatasetRef::new(config.gcp.project.clone(), config.gcp.bq_dataset.clone()),
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            search_service: Arc::new(search_service),
            shutdown: CancellationToken::new(),
        })
    }

    /// Resolve a plot file reference from an API request.
    ///
    /// A bare object name (no scheme, no path) is looked up in the configured
    /// bucket; anything else is used as given.
    pub fn resolve_plot_source(&self, file: &str) -> String {
        resolve_plot_source(file, self.config.gcp.bucket.as_deref())
    }
}

fn resolve_plot_source(file: &str, bucket: Option<&str>) -> String {
    let bare = !file.contains("://") && !file.contains(['/', '\\']);
    match bucket {
        Some(bucket) if bare => format!("gs://{bucket}/{file}"),
        _ => file.to_string(),
    }
}
