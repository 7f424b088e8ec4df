use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use fable_core::reconcile::AssetSnapshot;
use fable_core::types::Scene;
use fable_events::EventBus;
use fable_llm::LlmClient;
use fable_provider::{AssetReconciler, DatasetUploader, JobSubmitter, ProviderApi};

use crate::config::ServerConfig;

/// The story being authored and its derived scenes.
#[derive(Debug, Clone, Default)]
pub struct StoryState {
    pub text: String,
    pub scenes: Vec<Scene>,
}

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Provider REST client (shared connection pool).
    pub provider: Arc<ProviderApi>,
    /// Single-attempt job submitter.
    pub submitter: Arc<JobSubmitter>,
    /// Asset snapshot reconciler.
    pub reconciler: Arc<AssetReconciler>,
    /// Training image uploader.
    pub uploader: Arc<DatasetUploader>,
    /// Chat-completions client.
    pub llm: Arc<LlmClient>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<EventBus>,
    /// Last applied asset snapshot.
    pub snapshot: Arc<RwLock<AssetSnapshot>>,
    /// Serializes reconciliation passes so two racing refreshes cannot both
    /// diff against the same previous snapshot.
    pub reconcile_lock: Arc<Mutex<()>>,
    /// The current story text and scenes.
    pub story: Arc<RwLock<StoryState>>,
    /// Cancelled at shutdown to stop in-flight polling loops.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire up the full state from configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        let provider = Arc::new(ProviderApi::new(
            &config.provider_base_url,
            &config.provider_api_key,
        ));
        let llm = Arc::new(LlmClient::new(&config.llm_base_url, &config.llm_api_key));

        Self {
            submitter: Arc::new(JobSubmitter::new(Arc::clone(&provider))),
            reconciler: Arc::new(AssetReconciler::new(Arc::clone(&provider))),
            uploader: Arc::new(DatasetUploader::new(Arc::clone(&provider))),
            provider,
            llm,
            event_bus: Arc::new(EventBus::default()),
            snapshot: Arc::new(RwLock::new(AssetSnapshot::default())),
            reconcile_lock: Arc::new(Mutex::new(())),
            story: Arc::new(RwLock::new(StoryState::default())),
            shutdown: CancellationToken::new(),
            config: Arc::new(config),
        }
    }
}
