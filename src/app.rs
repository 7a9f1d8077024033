//! Wiring of the process-wide pipeline from configuration

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::llm::{create_provider, ConcurrencyGate, LlmError, RateLimitedClient};
use crate::pipeline::Orchestrator;
use crate::progress::ProgressStore;
use crate::store::{ArtifactStore, FallbackCache, MessageDbArtifactStore};

/// Build the orchestrator and its collaborators
///
/// An unreachable database is not fatal: the service starts memory-only and
/// reports it in health output.
pub async fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator, LlmError> {
    let provider = create_provider(&config.provider)?;
    if config.provider.is_configured() {
        info!(model = %config.provider.model, base_url = %config.provider.base_url, "provider configured");
    } else {
        warn!("OPENAI_API_KEY not set; every unit will fail as provider_unavailable");
    }

    let gate = ConcurrencyGate::new(config.pipeline.concurrency_limit);
    let client = RateLimitedClient::new(provider, gate, config.pipeline.unit_timeout);

    let durable: Option<Arc<dyn ArtifactStore>> = match &config.store {
        Some(store_config) => match MessageDbArtifactStore::connect(store_config).await {
            Ok(store) => {
                info!(schema = %store_config.schema_name, "artifact store connected");
                Some(Arc::new(store))
            }
            Err(e) => {
                warn!(error = %e, "artifact store unavailable, artifacts kept in memory only");
                None
            }
        },
        None => {
            info!("DATABASE_URL not set, artifacts kept in memory only");
            None
        }
    };
    let cache = FallbackCache::new(durable, config.pipeline.memory_cache_capacity);

    let progress = ProgressStore::new(config.pipeline.retention);
    let orchestrator = Orchestrator::new(client, progress, cache, &config.pipeline);
    orchestrator.start_reaper(config.pipeline.sweep_interval);

    info!(
        concurrency_limit = config.pipeline.concurrency_limit,
        retention_secs = config.pipeline.retention.as_secs(),
        "generation pipeline ready"
    );
    Ok(orchestrator)
}
