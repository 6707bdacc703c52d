//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use vscore_db::{DatabaseConfig, KnowledgeStore, MemoryStore, PgStore, VideoStore};
use vscore_media::{FfmpegFrameExtractor, HttpFetcher};
use vscore_ml_client::{AzureEmbeddingClient, AzureVisionClient, Embedder, VisionModel};
use vscore_storage::{MockUploadSigner, ObjectStoreSigner, UploadUrlSigner};
use vscore_worker::{AnalysisPipeline, PipelineConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub videos: Arc<dyn VideoStore>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub uploads: Arc<dyn UploadUrlSigner>,
    /// `None` when the embedding deployment is not configured
    pub embedder: Option<Arc<dyn Embedder>>,
    pub pipeline: AnalysisPipeline,
}

impl AppState {
    /// Build every collaborator from the environment.
    ///
    /// Missing database, storage or model settings fall back to local
    /// stand-ins with a warning; only a reachable-but-broken database is
    /// fatal.
    pub async fn from_env(
        config: ApiConfig,
        pipeline_config: PipelineConfig,
    ) -> anyhow::Result<Self> {
        let (videos, knowledge) = match DatabaseConfig::from_env() {
            Some(db_config) => split_store(Arc::new(PgStore::connect(&db_config).await?)),
            None => {
                warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
                split_store(Arc::new(MemoryStore::new()))
            }
        };

        let uploads: Arc<dyn UploadUrlSigner> = match ObjectStoreSigner::from_env() {
            Ok(signer) => {
                info!(bucket = signer.bucket(), "Object storage configured");
                Arc::new(signer)
            }
            Err(e) => {
                warn!("Object storage not configured ({}), issuing mock upload URLs", e);
                Arc::new(MockUploadSigner::from_env())
            }
        };

        let vision: Option<Arc<dyn VisionModel>> = match AzureVisionClient::from_env() {
            Ok(client) => {
                info!(deployment = client.deployment(), "Vision model configured");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!("Vision model not configured ({}), analysis runs will fail", e);
                None
            }
        };

        let embedder: Option<Arc<dyn Embedder>> = match AzureEmbeddingClient::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Embedding model not configured ({}), knowledge search disabled", e);
                None
            }
        };

        let fetcher = Arc::new(HttpFetcher::new(pipeline_config.download_timeout)?);
        let extractor = Arc::new(FfmpegFrameExtractor::new(
            pipeline_config.frame_width,
            pipeline_config.extract_timeout.as_secs(),
        ));
        let pipeline =
            AnalysisPipeline::new(pipeline_config, fetcher, extractor, vision, videos.clone());

        Ok(Self {
            config,
            videos,
            knowledge,
            uploads,
            embedder,
            pipeline,
        })
    }

    /// Stale-run sweeper bound to this state's store and pipeline settings.
    pub fn sweeper(&self) -> vscore_worker::StaleRunSweeper {
        let config = self.pipeline.config();
        vscore_worker::StaleRunSweeper::new(
            self.videos.clone(),
            config.stale_after,
            config.sweep_interval,
        )
    }
}

fn split_store<S>(store: Arc<S>) -> (Arc<dyn VideoStore>, Arc<dyn KnowledgeStore>)
where
    S: VideoStore + KnowledgeStore + 'static,
{
    let videos: Arc<dyn VideoStore> = store.clone();
    (videos, store)
}
