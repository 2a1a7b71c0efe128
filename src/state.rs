use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::auth::TokenKeys;
use crate::config::{AccessPolicy, Config, DEFAULT_PIPELINE_WORKERS};
use crate::db::Database;
use crate::generation::{GeminiClient, GenerationService, RetryPolicy, Sleeper, TokioSleeper};
use crate::pipeline::{ContentPipeline, JobQueue, PipelineConfig, DEFAULT_QUEUE_CAPACITY};

/// Shared handles injected into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub generator: Arc<dyn GenerationService>,
    pub sleeper: Arc<dyn Sleeper>,
    pub jobs: JobQueue,
    pub auth: Arc<TokenKeys>,
    pub access: AccessPolicy,
    pub refine_retry: RetryPolicy,
    pub cors_origins: Option<Vec<String>>,
}

/// Tunables for [`AppState::new`]. Tests shorten the timings here.
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub access: AccessPolicy,
    pub pipeline: PipelineConfig,
    pub refine_retry: RetryPolicy,
    pub workers: usize,
    pub queue_capacity: usize,
    pub cors_origins: Option<Vec<String>>,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            access: AccessPolicy::default(),
            pipeline: PipelineConfig::default(),
            refine_retry: RetryPolicy::interactive(),
            workers: DEFAULT_PIPELINE_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            cors_origins: None,
        }
    }
}

impl AppState {
    /// Build the state and start the content job worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        db: Database,
        generator: Arc<dyn GenerationService>,
        sleeper: Arc<dyn Sleeper>,
        auth: TokenKeys,
        options: StateOptions,
    ) -> (Self, JoinHandle<()>) {
        let pipeline = Arc::new(ContentPipeline::new(
            db.clone(),
            generator.clone(),
            sleeper.clone(),
            options.pipeline,
        ));
        let (jobs, worker) = JobQueue::start(pipeline, options.workers, options.queue_capacity);

        let state = Self {
            db,
            generator,
            sleeper,
            jobs,
            auth: Arc::new(auth),
            access: options.access,
            refine_retry: options.refine_retry,
            cors_origins: options.cors_origins,
        };
        (state, worker)
    }

    /// Production wiring from environment configuration.
    pub fn from_config(db: Database, config: &Config) -> Result<(Self, JoinHandle<()>)> {
        let secret = config
            .secret_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DOCGEN_SECRET_KEY must be set"))?;
        let auth = TokenKeys::new(secret, config.jwt_algorithm, config.token_ttl)?;
        let generator = GeminiClient::new(
            config.gemini.base_url.clone(),
            config.gemini.model.clone(),
            config.gemini.api_key.clone(),
        )?;

        Ok(Self::new(
            db,
            Arc::new(generator),
            Arc::new(TokioSleeper),
            auth,
            StateOptions {
                access: config.access_policy,
                workers: config.pipeline_workers,
                queue_capacity: config.queue_capacity,
                cors_origins: config.cors_origins.clone(),
                ..StateOptions::default()
            },
        ))
    }
}
