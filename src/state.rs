use std::sync::Arc;

use thiserror::Error;

use crate::completion::Completer;
use crate::core::config::{AppConfig, ConfigError};
use crate::documents::DocumentStage;
use crate::pipeline::rewrite::QueryRewriter;
use crate::pipeline::ChatPipeline;
use crate::retrieval::ChunkRetriever;
use crate::session::SessionManager;
use crate::warehouse::{GatewayError, HttpGateway, SqlGateway};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to connect to the warehouse: {0}")]
    Connect(#[from] GatewayError),
}

/// Shared application state: one warehouse session, the turn pipeline, and
/// the in-memory session registry.
pub struct AppState {
    pub config: AppConfig,
    pub gateway: Arc<HttpGateway>,
    pub pipeline: ChatPipeline,
    pub documents: DocumentStage,
    pub sessions: SessionManager,
}

impl AppState {
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let config = AppConfig::from_env()?;
        let gateway = Arc::new(HttpGateway::connect(&config.warehouse, config.request_timeout).await?);
        Ok(Self::with_gateway(config, gateway))
    }

    pub fn with_gateway(config: AppConfig, gateway: Arc<HttpGateway>) -> Arc<Self> {
        let sql: Arc<dyn SqlGateway> = gateway.clone();

        let retriever = ChunkRetriever::new(
            sql.clone(),
            config.chunk_table.clone(),
            config.embedding_function.clone(),
            config.embedding_model.clone(),
        );
        let completer = Completer::new(
            sql.clone(),
            config.completion_function.clone(),
            config.models.clone(),
        );
        let rewriter = QueryRewriter::new(config.rewrite_model.clone());
        let documents = DocumentStage::new(sql, config.stage.clone());

        let pipeline = ChatPipeline::new(
            retriever,
            completer,
            rewriter,
            documents.clone(),
            config.top_k,
            config.slide_window,
            config.single_shot,
        );

        Arc::new(AppState {
            config,
            gateway,
            pipeline,
            documents,
            sessions: SessionManager::new(),
        })
    }
}
