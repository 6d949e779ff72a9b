//! Application startup and lifecycle management.
//!
//! Wires the storage, image store, provider, and pipeline together and
//! exposes the HTTP surface.

use crate::config::MentorConfig;
use crate::handlers;
use crate::services::completion::{CompletionEngine, CompletionSettings};
use crate::services::context::{ContextLimits, ContextRetriever};
use crate::services::memory::{MemoryPolicy, MemorySummarizer};
use crate::services::pipeline::ChatPipeline;
use crate::services::providers::openai::{OpenAiChatProvider, OpenAiConfig};
use crate::services::providers::ChatProvider;
use crate::services::tasks::{TaskQueue, TaskRunner};
use crate::services::title::TitleGenerator;
use crate::services::{ConversationStore, ImageStore, LocalImageStore, MongoDb};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use service_core::error::AppError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const TASK_QUEUE_CAPACITY: usize = 64;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: MentorConfig,
    pub db: MongoDb,
    pub images: Arc<LocalImageStore>,
    pub provider: Arc<dyn ChatProvider>,
    pub pipeline: Arc<ChatPipeline>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: MentorConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let images = Arc::new(LocalImageStore::new(&config.images).await.map_err(|e| {
            tracing::error!(
                "Failed to initialize image store at {}: {}",
                config.images.local_path,
                e
            );
            e
        })?);

        let provider: Arc<dyn ChatProvider> = Arc::new(OpenAiChatProvider::new(OpenAiConfig {
            api_key: config.openai.api_key.clone(),
            api_base: config.openai.api_base.clone(),
        }));

        tracing::info!(
            chat_model = %config.models.chat_model,
            vision_model = %config.models.vision_model,
            "Initialized OpenAI chat provider"
        );

        let store: Arc<dyn ConversationStore> = Arc::new(db.clone());
        let image_store: Arc<dyn ImageStore> = images.clone();

        let memory_policy = MemoryPolicy {
            trigger_floor: config.pipeline.memory_trigger_floor,
            trigger_interval: config.pipeline.memory_trigger_interval,
            min_messages: config.pipeline.memory_min_messages,
        };

        let summarizer = Arc::new(MemorySummarizer::new(
            store.clone(),
            provider.clone(),
            config.models.chat_model.clone(),
            memory_policy,
        ));
        let titler = Arc::new(TitleGenerator::new(
            store.clone(),
            provider.clone(),
            config.models.chat_model.clone(),
        ));

        let (task_queue, task_rx) = TaskQueue::bounded(TASK_QUEUE_CAPACITY);
        let runner = TaskRunner::new(task_rx, summarizer, titler, CancellationToken::new());
        tokio::spawn(runner.run());

        let retriever = ContextRetriever::new(
            store.clone(),
            ContextLimits {
                history_limit: config.pipeline.history_limit,
                knowledge_limit: config.pipeline.knowledge_limit,
                snippet_chars: config.pipeline.snippet_chars,
            },
        );
        let engine = CompletionEngine::new(
            provider.clone(),
            store.clone(),
            CompletionSettings {
                chat_model: config.models.chat_model.clone(),
                vision_model: config.models.vision_model.clone(),
                temperature: config.pipeline.reply_temperature,
                max_tokens: config.pipeline.reply_max_tokens,
            },
        );

        let pipeline = Arc::new(ChatPipeline::new(
            store,
            image_store,
            retriever,
            engine,
            task_queue,
            memory_policy,
        ));

        let state = AppState {
            config: config.clone(),
            db: db.clone(),
            images,
            provider,
            pipeline,
        };

        let app = router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &MongoDb {
        &self.state.db
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route(
            "/mentors",
            get(handlers::mentors::list_mentors).post(handlers::mentors::create_mentor),
        )
        .route("/mentors/all", get(handlers::mentors::list_all_mentors))
        .route(
            "/mentors/:mentor_id",
            get(handlers::mentors::get_mentor).put(handlers::mentors::update_mentor),
        )
        .route(
            "/mentors/:mentor_id/deactivate",
            post(handlers::mentors::deactivate_mentor),
        )
        .route(
            "/mentors/:mentor_id/reactivate",
            post(handlers::mentors::reactivate_mentor),
        )
        .route(
            "/mentors/:mentor_id/chats",
            delete(handlers::chats::delete_chats_with_mentor),
        )
        .route(
            "/mentors/:mentor_id/documents",
            get(handlers::documents::list_documents).post(handlers::documents::create_document),
        )
        .route(
            "/mentors/:mentor_id/documents/search",
            get(handlers::documents::search_mentor_documents),
        )
        .route(
            "/documents/:document_id",
            delete(handlers::documents::delete_document),
        )
        .route(
            "/chats",
            get(handlers::chats::list_chats).post(handlers::chats::create_chat),
        )
        .route(
            "/chats/:chat_id",
            get(handlers::chats::get_chat).delete(handlers::chats::delete_chat),
        )
        .route("/chats/:chat_id/title", put(handlers::chats::rename_chat))
        .route(
            "/chats/:chat_id/messages",
            post(handlers::chats::send_message),
        )
        .route(
            "/chats/:chat_id/messages/stream",
            post(handlers::chats::send_message_stream),
        )
        .route(
            "/chats/:chat_id/messages/:message_id",
            get(handlers::chats::get_message),
        )
        .route(
            "/users/me",
            get(handlers::users::get_profile).put(handlers::users::update_profile),
        )
        .route("/images", post(handlers::images::upload_image))
        .route("/images/:image_id", get(handlers::images::download_image))
        .route(
            "/feedback",
            post(handlers::feedback::submit_feedback).get(handlers::feedback::list_feedback),
        )
        .route(
            "/feedback/:feedback_id/resolved",
            put(handlers::feedback::set_feedback_resolved),
        )
        .route(
            "/feedback/:feedback_id",
            delete(handlers::feedback::delete_feedback),
        )
        .route("/admin/memories", get(handlers::admin::list_memories))
        .route("/admin/memories/stats", get(handlers::admin::memory_stats))
        .route("/demo/chat", post(handlers::demo::demo_chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
