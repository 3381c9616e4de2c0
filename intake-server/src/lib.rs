// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

pub mod api;
pub mod config;
pub mod llm;
pub mod middleware;
pub mod relay;

use anyhow::Result;
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{
    delete_responses, delete_stats_name, health_check, list_responses, missing_name,
    response_stats, stream_chat, submit_response, AppState,
};
use config::{LoggingConfig, ServerConfig, StorageBackendKind, StorageConfig};
use intake_storage::{MemoryBackend, SledBackend, StoreAdapter, SurveyRepository};
use relay::ChatRelay;

pub fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "intake_server=info,intake_storage=info,tower_http=info".into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(logging.json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!logging.json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Open the configured store. The handle lives until shutdown.
pub fn open_store(storage: &StorageConfig) -> Result<StoreAdapter> {
    let store = match storage.backend {
        StorageBackendKind::Sled => {
            StoreAdapter::new(Arc::new(SledBackend::open(&storage.data_dir)?))
        }
        StorageBackendKind::Memory => {
            tracing::warn!("Using in-memory storage: responses are lost on restart");
            StoreAdapter::new(Arc::new(MemoryBackend::new()))
        }
    };
    Ok(store)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/responses",
            get(list_responses).post(submit_response).delete(missing_name),
        )
        .route("/responses/", delete(missing_name))
        .route(
            "/responses/stats",
            get(response_stats).delete(delete_stats_name),
        )
        .route("/responses/:name", delete(delete_responses))
        .route("/chat", post(stream_chat))
        .with_state(state)
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::preflight))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    init_tracing(&config.logging);

    tracing::info!("Starting Intake Server");
    tracing::debug!("Configuration: {:#?}", config);

    config.validate()?;

    let store = open_store(&config.storage)?;
    tracing::info!("Survey store opened ({})", store.backend_name());
    let repository = Arc::new(SurveyRepository::with_system_clock(store.clone()));

    let relay = match llm::OpenAIProvider::from_config(&config.llm) {
        Some(provider) => {
            tracing::info!("Chat relay enabled with model {}", config.llm.model);
            Some(Arc::new(ChatRelay::new(
                Arc::new(provider),
                config.llm.model.clone(),
            )))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set, chat relay disabled");
            None
        }
    };

    let app = build_router(AppState { repository, relay });

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, closing survey store");
    store.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            futures::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                futures::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = futures::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
