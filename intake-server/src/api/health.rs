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

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use futures::StreamExt;
use serde::Serialize;
use tracing::warn;

use crate::api::AppState;

/// Health check response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: StorageHealth,
    pub chat: ChatHealth,
}

#[derive(Debug, Serialize)]
pub struct StorageHealth {
    pub backend: String,
    pub reachable: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatHealth {
    pub enabled: bool,
    pub model: Option<String>,
}

/// GET /health - Probe the store with a one-entry scan
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.repository.store();
    let reachable = match store.scan_responses().next().await {
        Some(Err(e)) => {
            warn!(error = %e, "Health check: store scan failed");
            false
        }
        _ => true,
    };

    let health = HealthResponse {
        status: if reachable { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: StorageHealth {
            backend: store.backend_name().to_string(),
            reachable,
        },
        chat: ChatHealth {
            enabled: state.relay.is_some(),
            model: state.relay.as_ref().map(|relay| relay.model().to_string()),
        },
    };

    let status_code = if reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}
