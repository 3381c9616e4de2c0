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

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use intake_core::{ListFilter, StoredResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

use crate::api::{parse_json, ApiError, AppState};

const INVALID_RESPONSE_FORMAT: &str = "Invalid response format";
const INVALID_QUERY: &str = "Invalid query parameters";
const NAME_REQUIRED: &str = "Name is required";
const STATS_NAME: &str = "stats";

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Raw query parameters for listing responses
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub since: Option<String>,
    pub name: Option<String>,
}

impl ListParams {
    /// Missing or empty parameters fall back to the filter defaults
    pub fn into_filter(self) -> Result<ListFilter, ApiError> {
        let defaults = ListFilter::default();
        Ok(ListFilter {
            limit: parse_param(self.limit, defaults.limit)?,
            offset: parse_param(self.offset, defaults.offset)?,
            since: parse_param(self.since, defaults.since)?,
            name: self.name.filter(|n| !n.is_empty()),
        })
    }
}

fn parse_param<T: FromStr>(raw: Option<String>, default: T) -> Result<T, ApiError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(text) => text
            .parse()
            .map_err(|_| ApiError::BadRequest(INVALID_QUERY.to_string())),
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub responses: Vec<StoredResponse>,
    pub metadata: ListMetadata,
}

#[derive(Debug, Serialize)]
pub struct ListMetadata {
    pub limit: usize,
    pub offset: usize,
    pub count: usize,
    pub filters: ListFilters,
}

#[derive(Debug, Serialize)]
pub struct ListFilters {
    pub since: u64,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: usize,
    pub message: String,
}

/// POST /responses - Store one onboarding survey submission
pub async fn submit_response(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let invalid = || ApiError::BadRequest(INVALID_RESPONSE_FORMAT.to_string());

    let body = parse_json(&body).map_err(|_| invalid())?;
    let name = body.get("name").and_then(Value::as_str).ok_or_else(invalid)?;

    state
        .repository
        .write(name, body.get("responses"))
        .await
        .map_err(|e| {
            if e.is_validation() {
                debug!(error = %e, "Rejected survey response");
                invalid()
            } else {
                e.into()
            }
        })?;

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /responses - List stored responses oldest first
pub async fn list_responses(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let filter = params.into_filter()?;
    let page = state.repository.list(filter).await?;

    Ok(Json(ListResponse {
        metadata: ListMetadata {
            limit: page.filter.limit,
            offset: page.filter.offset,
            count: page.entries.len(),
            filters: ListFilters {
                since: page.filter.since,
                name: page.filter.name,
            },
        },
        responses: page.entries,
    }))
}

/// GET /responses/stats - Aggregate statistics over every response
pub async fn response_stats(
    State(state): State<AppState>,
) -> Result<Json<intake_core::SurveyStats>, ApiError> {
    Ok(Json(state.repository.stats().await?))
}

/// DELETE /responses/:name - Remove every response submitted under `name`
pub async fn delete_responses(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    sweep(&state, name).await
}

/// DELETE /responses/stats
///
/// The static stats route takes precedence over `/responses/:name`, so a
/// participant literally named "stats" is deleted here.
pub async fn delete_stats_name(
    State(state): State<AppState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    sweep(&state, STATS_NAME.to_string()).await
}

async fn sweep(state: &AppState, name: String) -> Result<Json<DeleteResponse>, ApiError> {
    if name.is_empty() {
        return Err(ApiError::BadRequest(NAME_REQUIRED.to_string()));
    }

    let outcome = state.repository.delete_by_name(&name).await?;

    Ok(Json(DeleteResponse {
        success: true,
        deleted: outcome.deleted,
        message: format!("Deleted {} responses for {}", outcome.deleted, name),
    }))
}

/// DELETE /responses - The name path segment is missing
pub async fn missing_name() -> ApiError {
    ApiError::BadRequest(NAME_REQUIRED.to_string())
}
