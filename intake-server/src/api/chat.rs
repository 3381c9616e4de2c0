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
    extract::State,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
};
use futures::StreamExt;
use tracing::debug;

use crate::api::{parse_json, ApiError, AppState};
use crate::relay::{ChatRelay, RelayFrame};

const INVALID_MESSAGES_FORMAT: &str = "Invalid messages format";

/// POST /chat - Relay a streamed completion as server-sent events.
///
/// Each fragment becomes one `data: <text>` event and natural end is marked
/// by `data: [DONE]`. Once the first byte is out the status is committed to
/// 200, so an upstream failure can only abort the body.
pub async fn stream_chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let messages = parse_json(&body)
        .and_then(|body| ChatRelay::parse_request(&body))
        .map_err(|e| {
            debug!(error = %e, "Rejected chat request");
            ApiError::BadRequest(INVALID_MESSAGES_FORMAT.to_string())
        })?;

    let relay = state.relay.as_ref().ok_or_else(|| {
        ApiError::Internal("chat features disabled: no completion API key configured".to_string())
    })?;

    let frames = relay
        .open(messages)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to open completion stream: {}", e)))?;

    let events = frames.map(|frame| frame.map(|frame| to_event(&frame)));

    // No keep-alive: the body carries exactly the relayed frames.
    Ok(Sse::new(events).into_response())
}

/// SSE field values may not contain carriage returns; fold them into line
/// breaks, which the event encoder splits into continuation `data:` lines.
fn to_event(frame: &RelayFrame) -> Event {
    let data = frame.data();
    if data.contains('\r') {
        Event::default().data(data.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Event::default().data(data)
    }
}
