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

//! Chat relay: one upstream streaming completion mapped onto an ordered
//! sequence of outbound frames.
//!
//! Lifecycle per request:
//!
//! ```text
//! Validating --bad body--> Failed (400, no upstream call)
//!     |
//!  Streaming --upstream error--> Failed (stream ends with an error)
//!     |
//!  Completed (content frames..., then [DONE])
//! ```

use crate::llm::{ChatMessage, CompletionProvider, CHAT_ROLES};
use futures::Stream;
use intake_core::{IntakeError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Payload of the final frame after natural end of the upstream stream
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// One non-empty upstream fragment
    Content(String),
    Done,
}

impl RelayFrame {
    pub fn data(&self) -> &str {
        match self {
            RelayFrame::Content(text) => text,
            RelayFrame::Done => DONE_SENTINEL,
        }
    }
}

pub struct ChatRelay {
    provider: Arc<dyn CompletionProvider>,
    model: String,
}

impl ChatRelay {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Extract the chat turns from an untyped request body.
    ///
    /// `messages` must be an array of objects, each with a string `role`
    /// (`system`, `user` or `assistant`) and a string `content`.
    pub fn parse_request(body: &Value) -> Result<Vec<ChatMessage>> {
        let turns = body
            .get("messages")
            .and_then(Value::as_array)
            .ok_or_else(|| IntakeError::Validation("messages must be an array".to_string()))?;

        turns
            .iter()
            .enumerate()
            .map(|(i, turn)| {
                let role = turn.get("role").and_then(Value::as_str);
                let content = turn.get("content").and_then(Value::as_str);
                match (role, content) {
                    (Some(role), Some(content)) if CHAT_ROLES.contains(&role) => {
                        Ok(ChatMessage::new(role, content))
                    }
                    _ => Err(IntakeError::Validation(format!(
                        "messages[{}] must have a known role and string content",
                        i
                    ))),
                }
            })
            .collect()
    }

    /// Open the upstream completion and relay its fragments.
    ///
    /// A setup failure is returned before any frame exists. Afterwards the
    /// stream yields one `Content` frame per non-empty fragment in upstream
    /// order, then `Done`; or, if the upstream fails, a single `Err` after
    /// which nothing more is yielded.
    pub async fn open(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<impl Stream<Item = Result<RelayFrame>> + Send + 'static> {
        let turns = messages.len();
        let mut fragments = self
            .provider
            .stream_chat(messages, &self.model)
            .await
            .map_err(|e| IntakeError::Upstream(e.to_string()))?;
        debug!(model = %self.model, turns, "Relaying chat completion");

        Ok(async_stream::stream! {
            let mut relayed = 0usize;
            while let Some(fragment) = fragments.recv().await {
                match fragment {
                    Ok(text) if text.is_empty() => continue,
                    Ok(text) => {
                        relayed += 1;
                        yield Ok(RelayFrame::Content(text));
                    }
                    Err(e) => {
                        warn!(error = %e, relayed, "Upstream failed mid-stream, aborting relay");
                        yield Err(IntakeError::Upstream(e.to_string()));
                        return;
                    }
                }
            }
            debug!(relayed, "Upstream completion finished");
            yield Ok(RelayFrame::Done);
        })
    }
}
