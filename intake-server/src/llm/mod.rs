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

//! Upstream completion providers

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

mod providers;
pub use providers::*;

/// Roles accepted in a chat turn
pub const CHAT_ROLES: [&str; 3] = ["system", "user", "assistant"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Incremental text fragments of one streamed completion. An `Err` item
/// means the upstream failed mid-stream; the channel closing after `Ok`
/// items means natural end.
pub type FragmentReceiver = mpsc::Receiver<anyhow::Result<String>>;

#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open one streaming completion. Setup failures are returned directly.
    ///
    /// The provider stops consuming upstream once the receiver is dropped.
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
    ) -> anyhow::Result<FragmentReceiver>;

    fn name(&self) -> &str;
}
