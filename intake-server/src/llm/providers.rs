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

use super::{ChatMessage, CompletionProvider, FragmentReceiver};
use crate::config::LLMConfig;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client as OpenAIClient,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Buffered fragments between the upstream reader and the outbound stream
const FRAGMENT_BUFFER: usize = 100;

// OpenAI-compatible streaming provider
pub struct OpenAIProvider {
    client: OpenAIClient<OpenAIConfig>,
}

impl OpenAIProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = base_url {
            info!("Using completion API at {}", base_url);
            config = config.with_api_base(base_url);
        }

        Self {
            client: OpenAIClient::with_config(config),
        }
    }

    /// `None` when no API key is configured
    pub fn from_config(config: &LLMConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self::new(api_key, config.base_url.clone()))
    }

    fn convert_messages(&self, messages: Vec<ChatMessage>) -> Vec<ChatCompletionRequestMessage> {
        messages
            .into_iter()
            .filter_map(|msg| match msg.role.as_str() {
                "system" => ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content)
                    .build()
                    .ok()
                    .map(ChatCompletionRequestMessage::System),
                "user" => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content)
                    .build()
                    .ok()
                    .map(ChatCompletionRequestMessage::User),
                "assistant" => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content)
                    .build()
                    .ok()
                    .map(ChatCompletionRequestMessage::Assistant),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
    ) -> anyhow::Result<FragmentReceiver> {
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(self.convert_messages(messages))
            .stream(true)
            .build()?;

        let mut stream = self.client.chat().create_stream(request).await?;
        debug!(model = %model, "Opened upstream completion stream");

        tokio::spawn(async move {
            while let Some(result) = stream.next().await {
                match result {
                    Ok(response) => {
                        let Some(content) = response
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.delta.content)
                        else {
                            continue;
                        };
                        if tx.send(Ok(content)).await.is_err() {
                            debug!("Chat client went away, dropping upstream stream");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Upstream completion stream failed");
                        let _ = tx.send(Err(e.into())).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "OpenAI"
    }
}
