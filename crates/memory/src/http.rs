//! Memory engine client speaking the assistant service's REST API.
use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

use crate::{
    config::MemoryConfig,
    engine::{AssistantProfile, MemoryEngine, MemoryRecord},
    error::{Context, Error, Result},
};

pub struct HttpMemoryEngine {
    client: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
    assistant_id: String,
}

impl HttpMemoryEngine {
    pub fn new(config: &MemoryConfig) -> Result<Self> {
        if config.assistant_id.is_empty() {
            return Err(Error::message("assistant id is not configured"));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            assistant_id: config.assistant_id.clone(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/assistants/{}{path}", self.base_url, self.assistant_id)
    }

    async fn ensure_success(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Status {
            operation,
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    conversation_id: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: String,
}

#[derive(Serialize)]
struct LearnRequest {
    records: Vec<MemoryRecord>,
}

#[async_trait]
impl MemoryEngine for HttpMemoryEngine {
    async fn profile(&self) -> Result<AssistantProfile> {
        let response = self
            .client
            .get(self.endpoint(""))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?;
        let profile = Self::ensure_success("load assistant", response)
            .await?
            .json::<AssistantProfile>()
            .await
            .with_context(|| {
                format!("assistant {} returned a malformed profile", self.assistant_id)
            })?;
        Ok(profile)
    }

    async fn chat_reply(&self, text: &str, conversation_id: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint("/chat"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&ChatRequest {
                message: text,
                conversation_id,
            })
            .send()
            .await?;
        let reply = Self::ensure_success("chat", response)
            .await?
            .json::<ChatResponse>()
            .await?;
        debug!(
            conversation_id,
            reply_len = reply.message.len(),
            "memory engine replied"
        );
        Ok(reply.message)
    }

    async fn learn(&self, records: Vec<MemoryRecord>) -> Result<()> {
        if records.is_empty() {
            debug!("no records to learn");
            return Ok(());
        }
        let count = records.len();
        let response = self
            .client
            .post(self.endpoint("/learn"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&LearnRequest { records })
            .send()
            .await?;
        Self::ensure_success("learn", response).await?;
        info!(count, "records learned");
        Ok(())
    }

    async fn erase_conversation(&self, conversation_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.endpoint(&format!("/conversations/{conversation_id}")))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(conversation_id, "conversation already empty");
            return Ok(());
        }
        Self::ensure_success("erase conversation", response).await?;
        info!(conversation_id, "conversation erased");
        Ok(())
    }
}
