use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// One learned message, keyed by the conversation (channel) it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryRecord {
    pub conversation_id: String,
    pub author: String,
    /// Source timestamp, never reassigned.
    pub timestamp: String,
    pub body: String,
}

/// Public face of the assistant, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssistantProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// The external assistant service.
#[async_trait]
pub trait MemoryEngine: Send + Sync {
    async fn profile(&self) -> Result<AssistantProfile>;

    /// Synchronous chat turn within a conversation.
    async fn chat_reply(&self, text: &str, conversation_id: &str) -> Result<String>;

    /// Bulk-ingest records. An empty batch is a no-op.
    async fn learn(&self, records: Vec<MemoryRecord>) -> Result<()>;

    /// Forget a conversation. Forgetting an unknown or already empty
    /// conversation succeeds.
    async fn erase_conversation(&self, conversation_id: &str) -> Result<()>;
}
