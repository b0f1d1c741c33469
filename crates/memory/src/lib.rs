//! Long-term memory: the narrow interface to the external assistant service
//! that replies to messages, learns conversations, and forgets them.

pub mod config;
pub mod engine;
pub mod error;
pub mod http;

pub use {
    config::MemoryConfig,
    engine::{AssistantProfile, MemoryEngine, MemoryRecord},
    error::{Error, Result},
    http::HttpMemoryEngine,
};
