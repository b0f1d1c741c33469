//! Display-name resolution for users and channels.
//!
//! Names are cached per identifier for a fixed TTL so that busy channels do
//! not hammer `users.info` / `conversations.info` (both are tightly rate
//! limited). Concurrent misses for the same key are not coalesced; the last
//! writer wins.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    recall_channels::{ChatPlatform, Result},
    recall_common::{RetryPolicy, retry},
    tokio::time::Instant,
    tracing::debug,
};

pub const DEFAULT_IDENTITY_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Identifier → display name, with per-entry expiry.
///
/// Uses a `std::sync::Mutex` because every operation is a synchronous map
/// access that is never held across an `.await`.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl IdentityCache {
    /// Cached value for `id`, provided `now` is strictly before its expiry.
    pub fn get(&self, id: &str, now: Instant) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(id)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    /// Store `value` until `now + ttl`. Entries already expired at `now` are
    /// dropped, so the map stays bounded by the ids seen within one TTL.
    pub fn insert(&self, id: &str, value: String, now: Instant, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| now < entry.expires_at);
        entries.insert(id.to_string(), CacheEntry {
            value,
            expires_at: now + ttl,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves opaque Slack ids into human-readable names.
pub struct IdentityResolver {
    platform: Arc<dyn ChatPlatform>,
    users: IdentityCache,
    channels: IdentityCache,
    ttl: Duration,
    retry: RetryPolicy,
}

impl IdentityResolver {
    pub fn new(platform: Arc<dyn ChatPlatform>, ttl: Duration, retry: RetryPolicy) -> Self {
        Self {
            platform,
            users: IdentityCache::default(),
            channels: IdentityCache::default(),
            ttl,
            retry,
        }
    }

    pub async fn resolve_user(&self, user_id: &str) -> Result<String> {
        if let Some(name) = self.users.get(user_id, Instant::now()) {
            return Ok(name);
        }
        let name = retry(self.retry, "users.info", || self.platform.user_name(user_id)).await?;
        debug!(user_id, name = %name, "resolved user name");
        self.users
            .insert(user_id, name.clone(), Instant::now(), self.ttl);
        Ok(name)
    }

    pub async fn resolve_channel(&self, channel_id: &str) -> Result<String> {
        if let Some(name) = self.channels.get(channel_id, Instant::now()) {
            return Ok(name);
        }
        let name = retry(self.retry, "conversations.info", || {
            self.platform.channel_name(channel_id)
        })
        .await?;
        debug!(channel_id, name = %name, "resolved channel name");
        self.channels
            .insert(channel_id, name.clone(), Instant::now(), self.ttl);
        Ok(name)
    }

    /// The bot's own user id. Not cached here; it never changes within a
    /// session, so callers keep it for the process lifetime.
    pub async fn resolve_bot_id(&self) -> Result<String> {
        let me = retry(self.retry, "auth.test", || self.platform.whoami()).await?;
        Ok(me.user_id)
    }
}
