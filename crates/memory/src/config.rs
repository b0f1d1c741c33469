use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
};

pub const DEFAULT_API_URL: &str = "https://api.firedust.dev";

/// Connection settings for the memory engine.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Base URL of the memory engine API (no trailing slash).
    pub api_url: String,

    /// Bearer key for the memory engine.
    #[serde(serialize_with = "serialize_secret")]
    pub api_key: Secret<String>,

    /// Assistant whose memory this bridge reads and writes.
    pub assistant_id: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl MemoryConfig {
    /// Short SHA-256 fingerprint of the API key, safe to put in logs.
    pub fn key_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.api_key.expose_secret().as_bytes());
        format!("{digest:x}")[..16].to_string()
    }
}

impl std::fmt::Debug for MemoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("assistant_id", &self.assistant_id)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            api_key: Secret::new(String::new()),
            assistant_id: String::new(),
            timeout_secs: 60,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_key() {
        let cfg = MemoryConfig {
            api_key: Secret::new("sk-live-123".into()),
            assistant_id: "helper".into(),
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-live-123"));
        assert!(rendered.contains("helper"));
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let cfg = MemoryConfig {
            api_key: Secret::new("key".into()),
            ..Default::default()
        };
        let fp = cfg.key_fingerprint();
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, cfg.key_fingerprint());
        assert!(!fp.contains("key"));
    }

    #[test]
    fn deserialize_fills_defaults() {
        let cfg: MemoryConfig =
            serde_json::from_str(r#"{"api_key": "k", "assistant_id": "a1"}"#).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.timeout_secs, 60);
        assert_eq!(cfg.api_key.expose_secret(), "k");
    }
}
