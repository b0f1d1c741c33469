//! One-shot ingestion of a channel's full history.
//!
//! Pages are fetched newest-first until the platform reports no more, every
//! message is formatted, and the whole batch goes to the memory engine in a
//! single call. Nothing is ingested until the last page has been read.

use std::sync::Arc;

use {
    recall_channels::ChatPlatform,
    recall_common::{RetryPolicy, retry},
    recall_memory::{MemoryEngine, MemoryRecord},
    tracing::{debug, info},
};

use crate::{
    error::{Error, Result},
    format::format_message,
    identity::IdentityResolver,
};

pub const STARTING_NOTICE: &str =
    "I'm learning the channel history. Give me a few moments to add past conversations to my memory.";
pub const READY_NOTICE: &str = "Done! I'm ready to assist you.";

pub struct HistoryBackfill {
    platform: Arc<dyn ChatPlatform>,
    engine: Arc<dyn MemoryEngine>,
    identities: Arc<IdentityResolver>,
    retry: RetryPolicy,
}

impl HistoryBackfill {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        engine: Arc<dyn MemoryEngine>,
        identities: Arc<IdentityResolver>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            platform,
            engine,
            identities,
            retry,
        }
    }

    /// Learn every message ever posted in `channel_id`. Returns the number of
    /// records handed to the engine.
    pub async fn run(&self, channel_id: &str) -> Result<usize> {
        info!(channel_id, "starting history backfill");
        self.platform
            .post_message(channel_id, STARTING_NOTICE)
            .await?;

        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = retry(self.retry, "conversations.history", || {
                self.platform.history_page(channel_id, cursor.as_deref())
            })
            .await?;
            pages += 1;

            for message in page.messages {
                // join/leave notices and other system entries have no author
                let Some(author_id) = message.user.as_deref() else {
                    continue;
                };
                let formatted =
                    format_message(&self.identities, &message.text, author_id, channel_id)
                        .await?;
                records.push(MemoryRecord {
                    conversation_id: channel_id.to_string(),
                    author: formatted.author_name.clone(),
                    timestamp: message.ts,
                    body: formatted.to_string(),
                });
            }

            if !page.has_more {
                break;
            }
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => {
                    return Err(Error::message(format!(
                        "history of {channel_id} reports more pages but no cursor (after page {pages})"
                    )));
                },
            }
        }

        let count = records.len();
        debug!(channel_id, pages, records = count, "channel history collected");
        self.engine.learn(records).await?;

        self.platform.post_message(channel_id, READY_NOTICE).await?;
        info!(channel_id, records = count, "history backfill complete");
        Ok(count)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use recall_channels::HistoryPage;

    use super::*;
    use crate::testing::{Call, FakeEngine, FakePlatform, Trace, page};

    fn backfill(platform: FakePlatform, engine: FakeEngine) -> HistoryBackfill {
        let platform: Arc<dyn ChatPlatform> = Arc::new(
            platform
                .with_user("U1", "Ada")
                .with_user("U2", "Grace")
                .with_channel("C1", "general"),
        );
        let identities = Arc::new(IdentityResolver::new(
            Arc::clone(&platform),
            Duration::from_secs(600),
            RetryPolicy::once(),
        ));
        HistoryBackfill::new(platform, Arc::new(engine), identities, RetryPolicy::once())
    }

    #[tokio::test]
    async fn three_pages_are_fetched_and_learned_in_one_batch() {
        let trace = Trace::default();
        let platform = FakePlatform::new(&trace)
            .with_history_page(page(
                &[(Some("U1"), "third", "3.0"), (Some("U2"), "second", "2.0")],
                Some("p2"),
            ))
            .with_history_page(page(&[(Some("U1"), "first", "1.0")], Some("p3")))
            .with_history_page(page(&[(Some("U2"), "zeroth", "0.5")], None));

        let count = backfill(platform, FakeEngine::new(&trace))
            .run("C1")
            .await
            .unwrap();
        assert_eq!(count, 4);

        let fetches: Vec<Option<String>> = trace
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::History { cursor, .. } => Some(cursor),
                _ => None,
            })
            .collect();
        assert_eq!(fetches, vec![None, Some("p2".into()), Some("p3".into())]);

        let learned = trace.learned();
        assert_eq!(learned.len(), 1);
        let batch = &learned[0];
        let stamps: Vec<&str> = batch.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["3.0", "2.0", "1.0", "0.5"]);
        assert!(batch.iter().all(|r| r.conversation_id == "C1"));
        assert_eq!(batch[1].author, "Grace");
        assert_eq!(
            batch[1].body,
            "Slack channel: general.\nFrom Grace:\n\nsecond"
        );

        assert_eq!(trace.posts(), vec![STARTING_NOTICE, READY_NOTICE]);
    }

    #[tokio::test]
    async fn ready_notice_follows_the_single_ingest() {
        let trace = Trace::default();
        let platform =
            FakePlatform::new(&trace).with_history_page(page(&[(Some("U1"), "hi", "1.0")], None));

        backfill(platform, FakeEngine::new(&trace))
            .run("C1")
            .await
            .unwrap();

        let calls = trace.calls();
        let learn_at = calls
            .iter()
            .position(|c| matches!(c, Call::Learn(_)))
            .unwrap();
        let ready_at = calls
            .iter()
            .position(|c| matches!(c, Call::Post { text, .. } if text == READY_NOTICE))
            .unwrap();
        assert!(learn_at < ready_at);
    }

    #[tokio::test]
    async fn empty_history_still_learns_an_empty_batch() {
        let trace = Trace::default();
        let platform = FakePlatform::new(&trace).with_history_page(HistoryPage::default());

        let count = backfill(platform, FakeEngine::new(&trace))
            .run("C1")
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert_eq!(trace.learned(), vec![Vec::<MemoryRecord>::new()]);
        assert_eq!(trace.posts().last().map(String::as_str), Some(READY_NOTICE));
    }

    #[tokio::test]
    async fn authorless_entries_are_skipped() {
        let trace = Trace::default();
        let platform = FakePlatform::new(&trace).with_history_page(page(
            &[(None, "Ada joined the channel", "2.0"), (Some("U1"), "hello", "1.0")],
            None,
        ));

        backfill(platform, FakeEngine::new(&trace))
            .run("C1")
            .await
            .unwrap();

        let learned = trace.learned();
        assert_eq!(learned[0].len(), 1);
        assert_eq!(learned[0][0].timestamp, "1.0");
    }

    #[tokio::test]
    async fn more_pages_without_cursor_is_an_error() {
        let trace = Trace::default();
        let broken = HistoryPage {
            has_more: true,
            next_cursor: None,
            ..page(&[(Some("U1"), "hello", "1.0")], None)
        };
        let platform = FakePlatform::new(&trace).with_history_page(broken);

        let err = backfill(platform, FakeEngine::new(&trace))
            .run("C1")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no cursor"), "{err}");
        assert!(trace.learned().is_empty());
        assert_eq!(trace.posts(), vec![STARTING_NOTICE]);
    }

    #[tokio::test]
    async fn ingest_failure_propagates_and_skips_ready_notice() {
        let trace = Trace::default();
        let platform =
            FakePlatform::new(&trace).with_history_page(page(&[(Some("U1"), "hi", "1.0")], None));

        let err = backfill(platform, FakeEngine::new(&trace).failing_learn())
            .run("C1")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Memory(_)), "{err}");
        assert_eq!(trace.posts(), vec![STARTING_NOTICE]);
    }
}
