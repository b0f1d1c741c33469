use std::sync::Arc;

use {
    recall_channels::ChatPlatform,
    tracing::{error, warn},
    uuid::Uuid,
};

/// One captured failure. Logged and optionally surfaced, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    pub origin_channel: Option<String>,
}

/// Short random code users can quote to correlate with logs.
pub fn new_error_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Logs failures under a fresh code and tells the originating channel.
pub struct ErrorNotifier {
    platform: Arc<dyn ChatPlatform>,
    support_contact: Option<String>,
}

impl ErrorNotifier {
    pub fn new(platform: Arc<dyn ChatPlatform>, support_contact: Option<String>) -> Self {
        Self {
            platform,
            support_contact,
        }
    }

    /// User-facing apology for `code`.
    pub fn apology(&self, code: &str) -> String {
        let mut text = String::from(
            "Apologies, I encountered an unexpected error. Our team received a note about this \
             and is looking into it.",
        );
        match &self.support_contact {
            Some(contact) => text.push_str(&format!(
                " For more details, please contact us at {contact} and mention error code `{code}`."
            )),
            None => text.push_str(&format!(
                " If you need help, mention error code `{code}` to your workspace admin."
            )),
        }
        text
    }

    /// Record a failure and, when `channel` is known, post the apology there.
    ///
    /// Never fails: a post that does not go through is logged and dropped so
    /// it cannot mask the failure being reported.
    pub async fn report(
        &self,
        failure: &(dyn std::error::Error + Send + Sync),
        channel: Option<&str>,
    ) -> ErrorReport {
        let report = ErrorReport {
            code: new_error_code(),
            message: failure.to_string(),
            origin_channel: channel.map(str::to_string),
        };
        error!(
            code = %report.code,
            channel_id = ?report.origin_channel,
            error = %report.message,
            "event handling failed"
        );

        if let Some(channel_id) = channel
            && let Err(e) = self
                .platform
                .post_message(channel_id, &self.apology(&report.code))
                .await
        {
            warn!(
                code = %report.code,
                channel_id,
                error = %e,
                "failed to deliver error notice"
            );
        }
        report
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Error,
        testing::{FakePlatform, Trace},
    };

    #[test]
    fn codes_are_short_hex_and_distinct() {
        let a = new_error_code();
        let b = new_error_code();
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn apology_mentions_contact_when_configured() {
        let trace = Trace::default();
        let notifier = ErrorNotifier::new(
            Arc::new(FakePlatform::new(&trace)),
            Some("help@example.com".into()),
        );
        let text = notifier.apology("abcd1234");
        assert!(text.contains("help@example.com"));
        assert!(text.contains("`abcd1234`"));
    }

    #[tokio::test]
    async fn report_posts_apology_with_code_to_origin_channel() {
        let trace = Trace::default();
        let notifier = ErrorNotifier::new(Arc::new(FakePlatform::new(&trace)), None);

        let report = notifier
            .report(&Error::message("engine unavailable"), Some("C1"))
            .await;

        assert_eq!(report.message, "engine unavailable");
        assert_eq!(report.origin_channel.as_deref(), Some("C1"));
        let posts = trace.posts();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].contains(&report.code));
    }

    #[tokio::test]
    async fn report_without_channel_only_logs() {
        let trace = Trace::default();
        let notifier = ErrorNotifier::new(Arc::new(FakePlatform::new(&trace)), None);

        notifier.report(&Error::message("boom"), None).await;
        assert!(trace.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_notice_is_swallowed() {
        let trace = Trace::default();
        let notifier =
            ErrorNotifier::new(Arc::new(FakePlatform::new(&trace).failing_posts()), None);

        let report = notifier.report(&Error::message("boom"), Some("C1")).await;
        assert_eq!(report.message, "boom");
        assert_eq!(trace.posts().len(), 1);
    }
}
