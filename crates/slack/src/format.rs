use std::{collections::HashMap, fmt, sync::LazyLock};

use {
    recall_channels::Result,
    regex::{Captures, Regex},
    tracing::debug,
};

use crate::identity::IdentityResolver;

/// `<@U123>` or `<@W123|label>` user mention tokens.
#[allow(clippy::expect_used)]
static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<@([UW][A-Za-z0-9]+)(?:\|[^>]*)?>").expect("mention pattern is valid")
});

/// A message with every identifier resolved, ready for the memory engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    pub channel_name: String,
    pub author_name: String,
    pub body: String,
}

impl fmt::Display for FormattedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Slack channel: {}.\nFrom {}:\n\n{}",
            self.channel_name, self.author_name, self.body
        )
    }
}

/// Resolve channel and author names and rewrite mentions in `text`.
///
/// A failure to resolve the channel or the author is returned; a mention
/// that cannot be resolved is kept as written.
pub async fn format_message(
    identities: &IdentityResolver,
    text: &str,
    author_id: &str,
    channel_id: &str,
) -> Result<FormattedMessage> {
    let channel_name = identities.resolve_channel(channel_id).await?;
    let author_name = identities.resolve_user(author_id).await?;
    let body = rewrite_mentions(identities, text).await;
    Ok(FormattedMessage {
        channel_name,
        author_name,
        body,
    })
}

/// Replace every resolvable mention token with `@Display Name`.
pub async fn rewrite_mentions(identities: &IdentityResolver, text: &str) -> String {
    let ids: Vec<&str> = MENTION
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    let mut names: HashMap<&str, Option<String>> = HashMap::new();
    for id in ids {
        if names.contains_key(id) {
            continue;
        }
        let name = match identities.resolve_user(id).await {
            Ok(name) => Some(name),
            Err(e) => {
                debug!(user_id = id, error = %e, "leaving unresolved mention as-is");
                None
            },
        };
        names.insert(id, name);
    }

    if names.is_empty() {
        return text.to_string();
    }

    MENTION
        .replace_all(text, |caps: &Captures<'_>| {
            match names.get(&caps[1]).and_then(Option::as_ref) {
                Some(name) => format!("@{name}"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
