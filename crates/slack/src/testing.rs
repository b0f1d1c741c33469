//! Recording fakes for the platform, memory engine, and acknowledgements.
//!
//! All three write into one shared [`Trace`] so tests can assert on the
//! relative order of side effects.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use {
    async_trait::async_trait,
    recall_channels::{
        BotIdentity, ChannelPage, ChatPlatform, Error as ChannelError, EventAck, HistoryMessage,
        HistoryPage, Result as ChannelResult,
    },
    recall_memory::{AssistantProfile, MemoryEngine, MemoryRecord},
};

pub(crate) const BOT_ID: &str = "UBOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Ack,
    Whoami,
    UserLookup(String),
    ChannelLookup(String),
    Post { channel: String, text: String },
    History { channel: String, cursor: Option<String> },
    ListChannels { cursor: Option<String> },
    PublishHome { user: String, markdown: String },
    Reply { conversation: String, text: String },
    Learn(Vec<MemoryRecord>),
    Erase(String),
}

impl Call {
    pub(crate) fn is_side_effect(&self) -> bool {
        matches!(
            self,
            Self::Post { .. }
                | Self::PublishHome { .. }
                | Self::Reply { .. }
                | Self::Learn(_)
                | Self::Erase(_)
                | Self::History { .. }
        )
    }
}

#[derive(Clone, Default)]
pub(crate) struct Trace(Arc<Mutex<Vec<Call>>>);

impl Trace {
    pub(crate) fn push(&self, call: Call) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(*c)).count()
    }

    pub(crate) fn posts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Post { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn learned(&self) -> Vec<Vec<MemoryRecord>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Learn(records) => Some(records),
                _ => None,
            })
            .collect()
    }
}

pub(crate) struct FakePlatform {
    trace: Trace,
    users: HashMap<String, String>,
    channels: HashMap<String, String>,
    history: Mutex<VecDeque<HistoryPage>>,
    member_pages: Mutex<VecDeque<ChannelPage>>,
    fail_posts: bool,
    fail_home: bool,
}

impl FakePlatform {
    pub(crate) fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            users: HashMap::new(),
            channels: HashMap::new(),
            history: Mutex::new(VecDeque::new()),
            member_pages: Mutex::new(VecDeque::new()),
            fail_posts: false,
            fail_home: false,
        }
    }

    pub(crate) fn with_user(mut self, id: &str, name: &str) -> Self {
        self.users.insert(id.into(), name.into());
        self
    }

    pub(crate) fn with_channel(mut self, id: &str, name: &str) -> Self {
        self.channels.insert(id.into(), name.into());
        self
    }

    pub(crate) fn with_history_page(self, page: HistoryPage) -> Self {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(page);
        self
    }

    pub(crate) fn with_member_page(self, page: ChannelPage) -> Self {
        self.member_pages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(page);
        self
    }

    pub(crate) fn failing_posts(mut self) -> Self {
        self.fail_posts = true;
        self
    }

    pub(crate) fn failing_home(mut self) -> Self {
        self.fail_home = true;
        self
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn whoami(&self) -> ChannelResult<BotIdentity> {
        self.trace.push(Call::Whoami);
        Ok(BotIdentity {
            user_id: BOT_ID.into(),
            name: Some("recall".into()),
        })
    }

    async fn user_name(&self, user_id: &str) -> ChannelResult<String> {
        self.trace.push(Call::UserLookup(user_id.into()));
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ChannelError::api("users.info", "user_not_found"))
    }

    async fn channel_name(&self, channel_id: &str) -> ChannelResult<String> {
        self.trace.push(Call::ChannelLookup(channel_id.into()));
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| ChannelError::api("conversations.info", "channel_not_found"))
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> ChannelResult<()> {
        self.trace.push(Call::Post {
            channel: channel_id.into(),
            text: text.into(),
        });
        if self.fail_posts {
            return Err(ChannelError::api("chat.postMessage", "not_in_channel"));
        }
        Ok(())
    }

    async fn history_page(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
    ) -> ChannelResult<HistoryPage> {
        self.trace.push(Call::History {
            channel: channel_id.into(),
            cursor: cursor.map(str::to_string),
        });
        Ok(self
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default())
    }

    async fn member_channels(&self, cursor: Option<&str>) -> ChannelResult<ChannelPage> {
        self.trace.push(Call::ListChannels {
            cursor: cursor.map(str::to_string),
        });
        Ok(self
            .member_pages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default())
    }

    async fn publish_home(&self, user_id: &str, markdown: &str) -> ChannelResult<()> {
        self.trace.push(Call::PublishHome {
            user: user_id.into(),
            markdown: markdown.into(),
        });
        if self.fail_home {
            return Err(ChannelError::api("views.publish", "invalid_arguments"));
        }
        Ok(())
    }
}

pub(crate) struct FakeEngine {
    trace: Trace,
    fail_chat: bool,
    fail_learn: bool,
    fail_erase: Vec<String>,
}

impl FakeEngine {
    pub(crate) fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            fail_chat: false,
            fail_learn: false,
            fail_erase: Vec::new(),
        }
    }

    pub(crate) fn failing_chat(mut self) -> Self {
        self.fail_chat = true;
        self
    }

    pub(crate) fn failing_learn(mut self) -> Self {
        self.fail_learn = true;
        self
    }

    pub(crate) fn failing_erase_of(mut self, conversation_id: &str) -> Self {
        self.fail_erase.push(conversation_id.into());
        self
    }
}

pub(crate) fn profile() -> AssistantProfile {
    AssistantProfile {
        name: "Sam".into(),
        description: "Sam remembers what this workspace talks about.".into(),
    }
}

#[async_trait]
impl MemoryEngine for FakeEngine {
    async fn profile(&self) -> recall_memory::Result<AssistantProfile> {
        Ok(profile())
    }

    async fn chat_reply(&self, text: &str, conversation_id: &str) -> recall_memory::Result<String> {
        self.trace.push(Call::Reply {
            conversation: conversation_id.into(),
            text: text.into(),
        });
        if self.fail_chat {
            return Err(recall_memory::Error::message("engine unavailable"));
        }
        Ok("Here is what I remember.".into())
    }

    async fn learn(&self, records: Vec<MemoryRecord>) -> recall_memory::Result<()> {
        self.trace.push(Call::Learn(records));
        if self.fail_learn {
            return Err(recall_memory::Error::message("ingest rejected"));
        }
        Ok(())
    }

    async fn erase_conversation(&self, conversation_id: &str) -> recall_memory::Result<()> {
        self.trace.push(Call::Erase(conversation_id.into()));
        if self.fail_erase.iter().any(|id| id == conversation_id) {
            return Err(recall_memory::Error::message("erase rejected"));
        }
        Ok(())
    }
}

pub(crate) struct FakeAck {
    trace: Trace,
}

impl FakeAck {
    pub(crate) fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
        }
    }
}

#[async_trait]
impl EventAck for FakeAck {
    async fn ack(&self) -> ChannelResult<()> {
        self.trace.push(Call::Ack);
        Ok(())
    }
}

/// A history page from `(user, text, ts)` triples.
pub(crate) fn page(messages: &[(Option<&str>, &str, &str)], next: Option<&str>) -> HistoryPage {
    HistoryPage {
        messages: messages
            .iter()
            .map(|(user, text, ts)| HistoryMessage {
                user: user.map(str::to_string),
                text: (*text).to_string(),
                ts: (*ts).to_string(),
            })
            .collect(),
        has_more: next.is_some(),
        next_cursor: next.map(str::to_string),
    }
}
