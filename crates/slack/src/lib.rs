//! Slack side of the recall bridge.
//!
//! Receives events over Socket Mode, resolves Slack ids into names, and
//! routes each event to the memory engine: reply, learn, backfill, or forget.

pub mod api;
pub mod backfill;
pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod identity;
pub mod notify;
pub mod router;
pub mod socket;

#[cfg(test)]
mod testing;

pub use {
    api::SlackWebClient,
    backfill::HistoryBackfill,
    config::SlackAccountConfig,
    error::{Error, Result},
    identity::IdentityResolver,
    notify::{ErrorNotifier, ErrorReport},
    router::{EventRouter, RouteOutcome},
    socket::SocketModeClient,
};
