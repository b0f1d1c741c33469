//! Shared error plumbing and call-site utilities used across all recall crates.

pub mod error;
pub mod retry;

pub use {
    error::FromMessage,
    retry::{RetryPolicy, retry},
};
