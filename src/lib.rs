//! lineloop: a small message-passing runtime for line-oriented apps.
//!
//! A [`Model`] owns the state; a single event loop feeds it [`Message`]s one
//! at a time; side effects run as [`Command`]s on their own tasks and report
//! back through the mailbox.

pub mod core;
pub mod journal;
pub mod runtime;

#[cfg(test)]
pub mod test_support;

pub use crate::core::{Command, Message, Model, TeardownError};
pub use crate::runtime::{App, Mailbox, RunError, RuntimeOptions, Stopped};
