//! # Model
//!
//! The application's state and its transition function. The runtime only
//! ever calls the three methods below; whatever a model does inside them
//! (including talking to a database) is its own business.
//!
//! ```text
//! init()            → first command, before any message
//! update(msg)       → (next model, follow-up command)
//! teardown(deadline) → best-effort cleanup, bounded by the runtime
//! ```
//!
//! `update` takes `self` by value: the returned model is the only owner of
//! state from then on, so nothing can keep mutating the previous value.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::core::command::Command;
use crate::core::message::Message;

/// Error a model reports from `teardown`.
pub type TeardownError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait Model: Sized + Send + 'static {
    /// The application's own message payload, carried by `Message::App`.
    type Msg: Send + 'static;

    /// Called once, before the event loop starts consuming.
    fn init(&self) -> Option<Command<Self::Msg>>;

    /// Applies one message. Never receives `Quit` or `Batch`.
    fn update(self, msg: Message<Self::Msg>) -> (Self, Option<Command<Self::Msg>>);

    /// Releases resources on shutdown.
    ///
    /// The runtime abandons this future once `deadline` passes and reports a
    /// timeout, so long-running cleanup should check the deadline itself.
    async fn teardown(self, deadline: Instant) -> Result<(), TeardownError> {
        let _ = deadline;
        Ok(())
    }
}
