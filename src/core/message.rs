//! # Messages
//!
//! Everything that happens while the app runs becomes a `Message`.
//! User typed a line? That's `Message::Input(line)`.
//! A command finished? It hands back whatever message it produced,
//! usually `Message::App(..)` carrying the application's own payload.
//!
//! Two variants are reserved for the runtime and never reach `Model::update`:
//!
//! - `Quit` trips the cancellation scope and ends the event loop.
//! - `Batch` fans its commands out to the executor, one task each.
//!
//! ```text
//! Input ─┐
//! App   ─┼─▶ update()
//! Quit  ─┼─▶ cancel scope
//! Batch ─┘─▶ executor (N tasks)
//! ```

use crate::core::command::Command;

#[derive(Debug)]
pub enum Message<M> {
    /// One line of raw input, without the trailing newline.
    Input(String),
    /// Stop the event loop.
    Quit,
    /// Run every contained command independently and concurrently.
    Batch(Vec<Command<M>>),
    /// Application-defined payload, only meaningful to the model.
    App(M),
}

impl<M: Send + 'static> Message<M> {
    /// Builds a `Batch`, dropping absent commands.
    ///
    /// Returns `None` when nothing is left to run, so callers can hand the
    /// result straight to a command slot without scheduling an empty batch.
    pub fn batch<I>(commands: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<Command<M>>>,
    {
        let commands: Vec<Command<M>> = commands.into_iter().flatten().collect();
        if commands.is_empty() {
            None
        } else {
            Some(Message::Batch(commands))
        }
    }

    /// True for the variants the event loop handles itself.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Message::Quit | Message::Batch(_))
    }
}

impl<M> From<M> for Message<M> {
    fn from(msg: M) -> Self {
        Message::App(msg)
    }
}
