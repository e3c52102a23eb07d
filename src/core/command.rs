//! # Commands
//!
//! A `Command` is deferred async work that yields at most one `Message`.
//! Building one does nothing; the executor runs it on its own task and
//! pushes the result (if any) into the mailbox.
//!
//! Commands have no error channel. A command that can fail returns an
//! application message describing the failure, so `update()` stays the one
//! place that decides what failure means.
//!
//! "No command" is spelled `None` wherever an `Option<Command<M>>` is expected.

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::core::message::Message;

type Thunk<M> = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Option<Message<M>>> + Send>;

pub struct Command<M> {
    thunk: Thunk<M>,
}

impl<M: Send + 'static> Command<M> {
    /// Wraps an async closure. The closure receives the run's cancellation
    /// scope and should watch it if it blocks for long.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Option<Message<M>>> + Send + 'static,
    {
        Self {
            thunk: Box::new(move |scope| f(scope).boxed()),
        }
    }

    /// Runs `fut` and maps its output to an application message.
    pub fn perform<Fut, T, F>(fut: Fut, map: F) -> Self
    where
        Fut: Future<Output = T> + Send + 'static,
        F: FnOnce(T) -> M + Send + 'static,
    {
        Self::new(move |_| async move { Some(Message::App(map(fut.await))) })
    }

    /// Resolves immediately to `msg`.
    pub fn message(msg: Message<M>) -> Self {
        Self::new(move |_| async move { Some(msg) })
    }

    /// Resolves immediately to `Message::App(msg)`.
    pub fn app(msg: M) -> Self {
        Self::message(Message::App(msg))
    }

    /// Resolves to `Message::Quit`.
    pub fn quit() -> Self {
        Self::message(Message::Quit)
    }

    /// Resolves to a `Batch` of the present commands.
    ///
    /// Absent commands are dropped; if none remain there is nothing to run
    /// and `None` comes back.
    pub fn batch<I>(commands: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<Command<M>>>,
    {
        Message::batch(commands).map(Self::message)
    }

    /// Runs the command to completion under `scope`.
    pub async fn execute(self, scope: CancellationToken) -> Option<Message<M>> {
        (self.thunk)(scope).await
    }
}

impl<M> fmt::Debug for Command<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command").finish_non_exhaustive()
    }
}
