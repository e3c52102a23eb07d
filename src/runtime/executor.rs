//! # Command Executor
//!
//! Takes commands off the dispatch channel and runs each on its own task.
//! It never waits for a command to finish; a finished command's message
//! goes back through the mailbox like everything else.
//!
//! The dispatch channel is unbounded, so the event loop never blocks
//! handing work over. The mailbox is the only bounded queue in the runtime.

use log::{debug, trace};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::command::Command;
use crate::runtime::mailbox::Mailbox;

/// Sending half of the dispatch channel, held by the event loop.
pub(crate) struct Dispatch<M> {
    tx: mpsc::UnboundedSender<Option<Command<M>>>,
}

pub(crate) fn channel<M>() -> (Dispatch<M>, mpsc::UnboundedReceiver<Option<Command<M>>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Dispatch { tx }, rx)
}

impl<M> Dispatch<M> {
    /// Hands `cmd` to the executor. `None` is passed through and dropped there.
    pub(crate) fn send(&self, cmd: Option<Command<M>>) {
        if self.tx.send(cmd).is_err() {
            debug!("Executor stopped, command dropped");
        }
    }
}

pub(crate) async fn run<M: Send + 'static>(
    mut commands: mpsc::UnboundedReceiver<Option<Command<M>>>,
    mailbox: Mailbox<M>,
    scope: CancellationToken,
) {
    let mut spawned = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            _ = scope.cancelled() => break,
            next = commands.recv() => next,
        };

        match next {
            None => break,
            Some(None) => trace!("Discarding empty command"),
            Some(Some(cmd)) => {
                spawned += 1;
                spawn(cmd, mailbox.clone(), scope.clone());
            }
        }
    }
    debug!("Command executor stopped after spawning {} commands", spawned);
}

/// Runs `cmd` on a detached task and posts its message, if any.
fn spawn<M: Send + 'static>(cmd: Command<M>, mailbox: Mailbox<M>, scope: CancellationToken) {
    tokio::spawn(async move {
        if let Some(msg) = cmd.execute(scope).await {
            mailbox.send(msg).await;
        }
    });
}
