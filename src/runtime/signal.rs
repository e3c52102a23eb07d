//! # Signal Producer
//!
//! Maps SIGINT (and SIGTERM on unix) to `Message::Quit`, once per signal,
//! until the scope trips. A repeated signal gets no fast path: shutdown
//! time is bounded by the teardown budget instead.

use std::io;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::core::message::Message;
use crate::runtime::mailbox::Mailbox;

pub(crate) async fn run<M: Send + 'static>(mailbox: Mailbox<M>, scope: CancellationToken) {
    match Signals::new() {
        Ok(signals) => forward(signals, mailbox, scope).await,
        Err(e) => warn!("Could not subscribe to termination signals: {}", e),
    }
}

/// Listeners are installed by `Signals::new`, so anything delivered while
/// this loop waits on the mailbox stays queued for the next `recv`.
async fn forward<M: Send + 'static>(
    mut signals: Signals,
    mailbox: Mailbox<M>,
    scope: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            biased;
            _ = scope.cancelled() => break,
            received = signals.recv() => received,
        };

        match received {
            Ok(name) => {
                info!("Received {}, requesting quit", name);
                if !mailbox.send_until(Message::Quit, &scope).await {
                    break;
                }
            }
            Err(e) => {
                warn!("Signal listener failed: {}", e);
                break;
            }
        }
    }
    debug!("Signal producer stopped");
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn new() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> io::Result<&'static str> {
        let name = tokio::select! {
            Some(()) = self.interrupt.recv() => "SIGINT",
            Some(()) = self.terminate.recv() => "SIGTERM",
            else => return Err(io::Error::other("signal streams closed")),
        };
        Ok(name)
    }
}

#[cfg(windows)]
struct Signals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl Signals {
    fn new() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> io::Result<&'static str> {
        match self.ctrl_c.recv().await {
            Some(()) => Ok("Ctrl-C"),
            None => Err(io::Error::other("signal stream closed")),
        }
    }
}
