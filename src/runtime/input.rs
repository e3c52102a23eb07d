//! # Input Producer
//!
//! Turns a line-oriented stream into `Message::Input`, one per line, in order.
//!
//! A read failure is not application state: no transition can repair a dead
//! input source. It goes out on the error channel instead of the mailbox.

use std::io;

use log::{debug, error, info};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::message::Message;
use crate::runtime::mailbox::Mailbox;

/// Boxed line source. Defaults to stdin.
pub type InputSource = Box<dyn AsyncRead + Send + Unpin>;

pub(crate) struct InputProducer<M> {
    pub mailbox: Mailbox<M>,
    pub errors: mpsc::Sender<io::Error>,
    pub scope: CancellationToken,
    /// Publish `Quit` once the stream is exhausted.
    pub quit_on_eof: bool,
}

impl<M: Send + 'static> InputProducer<M> {
    pub(crate) async fn run(self, source: InputSource) {
        let mut lines = BufReader::new(source).lines();
        let mut count = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.scope.cancelled() => {
                    debug!("Input producer cancelled after {} lines", count);
                    return;
                }
                next = lines.next_line() => next,
            };

            match next {
                Ok(Some(line)) => {
                    count += 1;
                    if !self.mailbox.send_until(Message::Input(line), &self.scope).await {
                        return;
                    }
                }
                Ok(None) => {
                    info!("Input exhausted after {} lines", count);
                    break;
                }
                Err(e) => {
                    error!("Input stream failed after {} lines: {}", count, e);
                    if self.errors.try_send(e).is_err() {
                        debug!("Input error channel full or closed");
                    }
                    break;
                }
            }
        }

        if self.quit_on_eof {
            self.mailbox.send_until(Message::Quit, &self.scope).await;
        }
    }
}
