//! # Event Loop
//!
//! The reducer. It is the only reader of the mailbox and the only owner of
//! the model, so transitions happen strictly one at a time.
//!
//! ```text
//!             ┌──────────── Running ────────────┐
//!   Quit  ──▶ │ trip scope                      │
//!   Batch ──▶ │ dispatch each command           │
//!   other ──▶ │ update(), dispatch its command  │
//!             └──────────────┬──────────────────┘
//!                            │ scope observed at select
//!                            ▼
//!                        Cancelled → return model
//! ```
//!
//! The select is biased towards cancellation. Once the scope trips, nothing
//! else queued in the mailbox is processed, so a `Quit` is always the last
//! message handled.

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::message::Message;
use crate::core::model::Model;
use crate::runtime::executor::Dispatch;

pub(crate) async fn run<M: Model>(
    mut model: M,
    mut inbox: mpsc::Receiver<Message<M::Msg>>,
    dispatch: Dispatch<M::Msg>,
    scope: CancellationToken,
) -> M {
    let mut processed = 0usize;
    loop {
        let msg = tokio::select! {
            biased;
            _ = scope.cancelled() => {
                info!("Event loop cancelled after {} messages", processed);
                return model;
            }
            msg = inbox.recv() => msg,
        };

        let Some(msg) = msg else {
            warn!("Mailbox closed with no senders left, stopping event loop");
            return model;
        };
        processed += 1;

        match msg {
            Message::Quit => {
                info!("Quit received, cancelling run");
                scope.cancel();
            }
            Message::Batch(commands) => {
                debug!("Expanding batch of {} commands", commands.len());
                for cmd in commands {
                    dispatch.send(Some(cmd));
                }
            }
            msg => {
                let (next, cmd) = model.update(msg);
                model = next;
                dispatch.send(cmd);
            }
        }
    }
}
