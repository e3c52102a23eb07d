//! # Runtime
//!
//! Wires a `Model` to its producers and runs it to completion.
//!
//! ```text
//!  stdin ──▶ InputProducer ─┐
//!  SIGINT/TERM ─▶ signal ───┼──▶ Mailbox ──▶ event loop ──▶ Dispatch ──▶ executor
//!  finished commands ───────┘     (bounded)   (owns Model)  (unbounded)   (1 task/cmd)
//!                                                  │
//!                                     Quit ──▶ cancel scope ──▶ everyone stops
//!                                                  │
//!                                                  ▼
//!                                       teardown(deadline) → RunError?
//! ```
//!
//! `App` owns every channel and the cancellation scope. Each task gets clones
//! of only the handles it needs; nothing is global.

mod event_loop;
mod executor;
mod input;
mod mailbox;
mod signal;

use std::fmt;
use std::io;
use std::time::Duration;

use log::{info, warn};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::message::Message;
use crate::core::model::{Model, TeardownError};

pub use input::InputSource;
pub use mailbox::{DEFAULT_MAILBOX_CAPACITY, Mailbox};

use input::InputProducer;

/// Default time budget for `Model::teardown`.
pub const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Knobs applied before a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub mailbox_capacity: usize,
    pub teardown_timeout: Duration,
    /// Publish `Quit` once the input stream ends (or fails).
    pub quit_on_eof: bool,
    /// Translate SIGINT/SIGTERM into `Quit`.
    pub handle_signals: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
            quit_on_eof: false,
            handle_signals: true,
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Why a run did not end cleanly.
#[derive(Debug)]
pub enum RunError {
    /// The model's teardown reported a failure.
    Teardown(TeardownError),
    /// Teardown was still running when its budget ran out.
    TeardownTimeout(Duration),
    /// The input stream failed during the run.
    Input(io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Teardown(e) => write!(f, "teardown failed: {e}"),
            RunError::TeardownTimeout(budget) => {
                write!(f, "teardown did not finish within {budget:?}")
            }
            RunError::Input(e) => write!(f, "input stream failed: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Teardown(e) => Some(e.as_ref()),
            RunError::TeardownTimeout(_) => None,
            RunError::Input(e) => Some(e),
        }
    }
}

// ============================================================================
// App
// ============================================================================

pub struct App<M: Model> {
    model: M,
    options: RuntimeOptions,
    mailbox: Mailbox<M::Msg>,
    inbox: mpsc::Receiver<Message<M::Msg>>,
    scope: CancellationToken,
    input: Option<InputSource>,
}

impl<M: Model> App<M> {
    pub fn new(model: M) -> Self {
        Self::with_options(model, RuntimeOptions::default())
    }

    pub fn with_options(model: M, options: RuntimeOptions) -> Self {
        let (mailbox, inbox) = mailbox::channel(options.mailbox_capacity);
        Self {
            model,
            options,
            mailbox,
            inbox,
            scope: CancellationToken::new(),
            input: None,
        }
    }

    /// Runs under a child of `parent`: cancelling `parent` stops the run,
    /// while a `Quit` only stops this run.
    pub fn with_cancellation(mut self, parent: &CancellationToken) -> Self {
        self.scope = parent.child_token();
        self
    }

    /// Reads lines from `source` instead of stdin.
    pub fn with_input<R>(mut self, source: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.input = Some(Box::new(source));
        self
    }

    /// A handle for posting messages from outside the model.
    pub fn mailbox(&self) -> Mailbox<M::Msg> {
        self.mailbox.clone()
    }

    /// Runs until quit, then tears the final model down.
    pub async fn run(self) -> Result<(), RunError> {
        self.start().await.teardown().await
    }

    /// Runs until quit and hands back the final model without tearing it down.
    pub async fn start(self) -> Stopped<M> {
        let App {
            model,
            options,
            mailbox,
            inbox,
            scope,
            input,
        } = self;

        info!(
            "Starting run (mailbox capacity {}, teardown budget {:?})",
            options.mailbox_capacity, options.teardown_timeout
        );

        let (dispatch, commands) = executor::channel();
        let (errors, error_rx) = mpsc::channel(1);

        if options.handle_signals {
            tokio::spawn(signal::run(mailbox.clone(), scope.clone()));
        }

        let producer = InputProducer {
            mailbox: mailbox.clone(),
            errors,
            scope: scope.clone(),
            quit_on_eof: options.quit_on_eof,
        };
        let source: InputSource = match input {
            Some(source) => source,
            None => Box::new(tokio::io::stdin()),
        };
        tokio::spawn(producer.run(source));

        tokio::spawn(executor::run(commands, mailbox, scope.clone()));

        dispatch.send(model.init());

        let model = event_loop::run(model, inbox, dispatch, scope).await;
        Stopped {
            model,
            teardown_timeout: options.teardown_timeout,
            input_errors: error_rx,
        }
    }
}

/// A finished run whose model has not been torn down yet.
pub struct Stopped<M: Model> {
    model: M,
    teardown_timeout: Duration,
    input_errors: mpsc::Receiver<io::Error>,
}

impl<M: Model> Stopped<M> {
    /// The last model the event loop held.
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Tears the model down within the configured budget.
    ///
    /// A teardown failure wins over an input failure; the loser is logged.
    pub async fn teardown(mut self) -> Result<(), RunError> {
        let input_error = self.input_errors.try_recv().ok();
        let budget = self.teardown_timeout;
        let deadline = Instant::now() + budget;

        let outcome = match tokio::time::timeout_at(deadline, self.model.teardown(deadline)).await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RunError::Teardown(e)),
            Err(_) => Err(RunError::TeardownTimeout(budget)),
        };

        match (outcome, input_error) {
            (Ok(()), Some(e)) => Err(RunError::Input(e)),
            (Err(e), Some(input)) => {
                warn!("Input also failed during the run: {}", input);
                Err(e)
            }
            (outcome, None) => {
                if let Err(ref e) = outcome {
                    warn!("Run ended with error: {}", e);
                } else {
                    info!("Run finished cleanly");
                }
                outcome
            }
        }
    }
}
