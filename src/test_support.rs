//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::core::command::Command;
use crate::core::message::Message;
use crate::core::model::{Model, TeardownError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderMsg {
    /// Recorded as-is.
    Mark(u32),
    /// Answered with a command that posts `Mark(n)`.
    Echo(u32),
}

/// A model that records everything it is asked to do.
#[derive(Debug, Default)]
pub struct Recorder {
    pub inputs: Vec<String>,
    pub marks: Vec<u32>,
    pub updates: usize,
    /// Mark posted by the init command.
    pub init_mark: Option<u32>,
    pub teardown_delay: Option<Duration>,
    pub teardown_fails: bool,
}

#[derive(Debug)]
struct Refused;

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recorder refused to tear down")
    }
}

impl std::error::Error for Refused {}

#[async_trait]
impl Model for Recorder {
    type Msg = RecorderMsg;

    fn init(&self) -> Option<Command<RecorderMsg>> {
        self.init_mark.map(|n| Command::app(RecorderMsg::Mark(n)))
    }

    fn update(mut self, msg: Message<RecorderMsg>) -> (Self, Option<Command<RecorderMsg>>) {
        self.updates += 1;
        let cmd = match msg {
            Message::Input(line) => {
                self.inputs.push(line);
                None
            }
            Message::App(RecorderMsg::Mark(n)) => {
                self.marks.push(n);
                None
            }
            Message::App(RecorderMsg::Echo(n)) => Some(Command::app(RecorderMsg::Mark(n))),
            Message::Quit | Message::Batch(_) => panic!("reserved message reached update"),
        };
        (self, cmd)
    }

    async fn teardown(self, _deadline: Instant) -> Result<(), TeardownError> {
        if let Some(delay) = self.teardown_delay {
            tokio::time::sleep(delay).await;
        }
        if self.teardown_fails {
            return Err(Box::new(Refused));
        }
        Ok(())
    }
}
