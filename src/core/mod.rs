//! # Core Types
//!
//! The vocabulary shared by the runtime and every application built on it.
//! Nothing here does I/O or spawns tasks.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • Message (events)     │
//!                    │  • Command (effects)    │
//!                    │  • Model (state+update) │
//!                    │                         │
//!                    │  No I/O. No tasks.      │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │  Runtime   │      │  Journal   │      │   Your     │
//!     │ (tokio)    │      │  (demo)    │      │   app      │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`message`]: The `Message` enum, everything that can happen
//! - [`command`]: The `Command` type, deferred work yielding a message
//! - [`model`]: The `Model` trait, what the runtime needs from an app
//! - [`config`]: Settings file, env vars and CLI overrides

pub mod command;
pub mod config;
pub mod message;
pub mod model;

pub use command::Command;
pub use message::Message;
pub use model::{Model, TeardownError};
