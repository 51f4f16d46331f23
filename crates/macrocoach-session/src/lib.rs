//! `macrocoach-session`: the chat front door.
//!
//! A message is parsed into a [`Command`], dispatched against the store, the
//! planner and the meal service, and answered with plain text. The session
//! keeps no state between turns; everything it needs is read from the store.

mod format;

pub mod command;
pub mod error;
pub mod payload;
pub mod session;

pub use command::Command;
pub use error::{Result, SessionError};
pub use session::{CoachSession, SessionConfig, StatusReport};
