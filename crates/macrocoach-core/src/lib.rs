//! Core types and trait definitions for MacroCoach.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! store, the meal generator and the health-platform connectors are all
//! expressed as traits here and implemented in their own crates.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod generate;
pub mod meal;
pub mod metric;
pub mod planner;
pub mod profile;
pub mod progress;
pub mod source;
pub mod store;
pub mod target;
pub mod turn;

pub use error::{AsCoreError, Error, Result};
