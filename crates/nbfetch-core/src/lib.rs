//! nbfetch core - dataset fetcher and resource linker
//!
//! This crate downloads coursework datasets over HTTP with retry and
//! truncation checks, and mirrors read-only resource directories into a
//! working directory.

mod catalog;
mod config;
mod error;
mod fetch;
mod link;
mod release;
mod retry;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use fetch::*;
pub use link::*;
pub use retry::*;

pub use nbfetch_types as types;
pub use tokio_util::sync::CancellationToken;
