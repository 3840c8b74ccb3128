//! Core domain + application logic for the group manager bot.
//!
//! This crate is framework-agnostic. Telegram lives behind ports (traits)
//! implemented in the adapter crate.

pub mod audit;
pub mod commands;
pub mod config;
pub mod domain;
pub mod duration;
pub mod errors;
pub mod events;
pub mod formatting;
pub mod logging;
pub mod manager;
pub mod messaging;
pub mod protection;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
pub use manager::{GroupManager, ProtectionSettings};
