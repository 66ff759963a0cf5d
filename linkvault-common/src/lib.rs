//! LinkVault Common - shared configuration and logging for the LinkVault bot.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::init_logging;
