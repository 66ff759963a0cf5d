//! LinkVault Bot - Telegram front-end for a personal link-bookmarking
//! service.
//!
//! ## Architecture
//!
//! ```text
//! Telegram → getUpdates poll → Event classification
//!                                    ↓
//!                     transition(state, event) → effects
//!                                    ↓
//!                     Dispatcher → LinkStore (SQLite)
//!                          ↓
//!                    ChatTransport → sendMessage
//! ```
//!
//! The state machine lives in `dispatcher::transition` as a pure function;
//! the transport and the store are trait objects injected into the
//! dispatcher, so the whole conversational flow is testable without
//! Telegram or a database file.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod dispatcher;
pub mod event;
pub mod session;
pub mod store;
pub mod telegram;
pub mod texts;

// Re-export commonly used types
pub use dispatcher::{transition, Dispatcher, Effect, PAGE_SIZE};
pub use event::{ButtonKind, CommandKind, Event};
pub use session::{SessionState, SessionStore};
pub use store::{Link, LinkStore, SqliteLinkStore, StoreError, StoreResult};
pub use telegram::{
    ChatTransport, InlineButton, TelegramTransport, TransportError, TransportResult,
};
