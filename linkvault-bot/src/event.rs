//! Inbound event classification.
//!
//! Raw transport payloads (message text, callback data) are mapped to a
//! tagged event type before they reach the state machine, so the
//! dispatcher never inspects transport strings itself.

use crate::texts;

/// One of the four bookmarking commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Save,
    List,
    Delete,
    Get,
}

/// Inline keyboard button identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    Save,
    List,
    Delete,
    Get,
    Prev,
    Next,
}

/// An inbound chat event, as seen by the session dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A command selected via the main reply keyboard (button label
    /// arriving as plain text).
    Command(CommandKind),
    /// Free text that is not a command selection.
    TextReply(String),
    /// An inline keyboard button press.
    ButtonPress(ButtonKind),
}

impl Event {
    /// Classify a plain chat message.
    ///
    /// Slash-prefixed messages are reserved for command handlers (only
    /// `/start` is acted on, by the transport loop) and are never state
    /// input; they yield `None`.
    pub fn from_message(text: &str) -> Option<Self> {
        if text.starts_with('/') {
            return None;
        }

        let command = match text {
            texts::BTN_SAVE => CommandKind::Save,
            texts::BTN_LIST => CommandKind::List,
            texts::BTN_DELETE => CommandKind::Delete,
            texts::BTN_GET => CommandKind::Get,
            _ => return Some(Self::TextReply(text.to_string())),
        };

        Some(Self::Command(command))
    }

    /// Classify inline keyboard callback data. Unknown payloads are
    /// dropped (the transport still acknowledges the callback).
    pub fn from_callback(data: &str) -> Option<Self> {
        let button = match data {
            texts::CB_SAVE => ButtonKind::Save,
            texts::CB_LIST => ButtonKind::List,
            texts::CB_DELETE => ButtonKind::Delete,
            texts::CB_GET => ButtonKind::Get,
            texts::CB_PREV => ButtonKind::Prev,
            texts::CB_NEXT => ButtonKind::Next,
            _ => return None,
        };

        Some(Self::ButtonPress(button))
    }
}
