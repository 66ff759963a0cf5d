//! Per-user conversational state.

use dashmap::DashMap;

/// Conversational mode for a single user.
///
/// `Idle` is the implicit state of any user without a map entry; the
/// store never holds `Idle` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Waiting for "name url" after the Save command.
    AwaitingSaveInput,
    /// Waiting for an id after the Delete command.
    AwaitingDeleteId,
    /// Waiting for an id after the Get command.
    AwaitingGetId,
    /// Paging through the link list.
    BrowsingList { page: i64 },
}

/// In-memory session store keyed by user id.
///
/// Entries are created on demand and never expire; nothing survives a
/// process restart. Distinct users can be handled concurrently, one
/// in-flight event per user is the operating assumption.
#[derive(Debug, Default)]
pub struct SessionStore {
    states: DashMap<i64, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for a user; `Idle` when the user has no entry.
    pub fn get(&self, user_id: i64) -> SessionState {
        self.states
            .get(&user_id)
            .map_or(SessionState::Idle, |state| *state)
    }

    /// Record the user's new state. `Idle` removes the entry, keeping the
    /// map bounded by the number of users mid-interaction.
    pub fn set(&self, user_id: i64, state: SessionState) {
        match state {
            SessionState::Idle => {
                self.states.remove(&user_id);
            }
            other => {
                self.states.insert(user_id, other);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
