//! Session dispatcher: the conversational state machine.
//!
//! `transition` is a pure function from (state, event) to (new state,
//! effects); `Dispatcher` executes the effects against the link store and
//! the chat transport. Keeping the transition pure means every edge of
//! the machine is testable without I/O.

use std::sync::Arc;

use url::Url;

use crate::event::{ButtonKind, CommandKind, Event};
use crate::session::{SessionState, SessionStore};
use crate::store::{LinkStore, StoreError};
use crate::telegram::{ChatTransport, InlineButton, TransportResult};
use crate::texts;

/// Links rendered per list page.
pub const PAGE_SIZE: i64 = 5;

/// Side effect requested by a transition, executed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a plain reply.
    Reply(String),
    /// Run the save action on the raw "name url" input.
    Save { text: String },
    /// Fetch and render one page of the user's links.
    List { page: i64 },
    /// Run the delete action on the raw id input.
    Delete { text: String },
    /// Look up a link by raw id input.
    Get { text: String },
}

/// Advance the state machine. Pure: no I/O, no session map access.
pub fn transition(state: SessionState, event: &Event) -> (SessionState, Vec<Effect>) {
    match event {
        Event::Command(kind) => select_command(*kind),
        Event::ButtonPress(button) => match button {
            ButtonKind::Save => select_command(CommandKind::Save),
            ButtonKind::List => select_command(CommandKind::List),
            ButtonKind::Delete => select_command(CommandKind::Delete),
            ButtonKind::Get => select_command(CommandKind::Get),
            ButtonKind::Prev | ButtonKind::Next => page_turn(state, *button),
        },
        Event::TextReply(text) => match state {
            SessionState::AwaitingSaveInput => {
                (SessionState::Idle, vec![Effect::Save { text: text.clone() }])
            }
            SessionState::AwaitingDeleteId => {
                (SessionState::Idle, vec![Effect::Delete { text: text.clone() }])
            }
            SessionState::AwaitingGetId => {
                (SessionState::Idle, vec![Effect::Get { text: text.clone() }])
            }
            // A stray message with no pending prompt is not state input.
            other => (
                other,
                vec![Effect::Reply(texts::UNKNOWN_COMMAND.to_string())],
            ),
        },
    }
}

/// Selecting a command overwrites whatever state the user was in.
fn select_command(kind: CommandKind) -> (SessionState, Vec<Effect>) {
    match kind {
        CommandKind::Save => (
            SessionState::AwaitingSaveInput,
            vec![Effect::Reply(texts::PROMPT_SAVE.to_string())],
        ),
        CommandKind::List => (
            SessionState::BrowsingList { page: 1 },
            vec![Effect::List { page: 1 }],
        ),
        CommandKind::Delete => (
            SessionState::AwaitingDeleteId,
            vec![Effect::Reply(texts::PROMPT_DELETE.to_string())],
        ),
        CommandKind::Get => (
            SessionState::AwaitingGetId,
            vec![Effect::Reply(texts::PROMPT_GET.to_string())],
        ),
    }
}

fn page_turn(state: SessionState, button: ButtonKind) -> (SessionState, Vec<Effect>) {
    let SessionState::BrowsingList { page } = state else {
        // A stale prev/next button pressed outside a list view; drop it.
        return (state, vec![]);
    };

    let page = match button {
        ButtonKind::Prev => (page - 1).max(1),
        _ => page + 1,
    };

    (
        SessionState::BrowsingList { page },
        vec![Effect::List { page }],
    )
}

/// Integer-prefix parse: leading whitespace skipped, optional sign, then a
/// digit run; trailing garbage is accepted ("12abc" parses as 12). `None`
/// when there are no digits.
pub fn parse_id(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return None;
    }

    let value = digits.parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

/// Main reply keyboard rows (labels only).
pub fn main_keyboard() -> Vec<Vec<String>> {
    vec![
        vec![texts::BTN_SAVE.to_string(), texts::BTN_LIST.to_string()],
        vec![texts::BTN_DELETE.to_string(), texts::BTN_GET.to_string()],
    ]
}

/// Inline keyboard with the four command buttons.
pub fn menu_keyboard() -> Vec<Vec<InlineButton>> {
    vec![
        vec![
            InlineButton::new(texts::BTN_SAVE, texts::CB_SAVE),
            InlineButton::new(texts::BTN_LIST, texts::CB_LIST),
        ],
        vec![
            InlineButton::new(texts::BTN_DELETE, texts::CB_DELETE),
            InlineButton::new(texts::BTN_GET, texts::CB_GET),
        ],
    ]
}

/// Inline keyboard attached to list pages.
pub fn paging_keyboard() -> Vec<Vec<InlineButton>> {
    vec![vec![
        InlineButton::new(texts::BTN_PREV, texts::CB_PREV),
        InlineButton::new(texts::BTN_NEXT, texts::CB_NEXT),
    ]]
}

/// Owns the session map and executes transition effects.
pub struct Dispatcher {
    sessions: SessionStore,
    store: Arc<dyn LinkStore>,
    transport: Arc<dyn ChatTransport>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn LinkStore>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            sessions: SessionStore::new(),
            store,
            transport,
        }
    }

    /// Current session state for a user (`Idle` when none).
    pub fn session_state(&self, user_id: i64) -> SessionState {
        self.sessions.get(user_id)
    }

    /// Handle one inbound event for a user: advance the session, then run
    /// the produced effects in order.
    ///
    /// The session is advanced before any store or transport call, so a
    /// failed action still leaves the machine in its post-transition
    /// state.
    pub async fn dispatch(&self, chat_id: i64, user_id: i64, event: Event) -> TransportResult<()> {
        let state = self.sessions.get(user_id);
        let (next, effects) = transition(state, &event);
        self.sessions.set(user_id, next);

        for effect in effects {
            self.run_effect(chat_id, user_id, effect).await?;
        }
        Ok(())
    }

    /// `/start`: greeting with the main reply keyboard, then the command
    /// menu with its inline keyboard.
    pub async fn handle_start(&self, chat_id: i64) -> TransportResult<()> {
        self.transport
            .send_with_reply_keyboard(chat_id, texts::GREETING, main_keyboard())
            .await?;
        self.transport
            .send_with_inline_keyboard(chat_id, texts::MENU, menu_keyboard())
            .await
    }

    async fn run_effect(&self, chat_id: i64, user_id: i64, effect: Effect) -> TransportResult<()> {
        match effect {
            Effect::Reply(text) => self.transport.send_message(chat_id, &text).await,
            Effect::Save { text } => self.save(chat_id, user_id, &text).await,
            Effect::List { page } => self.list(chat_id, user_id, page).await,
            Effect::Delete { text } => self.delete(chat_id, user_id, &text).await,
            Effect::Get { text } => self.get(chat_id, &text).await,
        }
    }

    async fn save(&self, chat_id: i64, user_id: i64, text: &str) -> TransportResult<()> {
        let mut tokens = text.split_whitespace();
        let (Some(name), Some(raw_url)) = (tokens.next(), tokens.next()) else {
            // Missing name or url: re-send the format prompt, no store call.
            return self.transport.send_message(chat_id, texts::PROMPT_SAVE).await;
        };

        if Url::parse(raw_url).is_err() {
            return self.transport.send_message(chat_id, texts::INVALID_URL).await;
        }

        let reply = match self.store.create(name, raw_url, user_id).await {
            Ok(link) => texts::saved(link.id),
            Err(StoreError::DuplicateUrl) => texts::SAVE_DUPLICATE.to_string(),
            Err(err) => {
                tracing::error!(user_id, error = %err, "link save failed");
                texts::SAVE_ERROR.to_string()
            }
        };
        self.transport.send_message(chat_id, &reply).await
    }

    async fn list(&self, chat_id: i64, user_id: i64, page: i64) -> TransportResult<()> {
        let offset = (page - 1) * PAGE_SIZE;
        let links = match self.store.find_by_user(user_id, offset, PAGE_SIZE).await {
            Ok(links) => links,
            Err(err) => {
                tracing::error!(user_id, page, error = %err, "link list failed");
                return self.transport.send_message(chat_id, texts::LIST_ERROR).await;
            }
        };

        // Paging past the end lands here too; same message, not an error.
        if links.is_empty() {
            return self.transport.send_message(chat_id, texts::LIST_EMPTY).await;
        }

        let mut body = texts::list_header(page);
        for link in &links {
            body.push_str(&texts::list_entry(link));
        }

        self.transport
            .send_with_inline_keyboard(chat_id, &body, paging_keyboard())
            .await
    }

    async fn delete(&self, chat_id: i64, user_id: i64, text: &str) -> TransportResult<()> {
        let Some(id) = parse_id(text) else {
            // No digits at all behaves like a missed lookup.
            return self.transport.send_message(chat_id, texts::NOT_FOUND).await;
        };

        let reply = match self.store.find_by_id(id).await {
            Ok(None) => texts::NOT_FOUND.to_string(),
            Ok(Some(link)) if link.user_id != user_id => texts::DELETE_FORBIDDEN.to_string(),
            Ok(Some(_)) => match self.store.delete_by_id(id).await {
                Ok(()) => texts::DELETED.to_string(),
                Err(err) => {
                    tracing::error!(user_id, id, error = %err, "link delete failed");
                    texts::DELETE_ERROR.to_string()
                }
            },
            Err(err) => {
                tracing::error!(user_id, id, error = %err, "link lookup failed");
                texts::DELETE_ERROR.to_string()
            }
        };
        self.transport.send_message(chat_id, &reply).await
    }

    async fn get(&self, chat_id: i64, text: &str) -> TransportResult<()> {
        let Some(id) = parse_id(text) else {
            return self.transport.send_message(chat_id, texts::NOT_FOUND).await;
        };

        // No ownership check: any user may fetch any link by id.
        let reply = match self.store.find_by_id(id).await {
            Ok(Some(link)) => texts::link_url(&link.url),
            Ok(None) => texts::NOT_FOUND.to_string(),
            Err(err) => {
                tracing::error!(id, error = %err, "link lookup failed");
                texts::GET_ERROR.to_string()
            }
        };
        self.transport.send_message(chat_id, &reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_selection_overwrites_any_state() {
        let states = [
            SessionState::Idle,
            SessionState::AwaitingSaveInput,
            SessionState::AwaitingDeleteId,
            SessionState::AwaitingGetId,
            SessionState::BrowsingList { page: 4 },
        ];

        for state in states {
            let (next, effects) = transition(state, &Event::Command(CommandKind::Save));
            assert_eq!(next, SessionState::AwaitingSaveInput);
            assert_eq!(effects, vec![Effect::Reply(texts::PROMPT_SAVE.to_string())]);

            let (next, effects) = transition(state, &Event::Command(CommandKind::List));
            assert_eq!(next, SessionState::BrowsingList { page: 1 });
            assert_eq!(effects, vec![Effect::List { page: 1 }]);

            let (next, _) = transition(state, &Event::Command(CommandKind::Delete));
            assert_eq!(next, SessionState::AwaitingDeleteId);

            let (next, _) = transition(state, &Event::Command(CommandKind::Get));
            assert_eq!(next, SessionState::AwaitingGetId);
        }
    }

    #[test]
    fn inline_buttons_select_commands_too() {
        let (next, effects) =
            transition(SessionState::Idle, &Event::ButtonPress(ButtonKind::List));
        assert_eq!(next, SessionState::BrowsingList { page: 1 });
        assert_eq!(effects, vec![Effect::List { page: 1 }]);
    }

    #[test]
    fn text_reply_resolves_pending_prompt_then_idles() {
        let (next, effects) = transition(
            SessionState::AwaitingSaveInput,
            &Event::TextReply("name https://example.com".into()),
        );
        assert_eq!(next, SessionState::Idle);
        assert_eq!(
            effects,
            vec![Effect::Save {
                text: "name https://example.com".into()
            }]
        );

        let (next, effects) =
            transition(SessionState::AwaitingDeleteId, &Event::TextReply("7".into()));
        assert_eq!(next, SessionState::Idle);
        assert_eq!(effects, vec![Effect::Delete { text: "7".into() }]);

        let (next, effects) =
            transition(SessionState::AwaitingGetId, &Event::TextReply("7".into()));
        assert_eq!(next, SessionState::Idle);
        assert_eq!(effects, vec![Effect::Get { text: "7".into() }]);
    }

    #[test]
    fn stray_text_is_unknown_command() {
        let (next, effects) = transition(SessionState::Idle, &Event::TextReply("hi".into()));
        assert_eq!(next, SessionState::Idle);
        assert_eq!(
            effects,
            vec![Effect::Reply(texts::UNKNOWN_COMMAND.to_string())]
        );

        // Browsing is not a pending prompt either; state is kept.
        let state = SessionState::BrowsingList { page: 2 };
        let (next, effects) = transition(state, &Event::TextReply("hi".into()));
        assert_eq!(next, state);
        assert_eq!(
            effects,
            vec![Effect::Reply(texts::UNKNOWN_COMMAND.to_string())]
        );
    }

    #[test]
    fn paging_moves_and_clamps() {
        let (next, effects) = transition(
            SessionState::BrowsingList { page: 2 },
            &Event::ButtonPress(ButtonKind::Next),
        );
        assert_eq!(next, SessionState::BrowsingList { page: 3 });
        assert_eq!(effects, vec![Effect::List { page: 3 }]);

        let (next, effects) = transition(
            SessionState::BrowsingList { page: 2 },
            &Event::ButtonPress(ButtonKind::Prev),
        );
        assert_eq!(next, SessionState::BrowsingList { page: 1 });
        assert_eq!(effects, vec![Effect::List { page: 1 }]);

        // Lower bound clamps to 1 and still re-fetches.
        let (next, effects) = transition(
            SessionState::BrowsingList { page: 1 },
            &Event::ButtonPress(ButtonKind::Prev),
        );
        assert_eq!(next, SessionState::BrowsingList { page: 1 });
        assert_eq!(effects, vec![Effect::List { page: 1 }]);
    }

    #[test]
    fn stale_paging_buttons_are_dropped() {
        for state in [
            SessionState::Idle,
            SessionState::AwaitingSaveInput,
            SessionState::AwaitingGetId,
        ] {
            let (next, effects) = transition(state, &Event::ButtonPress(ButtonKind::Next));
            assert_eq!(next, state);
            assert!(effects.is_empty());
        }
    }

    #[test]
    fn parse_id_accepts_digit_prefix() {
        assert_eq!(parse_id("12"), Some(12));
        assert_eq!(parse_id("  42  "), Some(42));
        assert_eq!(parse_id("12abc"), Some(12));
        assert_eq!(parse_id("+7"), Some(7));
        assert_eq!(parse_id("-3"), Some(-3));
    }

    #[test]
    fn parse_id_rejects_digitless_input() {
        assert_eq!(parse_id(""), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("abc12"), None);
        assert_eq!(parse_id("-"), None);
    }

    #[test]
    fn parse_id_treats_overflow_as_no_id() {
        // A digit run too large for i64 behaves like a missed lookup.
        assert_eq!(parse_id("99999999999999999999"), None);
        assert_eq!(parse_id(&format!("{}0", i64::MAX)), None);
        assert_eq!(parse_id(&i64::MAX.to_string()), Some(i64::MAX));
    }

    #[test]
    fn keyboards_have_the_expected_shape() {
        assert_eq!(main_keyboard(), vec![
            vec![texts::BTN_SAVE.to_string(), texts::BTN_LIST.to_string()],
            vec![texts::BTN_DELETE.to_string(), texts::BTN_GET.to_string()],
        ]);

        let menu = menu_keyboard();
        assert_eq!(menu.len(), 2);
        assert_eq!(menu[0][0].callback_data, texts::CB_SAVE);
        assert_eq!(menu[1][1].callback_data, texts::CB_GET);

        let paging = paging_keyboard();
        assert_eq!(paging.len(), 1);
        assert_eq!(paging[0][0].callback_data, texts::CB_PREV);
        assert_eq!(paging[0][1].callback_data, texts::CB_NEXT);
    }
}
