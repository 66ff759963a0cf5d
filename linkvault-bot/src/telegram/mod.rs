//! Telegram chat transport.
//!
//! Long-polls the Bot API for updates and exposes the message/keyboard
//! send surface the dispatcher needs. The dispatcher only sees the
//! `ChatTransport` trait; everything Telegram-specific stays here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::dispatcher::Dispatcher;
use crate::event::Event;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Sleep between retries after a failed poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub type TransportResult<T> = Result<T, TransportError>;

/// Transport error type.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Message send failed: {0}")]
    SendFailed(String),
}

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain text message.
    async fn send_message(&self, chat_id: i64, text: &str) -> TransportResult<()>;

    /// Send a message with the persistent reply keyboard attached.
    async fn send_with_reply_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        rows: Vec<Vec<String>>,
    ) -> TransportResult<()>;

    /// Send a message with an inline keyboard attached.
    async fn send_with_inline_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        rows: Vec<Vec<InlineButton>>,
    ) -> TransportResult<()>;

    /// Acknowledge an inline button press so the client stops its spinner.
    async fn acknowledge_callback(&self, callback_id: &str) -> TransportResult<()>;
}

/// Telegram Bot API transport.
pub struct TelegramTransport {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(bot_token: String) -> Self {
        Self::with_api_base(bot_token, DEFAULT_API_BASE.to_string())
    }

    /// Override the API base URL, used by tests to point at a local server.
    pub fn with_api_base(bot_token: String, api_base: String) -> Self {
        Self {
            bot_token,
            api_base,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// Verify the bot token with getMe before entering the poll loop.
    pub async fn init(&self) -> TransportResult<()> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(TransportError::Auth(format!("Invalid bot token: {err}")));
        }

        tracing::info!("Telegram transport initialized");
        Ok(())
    }

    async fn call(&self, method: &str, body: Value) -> TransportResult<()> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(TransportError::SendFailed(format!(
                "Telegram {method} failed: {err}"
            )));
        }

        Ok(())
    }

    /// One getUpdates long poll starting at `offset`.
    pub async fn get_updates(&self, offset: i64) -> TransportResult<Vec<Value>> {
        let body = json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message", "callback_query"],
        });

        let resp = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let data: Value = resp
            .json()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(data
            .get("result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat_id: i64, text: &str) -> TransportResult<()> {
        self.call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await
    }

    async fn send_with_reply_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        rows: Vec<Vec<String>>,
    ) -> TransportResult<()> {
        let keyboard: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(|label| json!({ "text": label })).collect())
            .collect();

        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": {
                "keyboard": keyboard,
                "resize_keyboard": true,
                "one_time_keyboard": false,
            }
        });
        self.call("sendMessage", body).await
    }

    async fn send_with_inline_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        rows: Vec<Vec<InlineButton>>,
    ) -> TransportResult<()> {
        let keyboard: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|btn| {
                        json!({
                            "text": btn.text,
                            "callback_data": btn.callback_data,
                        })
                    })
                    .collect()
            })
            .collect();

        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": {
                "inline_keyboard": keyboard,
            }
        });
        self.call("sendMessage", body).await
    }

    async fn acknowledge_callback(&self, callback_id: &str) -> TransportResult<()> {
        self.call(
            "answerCallbackQuery",
            json!({ "callback_query_id": callback_id }),
        )
        .await
    }
}

/// Drive the bot: long-poll getUpdates and feed every update through the
/// dispatcher. Runs until the process stops; poll failures are logged and
/// retried after a short delay.
pub async fn run(
    transport: Arc<TelegramTransport>,
    dispatcher: Arc<Dispatcher>,
) -> TransportResult<()> {
    transport.init().await?;

    let mut offset: i64 = 0;
    tracing::info!("Telegram transport listening for updates...");

    loop {
        let updates = match transport.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!("Telegram poll error: {e}");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                offset = uid + 1;
            }
            handle_update(&transport, &dispatcher, &update).await;
        }
    }
}

async fn handle_update(transport: &TelegramTransport, dispatcher: &Dispatcher, update: &Value) {
    if let Some(callback) = update.get("callback_query") {
        handle_callback(transport, dispatcher, callback).await;
        return;
    }

    let Some(message) = update.get("message") else {
        return;
    };
    let Some(chat_id) = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
    else {
        return;
    };
    let Some(user_id) = message
        .get("from")
        .and_then(|f| f.get("id"))
        .and_then(Value::as_i64)
    else {
        return;
    };
    let Some(text) = message.get("text").and_then(Value::as_str) else {
        return;
    };

    tracing::info!(user_id, chat_id, text = %text, "message received");

    if text.starts_with('/') {
        // Only the welcome command is handled; other slash commands are
        // reserved and ignored.
        if text.starts_with("/start") {
            if let Err(e) = dispatcher.handle_start(chat_id).await {
                tracing::error!(chat_id, "Failed to send welcome: {e}");
            }
        }
        return;
    }

    let Some(event) = Event::from_message(text) else {
        return;
    };
    if let Err(e) = dispatcher.dispatch(chat_id, user_id, event).await {
        tracing::error!(user_id, "Failed to handle message: {e}");
    }
}

async fn handle_callback(transport: &TelegramTransport, dispatcher: &Dispatcher, callback: &Value) {
    let Some(callback_id) = callback.get("id").and_then(Value::as_str) else {
        return;
    };

    let chat_id = callback
        .get("message")
        .and_then(|m| m.get("chat"))
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64);
    let user_id = callback
        .get("from")
        .and_then(|f| f.get("id"))
        .and_then(Value::as_i64);
    let data = callback.get("data").and_then(Value::as_str);

    if let (Some(chat_id), Some(user_id), Some(data)) = (chat_id, user_id, data) {
        tracing::info!(user_id, chat_id, data = %data, "button press received");

        if let Some(event) = Event::from_callback(data) {
            if let Err(e) = dispatcher.dispatch(chat_id, user_id, event).await {
                tracing::error!(user_id, "Failed to handle button press: {e}");
            }
        }
    }

    // Always acknowledged, including payloads the dispatcher ignores.
    if let Err(e) = transport.acknowledge_callback(callback_id).await {
        tracing::warn!("Failed to acknowledge callback: {e}");
    }
}
