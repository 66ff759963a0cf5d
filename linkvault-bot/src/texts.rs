//! User-visible text protocol.
//!
//! The bot ships a single fixed locale. Every string a user can see lives
//! here so the dispatcher, the transport layer, and the tests share one
//! source. Button labels double as inbound text (the main reply keyboard
//! sends the label back as a plain message).

use crate::store::Link;

// Keyboard labels
pub const BTN_SAVE: &str = "Save 🔖";
pub const BTN_LIST: &str = "List 📋";
pub const BTN_DELETE: &str = "Delete ❌";
pub const BTN_GET: &str = "Get 🔍";
pub const BTN_PREV: &str = "⬅️ Предыдущая";
pub const BTN_NEXT: &str = "Следующая ➡️";

// Inline keyboard callback data
pub const CB_SAVE: &str = "save";
pub const CB_LIST: &str = "list";
pub const CB_DELETE: &str = "delete";
pub const CB_GET: &str = "get";
pub const CB_PREV: &str = "prev";
pub const CB_NEXT: &str = "next";

// Welcome
pub const GREETING: &str = "Добро пожаловать!";
pub const MENU: &str = "Доступные команды:\n\n\
Save 🔖 - сохраняет ссылку\n\
List 📋 - возвращает список ваших ссылок\n\
Delete ❌ - удаляет ссылку\n\
Get 🔍 - возвращает ссылку по её id\n\n\
Выберите команду из списка ниже:";

// Prompts
pub const PROMPT_SAVE: &str =
    "Пожалуйста, отправьте название и ссылку в формате: название ссылка.";
pub const PROMPT_DELETE: &str =
    "Пожалуйста, отправьте ID ссылки, которую вы хотите удалить.";
pub const PROMPT_GET: &str =
    "Пожалуйста, отправьте ID ссылки, которую вы хотите получить.";

pub const UNKNOWN_COMMAND: &str = "Неизвестная команда";

// Save
pub const INVALID_URL: &str = "Неверный формат URL.";
pub const SAVE_DUPLICATE: &str = "Эта ссылка уже сохранена.";
pub const SAVE_ERROR: &str = "Произошла ошибка при сохранении ссылки.";

pub fn saved(id: i64) -> String {
    format!("Ссылка сохранена! Уникальный код: {id}")
}

// List
pub const LIST_EMPTY: &str = "У вас пока нет сохранённых ссылок.";
pub const LIST_ERROR: &str = "Произошла ошибка при получении списка ссылок.";

pub fn list_header(page: i64) -> String {
    format!("Ваши сохранённые ссылки (страница {page}):\n")
}

pub fn list_entry(link: &Link) -> String {
    format!(
        "ID: {}\nНазвание: {}\nURL: {}\nСоздано: {}\n\n",
        link.id, link.name, link.url, link.created_at
    )
}

// Delete
pub const NOT_FOUND: &str = "Ссылка с таким ID не найдена.";
pub const DELETE_FORBIDDEN: &str = "Вы не можете удалить эту ссылку.";
pub const DELETED: &str = "Ссылка успешно удалена.";
pub const DELETE_ERROR: &str = "Произошла ошибка при удалении ссылки.";

// Get
pub const GET_ERROR: &str = "Произошла ошибка при получении ссылки.";

pub fn link_url(url: &str) -> String {
    format!("URL: {url}")
}
