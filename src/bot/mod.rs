//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `commands`: The command enum and the text routing predicate
//! - `command_handler`: `/start`, `/help`, `/settings`, `/history`, `/favorites`
//! - `message_handler`: Free-text course search
//! - `callback_handler`: Inline keyboard callback queries
//! - `callback_data`: Typed callback payloads
//! - `error_handler`: Central handler failure reporting
//! - `ui_builder`: Creates keyboards and formats messages
//! - `dispatch`: The dispatch table wiring updates to handlers
//! - `runtime`: Bot construction, bootstrap and the polling loop

pub mod callback_data;
pub mod callback_handler;
pub mod command_handler;
pub mod commands;
pub mod dispatch;
pub mod error_handler;
pub mod message_handler;
pub mod runtime;
pub mod ui_builder;

use sqlx::postgres::PgPool;
use std::sync::Arc;
use teloxide::types::Message;

pub use callback_handler::callback_handler;
pub use command_handler::{favorites_handler, help_handler, history_handler, settings_handler, start_handler};
pub use commands::Command;
pub use dispatch::schema;
pub use error_handler::error_handler;
pub use message_handler::search_handler;

/// Result returned by every handler
pub type HandlerResult = anyhow::Result<()>;

/// Dependencies shared by all handlers
#[derive(Clone)]
pub struct BotState {
    pub pool: Arc<PgPool>,
    /// Page size given to users on first contact
    pub default_results_per_page: u32,
}

impl BotState {
    pub fn new(pool: Arc<PgPool>, default_results_per_page: u32) -> Self {
        Self {
            pool,
            default_results_per_page,
        }
    }
}

/// Telegram id and language of whoever sent a message
///
/// Messages without a sender (channel posts) are attributed to the chat.
pub(crate) fn sender_identity(msg: &Message) -> (i64, Option<&str>) {
    match msg.from.as_ref() {
        Some(user) => (user.id.0 as i64, user.language_code.as_deref()),
        None => (msg.chat.id.0, None),
    }
}
