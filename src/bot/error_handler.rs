//! Central reporting of handler failures

use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind};
use tracing::{error, info, warn};

/// Fixed apology sent to the user when a handler fails
pub const APOLOGY_MESSAGE: &str =
    "⚠️ Something went wrong. Please try again later.\nIf the problem persists, contact support.";

/// Chat to apologize in, if the update carries a message we can answer
pub fn reply_target(update: &Update) -> Option<ChatId> {
    match &update.kind {
        UpdateKind::Message(msg)
        | UpdateKind::EditedMessage(msg)
        | UpdateKind::ChannelPost(msg)
        | UpdateKind::EditedChannelPost(msg) => Some(msg.chat.id),
        UpdateKind::CallbackQuery(q) => q.message.as_ref().map(|m| m.chat().id),
        _ => None,
    }
}

/// Short name of the update's kind for log fields
pub fn update_kind(update: &Update) -> &'static str {
    match &update.kind {
        UpdateKind::Message(_) => "message",
        UpdateKind::EditedMessage(_) => "edited_message",
        UpdateKind::ChannelPost(_) => "channel_post",
        UpdateKind::EditedChannelPost(_) => "edited_channel_post",
        UpdateKind::CallbackQuery(_) => "callback_query",
        _ => "other",
    }
}

/// Log a handler failure and apologize to the user once
///
/// Never fails: a failed apology is only logged.
pub async fn error_handler(bot: &Bot, update: Option<&Update>, error: &anyhow::Error) {
    let update_id = update.map(|u| u.id.0);
    let kind = update.map(update_kind);
    let target = update.and_then(reply_target);
    error!(
        update_id = ?update_id,
        kind = ?kind,
        chat_id = ?target.map(|c| c.0),
        error = %format!("{error:#}"),
        "Exception while handling an update"
    );

    let Some(chat_id) = target else {
        return;
    };

    match bot.send_message(chat_id, APOLOGY_MESSAGE).await {
        Ok(_) => info!(chat_id = %chat_id, "Sent error apology"),
        Err(e) => warn!(chat_id = %chat_id, error = %e, "Failed to send error apology"),
    }
}
