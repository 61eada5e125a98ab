//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InlineKeyboardMarkup, MessageId};
use tracing::{debug, info, warn};

use crate::db::{self, User};
use crate::localization::t_lang;

use super::callback_data::CallbackAction;
use super::message_handler::send_search_page;
use super::ui_builder::{create_favorites_keyboard, create_settings_keyboard, format_favorites, format_settings};
use super::{BotState, HandlerResult};

/// Handle callback queries from inline keyboards
///
/// The query is always answered, with a toast when the action produced one.
/// Action errors are returned after answering.
pub async fn callback_handler(bot: Bot, q: CallbackQuery, state: BotState) -> HandlerResult {
    let data = q.data.as_deref().unwrap_or_default();
    debug!(user_id = %q.from.id, data, "Received callback query");

    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(e) => {
            warn!(user_id = %q.from.id, error = %e, "Ignoring callback query");
            answer(&bot, &q, None).await;
            return Ok(());
        }
    };

    let result = handle_action(&bot, &q, &state, action).await;
    let toast = result.as_ref().ok().cloned().flatten();
    answer(&bot, &q, toast).await;

    result.map(|_| ())
}

async fn answer(bot: &Bot, q: &CallbackQuery, toast: Option<String>) {
    let mut request = bot.answer_callback_query(q.id.clone());
    if let Some(text) = toast {
        request = request.text(text);
    }
    if let Err(e) = request.await {
        warn!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }
}

/// Run one action and return the toast to show
async fn handle_action(
    bot: &Bot,
    q: &CallbackQuery,
    state: &BotState,
    action: CallbackAction,
) -> Result<Option<String>> {
    let pool = state.pool.as_ref();
    let mut user = db::get_or_create_user(
        pool,
        q.from.id.0 as i64,
        q.from.language_code.as_deref(),
        state.default_results_per_page,
    )
    .await?;

    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user.telegram_id));
    let message_id = q.message.as_ref().map(|m| m.id());

    match action {
        CallbackAction::AddFavorite { course_id } => {
            if db::get_course(pool, course_id).await?.is_none() {
                return Ok(Some(expired(&user)));
            }
            let added = db::add_favorite(pool, user.id, course_id).await?;
            debug!(user_id = user.id, course_id, added, "Favorite add requested");
            let key = if added { "favorite-added" } else { "favorite-exists" };
            Ok(Some(t_lang(key, Some(user.language_code.as_str()))))
        }
        CallbackAction::RemoveFavorite { course_id } => {
            let removed = db::remove_favorite(pool, user.id, course_id).await?;
            if !removed {
                return Ok(Some(t_lang("favorite-missing", Some(user.language_code.as_str()))));
            }

            let language = Some(user.language_code.as_str());
            let favorites = db::list_favorites(pool, user.id, db::FAVORITES_LIMIT).await?;
            refresh_message(
                bot,
                chat_id,
                message_id,
                format_favorites(&favorites, language),
                create_favorites_keyboard(&favorites, language),
            )
            .await;
            Ok(Some(t_lang("favorite-removed", language)))
        }
        CallbackAction::MoreResults { history_id, offset } => {
            match db::get_search_entry(pool, user.id, history_id).await? {
                Some(entry) => {
                    send_search_page(bot, pool, chat_id, &user, &entry, offset).await?;
                    Ok(None)
                }
                None => Ok(Some(expired(&user))),
            }
        }
        CallbackAction::Rerun { history_id } => match db::get_search_entry(pool, user.id, history_id).await? {
            Some(entry) => {
                info!(user_id = user.id, history_id, "Re-running search");
                send_search_page(bot, pool, chat_id, &user, &entry, 0).await?;
                Ok(None)
            }
            None => Ok(Some(expired(&user))),
        },
        CallbackAction::ClearHistory => {
            db::clear_search_history(pool, user.id).await?;
            let language = Some(user.language_code.as_str());
            refresh_message(
                bot,
                chat_id,
                message_id,
                t_lang("history-empty", language),
                InlineKeyboardMarkup::default(),
            )
            .await;
            Ok(Some(t_lang("history-cleared", language)))
        }
        CallbackAction::SetPageSize(size) => {
            if user.results_per_page != size as i32 {
                db::update_results_per_page(pool, user.id, size).await?;
                user.results_per_page = size as i32;
                refresh_settings(bot, chat_id, message_id, &user).await;
            }
            Ok(Some(t_lang("settings-updated", Some(user.language_code.as_str()))))
        }
        CallbackAction::SetLanguage(code) => {
            if user.language_code != code {
                db::update_user_language(pool, user.id, &code).await?;
                user.language_code = code;
                refresh_settings(bot, chat_id, message_id, &user).await;
            }
            Ok(Some(t_lang("settings-updated", Some(user.language_code.as_str()))))
        }
    }
}

fn expired(user: &User) -> String {
    t_lang("callback-expired", Some(user.language_code.as_str()))
}

async fn refresh_settings(bot: &Bot, chat_id: ChatId, message_id: Option<MessageId>, user: &User) {
    refresh_message(
        bot,
        chat_id,
        message_id,
        format_settings(user),
        create_settings_keyboard(user),
    )
    .await;
}

/// Replace the text and keyboard of the message the button belongs to
///
/// Editing is best effort: the message may be too old or gone.
async fn refresh_message(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    text: String,
    keyboard: InlineKeyboardMarkup,
) {
    let Some(message_id) = message_id else {
        debug!(chat_id = %chat_id, "Callback message is not accessible, skipping edit");
        return;
    };

    match bot
        .edit_message_text(chat_id, message_id, text)
        .reply_markup(keyboard)
        .await
    {
        Ok(_) => debug!(chat_id = %chat_id, message_id = message_id.0, "Message updated"),
        Err(e) => warn!(chat_id = %chat_id, error = %e, "Failed to update message"),
    }
}
