//! Command Handler module for the bot's slash commands

use teloxide::prelude::*;
use tracing::{debug, info};

use crate::db;
use crate::localization::{t_args_lang, t_lang};

use super::ui_builder::{
    create_favorites_keyboard, create_history_keyboard, create_settings_keyboard, format_favorites, format_history,
    format_settings,
};
use super::{sender_identity, BotState, HandlerResult};

/// Register the user and greet them
pub async fn start_handler(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let (telegram_id, telegram_language) = sender_identity(&msg);
    let user = db::get_or_create_user(
        &state.pool,
        telegram_id,
        telegram_language,
        state.default_results_per_page,
    )
    .await?;
    info!(user_id = user.id, telegram_id, "User started the bot");

    let language = Some(user.language_code.as_str());
    let name = msg
        .from
        .as_ref()
        .map(|u| u.first_name.clone())
        .unwrap_or_default();

    let welcome_message = format!(
        "👋 {}\n\n{}\n\n{}",
        t_args_lang("welcome-title", &[("name", name.as_str())], language),
        t_lang("welcome-description", language),
        t_lang("welcome-commands", language)
    );
    bot.send_message(msg.chat.id, welcome_message).await?;

    Ok(())
}

/// Explain how to search. Uses the Telegram language since no lookup is needed.
pub async fn help_handler(bot: Bot, msg: Message) -> HandlerResult {
    let (_, language) = sender_identity(&msg);
    debug!(chat_id = %msg.chat.id, "Sending help");

    let help_message = [
        format!("📖 {}", t_lang("help-title", language)),
        t_lang("help-text", language),
        t_lang("help-commands", language),
    ]
    .join("\n\n");
    bot.send_message(msg.chat.id, help_message).await?;

    Ok(())
}

/// Show the current settings with a keyboard to change them
pub async fn settings_handler(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let (telegram_id, telegram_language) = sender_identity(&msg);
    let user = db::get_or_create_user(
        &state.pool,
        telegram_id,
        telegram_language,
        state.default_results_per_page,
    )
    .await?;

    bot.send_message(msg.chat.id, format_settings(&user))
        .reply_markup(create_settings_keyboard(&user))
        .await?;

    Ok(())
}

/// List recent searches with re-run buttons
pub async fn history_handler(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let (telegram_id, telegram_language) = sender_identity(&msg);
    let user = db::get_or_create_user(
        &state.pool,
        telegram_id,
        telegram_language,
        state.default_results_per_page,
    )
    .await?;
    let language = Some(user.language_code.as_str());

    let entries = db::list_search_history(&state.pool, user.id, db::HISTORY_LIMIT).await?;
    debug!(user_id = user.id, entries = entries.len(), "Showing search history");

    let mut request = bot.send_message(msg.chat.id, format_history(&entries, language));
    if !entries.is_empty() {
        request = request.reply_markup(create_history_keyboard(&entries, language));
    }
    request.await?;

    Ok(())
}

/// List saved courses with remove buttons
pub async fn favorites_handler(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let (telegram_id, telegram_language) = sender_identity(&msg);
    let user = db::get_or_create_user(
        &state.pool,
        telegram_id,
        telegram_language,
        state.default_results_per_page,
    )
    .await?;
    let language = Some(user.language_code.as_str());

    let favorites = db::list_favorites(&state.pool, user.id, db::FAVORITES_LIMIT).await?;
    debug!(user_id = user.id, favorites = favorites.len(), "Showing favorites");

    let mut request = bot.send_message(msg.chat.id, format_favorites(&favorites, language));
    if !favorites.is_empty() {
        request = request.reply_markup(create_favorites_keyboard(&favorites, language));
    }
    request.await?;

    Ok(())
}
