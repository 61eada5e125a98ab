//! Dispatcher schema
//!
//! Routes commands, search text and callback queries to their handlers.
//! Every endpoint goes through [`guarded`], so a failing handler is reported
//! by [`error_handler`] and never reaches the dispatcher.

use std::future::Future;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message};
use tracing::info;

use super::callback_handler::callback_handler;
use super::command_handler::{favorites_handler, help_handler, history_handler, settings_handler, start_handler};
use super::commands::{is_search_text, Command};
use super::error_handler::error_handler;
use super::message_handler::search_handler;
use super::{BotState, HandlerResult};

/// Creates the dispatcher schema used in production and in tests
pub fn schema() -> UpdateHandler<anyhow::Error> {
    let command_branch = dptree::entry().filter_command::<Command>().endpoint(
        |bot: Bot, msg: Message, cmd: Command, update: Update, state: BotState| async move {
            guarded(bot.clone(), update, dispatch_command(bot, msg, cmd, state)).await
        },
    );

    let search_branch = dptree::filter(|msg: Message| msg.text().is_some_and(is_search_text)).endpoint(
        |bot: Bot, msg: Message, update: Update, state: BotState| async move {
            guarded(bot.clone(), update, search_handler(bot, msg, state)).await
        },
    );

    let callback_branch = Update::filter_callback_query().endpoint(
        |bot: Bot, q: CallbackQuery, update: Update, state: BotState| async move {
            guarded(bot.clone(), update, callback_handler(bot, q, state)).await
        },
    );

    dptree::entry()
        .branch(Update::filter_message().branch(command_branch).branch(search_branch))
        .branch(callback_branch)
}

/// Run the handler for a parsed command
pub async fn dispatch_command(bot: Bot, msg: Message, cmd: Command, state: BotState) -> HandlerResult {
    info!(command = ?cmd, chat_id = %msg.chat.id, "Received command");

    match cmd {
        Command::Start => start_handler(bot, msg, state).await,
        Command::Help => help_handler(bot, msg).await,
        Command::Settings => settings_handler(bot, msg, state).await,
        Command::History => history_handler(bot, msg, state).await,
        Command::Favorites => favorites_handler(bot, msg, state).await,
    }
}

/// Await a handler and hand any failure to the error handler
async fn guarded<F>(bot: Bot, update: Update, handler: F) -> HandlerResult
where
    F: Future<Output = HandlerResult>,
{
    if let Err(e) = handler.await {
        error_handler(&bot, Some(&update), &e).await;
    }
    Ok(())
}
