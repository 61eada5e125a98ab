//! Message Handler module for free-text course searches

use anyhow::Result;
use sqlx::postgres::PgPool;
use teloxide::prelude::*;
use tracing::{debug, info};

use crate::db::{self, User};
use crate::localization::{t_args_lang, t_lang};
use crate::query::{QueryError, SearchQuery, MAX_QUERY_CHARS, MIN_QUERY_CHARS};

use super::ui_builder::{create_search_results_keyboard, format_search_results};
use super::{sender_identity, BotState, HandlerResult};

/// Localized hint for text that cannot be searched
pub fn query_error_message(error: QueryError, language_code: Option<&str>) -> String {
    match error {
        QueryError::TooShort => {
            let min = MIN_QUERY_CHARS.to_string();
            t_args_lang("search-too-short", &[("min", min.as_str())], language_code)
        }
        QueryError::TooLong => {
            let max = MAX_QUERY_CHARS.to_string();
            t_args_lang("search-too-long", &[("max", max.as_str())], language_code)
        }
    }
}

/// Search the catalog for the message text and reply with the first page
pub async fn search_handler(bot: Bot, msg: Message, state: BotState) -> HandlerResult {
    let (telegram_id, telegram_language) = sender_identity(&msg);
    let text = msg.text().unwrap_or_default();

    let query = match SearchQuery::parse(text) {
        Ok(query) => query,
        Err(e) => {
            debug!(chat_id = %msg.chat.id, error = %e, "Rejected search text");
            bot.send_message(msg.chat.id, query_error_message(e, telegram_language))
                .await?;
            return Ok(());
        }
    };

    let user = db::get_or_create_user(
        &state.pool,
        telegram_id,
        telegram_language,
        state.default_results_per_page,
    )
    .await?;
    let language = Some(user.language_code.as_str());

    let page = db::search_courses(&state.pool, &query, i64::from(user.results_per_page), 0).await?;
    let history_id = db::record_search(&state.pool, user.id, query.as_str(), page.total).await?;
    info!(
        user_id = user.id,
        query = %query,
        total = page.total,
        history_id,
        "Search completed"
    );

    if page.courses.is_empty() {
        bot.send_message(
            msg.chat.id,
            t_args_lang("search-no-results", &[("query", query.as_str())], language),
        )
        .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, format_search_results(query.as_str(), &page, language))
        .reply_markup(create_search_results_keyboard(&page, history_id, language))
        .await?;

    Ok(())
}

/// Send one page of a previously recorded search
///
/// Used by the "more" and "re-run" buttons. The history row is reused so
/// further pages keep pointing at the same search.
pub async fn send_search_page(
    bot: &Bot,
    pool: &PgPool,
    chat_id: ChatId,
    user: &User,
    entry: &db::HistoryEntry,
    offset: i64,
) -> Result<()> {
    let language = Some(user.language_code.as_str());
    let query = SearchQuery::parse(&entry.query)?;

    let page = db::search_courses(pool, &query, i64::from(user.results_per_page), offset).await?;
    debug!(
        user_id = user.id,
        history_id = entry.id,
        offset,
        returned = page.courses.len(),
        "Sending search page"
    );

    if page.courses.is_empty() {
        let text = if offset > 0 {
            t_lang("search-no-more", language)
        } else {
            t_args_lang("search-no-results", &[("query", query.as_str())], language)
        };
        bot.send_message(chat_id, text).await?;
        return Ok(());
    }

    bot.send_message(chat_id, format_search_results(query.as_str(), &page, language))
        .reply_markup(create_search_results_keyboard(&page, entry.id, language))
        .await?;

    Ok(())
}
