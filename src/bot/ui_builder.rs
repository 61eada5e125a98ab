//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::course_model::{Course, MAX_TITLE_CHARS};
use crate::db::{HistoryEntry, SearchPage, User};
use crate::localization::{language_name, t_args_lang, t_lang, SUPPORTED_LANGUAGES};

use super::callback_data::{CallbackAction, PAGE_SIZE_CHOICES};

const DESCRIPTION_PREVIEW_CHARS: usize = 120;
const BUTTON_LABEL_CHARS: usize = 24;
const BUTTONS_PER_ROW: usize = 5;
const PROVIDER_CHARS: usize = 60;

/// Telegram's limit on the text of one message
pub const MAX_MESSAGE_CHARS: usize = 4096;
// Room left for the header above a course list
const RESULTS_HEADER_RESERVE: usize = 200;
const FAVORITES_HEADER_RESERVE: usize = 100;

/// Shorten text to `max` characters, ending with an ellipsis when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

fn button(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), action.to_string())
}

fn format_course_entry(course: &Course, position: i64) -> String {
    let title = truncate_chars(&course.title, MAX_TITLE_CHARS);
    let mut entry = match &course.provider {
        Some(provider) => format!("{position}. {title} ({})\n", truncate_chars(provider, PROVIDER_CHARS)),
        None => format!("{position}. {title}\n"),
    };
    entry.push_str(&format!("🔗 {}\n", course.url));
    if !course.description.is_empty() {
        entry.push_str(&truncate_chars(&course.description, DESCRIPTION_PREVIEW_CHARS));
        entry.push('\n');
    }
    entry
}

/// Format courses as a numbered list starting at `first_position`
pub fn format_course_list(courses: &[Course], first_position: i64) -> String {
    let entries: Vec<String> = courses
        .iter()
        .enumerate()
        .map(|(i, course)| format_course_entry(course, first_position + i as i64))
        .collect();

    entries.join("\n").trim_end().to_string()
}

/// Longest prefix of `courses` whose list fits in one message next to
/// `reserved` characters of header
///
/// At least one course is kept so a page never comes out empty.
pub fn courses_that_fit(courses: &[Course], first_position: i64, reserved: usize) -> &[Course] {
    let budget = MAX_MESSAGE_CHARS.saturating_sub(reserved);
    let mut used = 0;

    for (i, course) in courses.iter().enumerate() {
        // Entries are separated by a blank line
        used += format_course_entry(course, first_position + i as i64).chars().count() + 1;
        if used > budget && i > 0 {
            return &courses[..i];
        }
    }

    courses
}

fn visible_results(page: &SearchPage) -> &[Course] {
    courses_that_fit(&page.courses, page.offset + 1, RESULTS_HEADER_RESERVE)
}

fn visible_favorites(courses: &[Course]) -> &[Course] {
    courses_that_fit(courses, 1, FAVORITES_HEADER_RESERVE)
}

/// Message text for one page of search results
pub fn format_search_results(query: &str, page: &SearchPage, language_code: Option<&str>) -> String {
    let visible = visible_results(page);
    let from = (page.offset + 1).to_string();
    let to = (page.offset + visible.len() as i64).to_string();
    let header = t_args_lang(
        "search-results-header",
        &[("query", query), ("from", from.as_str()), ("to", to.as_str())],
        language_code,
    );

    format!("{header}\n\n{}", format_course_list(visible, page.offset + 1))
}

/// Save buttons for every shown result plus a "more" button when further
/// results exist, including ones cut from this message for length
pub fn create_search_results_keyboard(
    page: &SearchPage,
    history_id: i64,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let visible = visible_results(page);
    let save_buttons: Vec<InlineKeyboardButton> = visible
        .iter()
        .enumerate()
        .map(|(i, course)| {
            let position = (page.offset + 1 + i as i64).to_string();
            button(
                t_args_lang("button-save", &[("position", position.as_str())], language_code),
                CallbackAction::AddFavorite { course_id: course.id },
            )
        })
        .collect();

    let mut rows: Vec<Vec<InlineKeyboardButton>> =
        save_buttons.chunks(BUTTONS_PER_ROW).map(|row| row.to_vec()).collect();

    if page.has_more || visible.len() < page.courses.len() {
        rows.push(vec![button(
            t_lang("button-more", language_code),
            CallbackAction::MoreResults {
                history_id,
                offset: page.offset + visible.len() as i64,
            },
        )]);
    }

    InlineKeyboardMarkup::new(rows)
}

pub fn format_favorites(courses: &[Course], language_code: Option<&str>) -> String {
    if courses.is_empty() {
        return t_lang("favorites-empty", language_code);
    }
    format!(
        "⭐ {}\n\n{}",
        t_lang("favorites-title", language_code),
        format_course_list(visible_favorites(courses), 1)
    )
}

/// Remove buttons matching the numbering of [`format_favorites`]
pub fn create_favorites_keyboard(courses: &[Course], language_code: Option<&str>) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = visible_favorites(courses)
        .iter()
        .enumerate()
        .map(|(i, course)| {
            let position = (i + 1).to_string();
            button(
                t_args_lang("button-remove", &[("position", position.as_str())], language_code),
                CallbackAction::RemoveFavorite { course_id: course.id },
            )
        })
        .collect();

    InlineKeyboardMarkup::new(buttons.chunks(BUTTONS_PER_ROW).map(|row| row.to_vec()))
}

pub fn format_history(entries: &[HistoryEntry], language_code: Option<&str>) -> String {
    if entries.is_empty() {
        return t_lang("history-empty", language_code);
    }

    let lines: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let count = entry.results_count.to_string();
            let date = entry.created_at.format("%Y-%m-%d %H:%M").to_string();
            format!(
                "{}. {}",
                i + 1,
                t_args_lang(
                    "history-entry",
                    &[("query", entry.query.as_str()), ("count", count.as_str()), ("date", date.as_str())],
                    language_code,
                )
            )
        })
        .collect();

    format!("🕘 {}\n\n{}", t_lang("history-title", language_code), lines.join("\n"))
}

/// One re-run button per entry and a final clear button
pub fn create_history_keyboard(entries: &[HistoryEntry], language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = entries
        .iter()
        .map(|entry| {
            let label = truncate_chars(&entry.query, BUTTON_LABEL_CHARS);
            vec![button(
                t_args_lang("button-rerun", &[("query", label.as_str())], language_code),
                CallbackAction::Rerun { history_id: entry.id },
            )]
        })
        .collect();

    if !entries.is_empty() {
        rows.push(vec![button(
            t_lang("button-clear-history", language_code),
            CallbackAction::ClearHistory,
        )]);
    }

    InlineKeyboardMarkup::new(rows)
}

pub fn format_settings(user: &User) -> String {
    let language = Some(user.language_code.as_str());
    let count = user.results_per_page.to_string();
    format!(
        "⚙️ {}\n\n{}\n{}\n\n{}",
        t_lang("settings-title", language),
        t_args_lang("settings-language", &[("language", language_name(&user.language_code))], language),
        t_args_lang("settings-page-size", &[("count", count.as_str())], language),
        t_lang("settings-choose", language)
    )
}

/// Page size and language choices, with the current values marked
pub fn create_settings_keyboard(user: &User) -> InlineKeyboardMarkup {
    let size_row: Vec<InlineKeyboardButton> = PAGE_SIZE_CHOICES
        .iter()
        .map(|size| {
            let label = if *size as i32 == user.results_per_page {
                format!("✅ {size}")
            } else {
                size.to_string()
            };
            button(label, CallbackAction::SetPageSize(*size))
        })
        .collect();

    let language_row: Vec<InlineKeyboardButton> = SUPPORTED_LANGUAGES
        .iter()
        .map(|code| {
            let name = language_name(code);
            let label = if *code == user.language_code {
                format!("✅ {name}")
            } else {
                name.to_string()
            };
            button(label, CallbackAction::SetLanguage(code.to_string()))
        })
        .collect();

    InlineKeyboardMarkup::new(vec![size_row, language_row])
}
