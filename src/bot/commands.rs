//! Bot commands and the text routing predicate

use teloxide::utils::command::BotCommands;

/// Commands understood by the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "show how to search")]
    Help,
    #[command(description = "change language and results per page")]
    Settings,
    #[command(description = "show recent searches")]
    History,
    #[command(description = "show saved courses")]
    Favorites,
}

/// Whether a text message should be treated as a search
///
/// Anything that looks like a command is excluded, including commands the
/// bot does not know.
pub fn is_search_text(text: &str) -> bool {
    let trimmed = text.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with('/')
}
