//! Typed inline keyboard payloads
//!
//! Telegram limits callback data to 64 bytes, so payloads are short
//! `name:arg` strings.

use std::fmt;
use std::str::FromStr;

use crate::localization::SUPPORTED_LANGUAGES;

/// Page sizes offered by the settings keyboard
pub const PAGE_SIZE_CHOICES: &[u32] = &[3, 5, 10];

/// Action carried by an inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    AddFavorite { course_id: i64 },
    RemoveFavorite { course_id: i64 },
    MoreResults { history_id: i64, offset: i64 },
    Rerun { history_id: i64 },
    ClearHistory,
    SetPageSize(u32),
    SetLanguage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParseError(pub String);

impl fmt::Display for CallbackParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unrecognized callback data: {:?}", self.0)
    }
}

impl std::error::Error for CallbackParseError {}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::AddFavorite { course_id } => write!(f, "fav_add:{course_id}"),
            CallbackAction::RemoveFavorite { course_id } => write!(f, "fav_rm:{course_id}"),
            CallbackAction::MoreResults { history_id, offset } => write!(f, "more:{history_id}:{offset}"),
            CallbackAction::Rerun { history_id } => write!(f, "rerun:{history_id}"),
            CallbackAction::ClearHistory => write!(f, "clear_history"),
            CallbackAction::SetPageSize(size) => write!(f, "limit:{size}"),
            CallbackAction::SetLanguage(code) => write!(f, "lang:{code}"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = CallbackParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let err = || CallbackParseError(data.to_string());
        let id = |raw: &str| raw.parse::<i64>().ok().filter(|v| *v > 0).ok_or_else(err);

        let (name, args) = data.split_once(':').unwrap_or((data, ""));
        match (name, args) {
            ("fav_add", raw) => Ok(CallbackAction::AddFavorite { course_id: id(raw)? }),
            ("fav_rm", raw) => Ok(CallbackAction::RemoveFavorite { course_id: id(raw)? }),
            ("more", raw) => {
                let (history, offset) = raw.split_once(':').ok_or_else(err)?;
                let offset = offset.parse::<i64>().ok().filter(|v| *v >= 0).ok_or_else(err)?;
                Ok(CallbackAction::MoreResults {
                    history_id: id(history)?,
                    offset,
                })
            }
            ("rerun", raw) => Ok(CallbackAction::Rerun { history_id: id(raw)? }),
            ("clear_history", "") => Ok(CallbackAction::ClearHistory),
            ("limit", raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|size| PAGE_SIZE_CHOICES.contains(size))
                .map(CallbackAction::SetPageSize)
                .ok_or_else(err),
            ("lang", raw) if SUPPORTED_LANGUAGES.contains(&raw) => Ok(CallbackAction::SetLanguage(raw.to_string())),
            _ => Err(err()),
        }
    }
}
