//! # Course Data Model
//!
//! Data structures for course links as stored in the database and as read
//! from a JSON catalog file.
//!
//! ## Catalog format
//!
//! ```json
//! [
//!   {
//!     "title": "The Rust Programming Language",
//!     "url": "https://doc.rust-lang.org/book/",
//!     "description": "The official book",
//!     "provider": "Rust Project",
//!     "tags": ["rust", "beginner"]
//!   }
//! ]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_URL_CHARS: usize = 1000;

/// A course link stored in the database
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub description: String,
    pub provider: Option<String>,
    /// Space separated tags
    pub tags: String,
}

/// One record of the JSON catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Why a catalog entry was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntryError {
    EmptyTitle,
    TitleTooLong,
    InvalidUrl(String),
    UrlTooLong,
}

impl std::fmt::Display for CatalogEntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogEntryError::EmptyTitle => write!(f, "title is empty"),
            CatalogEntryError::TitleTooLong => write!(f, "title exceeds {MAX_TITLE_CHARS} characters"),
            CatalogEntryError::InvalidUrl(url) => write!(f, "url {url:?} is not an http(s) link"),
            CatalogEntryError::UrlTooLong => write!(f, "url exceeds {MAX_URL_CHARS} characters"),
        }
    }
}

impl std::error::Error for CatalogEntryError {}

impl CatalogEntry {
    /// Trim fields and check the entry can be stored
    pub fn validate(mut self) -> Result<Self, CatalogEntryError> {
        self.title = self.title.trim().to_string();
        self.url = self.url.trim().to_string();
        self.description = self.description.trim().to_string();
        self.provider = self
            .provider
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        if self.title.is_empty() {
            return Err(CatalogEntryError::EmptyTitle);
        }
        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(CatalogEntryError::TitleTooLong);
        }
        let has_scheme = self.url.starts_with("https://") || self.url.starts_with("http://");
        if !has_scheme || self.url.contains(char::is_whitespace) {
            return Err(CatalogEntryError::InvalidUrl(self.url));
        }
        if self.url.chars().count() > MAX_URL_CHARS {
            return Err(CatalogEntryError::UrlTooLong);
        }

        Ok(self)
    }

    /// Tags joined as stored in the `courses.tags` column
    pub fn tags_column(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse catalog JSON, keeping only valid entries
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogEntry>> {
    let raw: Vec<CatalogEntry> =
        serde_json::from_str(json).context("Catalog is not a JSON array of courses")?;

    let total = raw.len();
    let valid: Vec<CatalogEntry> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry.validate() {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(index, error = %e, "Skipping invalid catalog entry");
                None
            }
        })
        .collect();

    info!(total, valid = valid.len(), "Catalog parsed");
    Ok(valid)
}

/// Read and parse a catalog file
pub fn load_catalog_file(path: impl AsRef<Path>) -> Result<Vec<CatalogEntry>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
    parse_catalog(&content)
}
