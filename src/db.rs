use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgExecutor, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

use crate::course_model::{CatalogEntry, Course};
use crate::query::SearchQuery;

/// Number of history entries shown by `/history`
pub const HISTORY_LIMIT: i64 = 10;

/// Number of favorites shown by `/favorites`, keeping the keyboard well
/// under Telegram's button limit
pub const FAVORITES_LIMIT: i64 = 30;

/// A bot user together with their settings
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub language_code: String,
    pub results_per_page: i32,
    pub created_at: DateTime<Utc>,
}

/// A past search of a user
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub query: String,
    pub results_count: i32,
    pub created_at: DateTime<Utc>,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub courses: Vec<Course>,
    pub offset: i64,
    /// Matches across all pages
    pub total: i64,
    pub has_more: bool,
}

#[derive(sqlx::FromRow)]
struct CourseHit {
    #[sqlx(flatten)]
    course: Course,
    total: i64,
}

/// Connect to PostgreSQL and make sure the schema exists
pub async fn connect(database_url: &str) -> Result<PgPool> {
    info!("Connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    init_database_schema(&pool).await?;
    Ok(pool)
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT UNIQUE NOT NULL,
            language_code TEXT NOT NULL DEFAULT 'en',
            results_per_page INTEGER NOT NULL DEFAULT 5,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    // Full-text vector kept in sync by PostgreSQL itself
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS courses (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            url TEXT UNIQUE NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            provider TEXT,
            tags TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            search_vector tsvector GENERATED ALWAYS AS (
                to_tsvector('simple', title || ' ' || description || ' ' || tags)
            ) STORED
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create courses table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS courses_search_idx ON courses USING GIN (search_vector)")
        .execute(pool)
        .await
        .context("Failed to create course search index")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS search_history (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            query TEXT NOT NULL,
            results_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create search_history table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS search_history_user_idx ON search_history (user_id, created_at DESC)",
    )
    .execute(pool)
    .await
    .context("Failed to create search history index")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS favorites (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            course_id BIGINT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, course_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create favorites table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

// --- Users and settings ---

/// Get a user by Telegram id, creating it on first contact
///
/// An existing user keeps their stored language and page size.
pub async fn get_or_create_user(
    pool: &PgPool,
    telegram_id: i64,
    language_code: Option<&str>,
    results_per_page: u32,
) -> Result<User> {
    let language = language_code
        .map(crate::localization::normalize_language)
        .unwrap_or(crate::localization::DEFAULT_LANGUAGE);

    // The no-op update makes RETURNING yield the existing row too
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (telegram_id, language_code, results_per_page)
         VALUES ($1, $2, $3)
         ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
         RETURNING id, telegram_id, language_code, results_per_page, created_at",
    )
    .bind(telegram_id)
    .bind(language)
    .bind(results_per_page as i32)
    .fetch_one(pool)
    .await
    .context("Failed to get or create user")?;

    debug!(telegram_id, user_id = user.id, "Resolved user");
    Ok(user)
}

/// Change the interface language of a user
pub async fn update_user_language(pool: &PgPool, user_id: i64, language_code: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET language_code = $1 WHERE id = $2")
        .bind(language_code)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update user language")?;

    Ok(result.rows_affected() > 0)
}

/// Change how many results a user sees per page
pub async fn update_results_per_page(pool: &PgPool, user_id: i64, results_per_page: u32) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET results_per_page = $1 WHERE id = $2")
        .bind(results_per_page as i32)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update results per page")?;

    Ok(result.rows_affected() > 0)
}

// --- Courses ---

/// Insert a course or refresh the one with the same URL
///
/// Takes any executor so the catalog import can run it inside its
/// transaction.
pub async fn upsert_course<'e, E>(executor: E, entry: &CatalogEntry) -> Result<i64>
where
    E: PgExecutor<'e>,
{
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO courses (title, url, description, provider, tags)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (url) DO UPDATE SET
             title = EXCLUDED.title,
             description = EXCLUDED.description,
             provider = EXCLUDED.provider,
             tags = EXCLUDED.tags
         RETURNING id",
    )
    .bind(&entry.title)
    .bind(&entry.url)
    .bind(&entry.description)
    .bind(&entry.provider)
    .bind(entry.tags_column())
    .fetch_one(executor)
    .await
    .with_context(|| format!("Failed to upsert course {}", entry.url))?;

    Ok(id)
}

/// Store every catalog entry in a single transaction
pub async fn import_catalog(pool: &PgPool, entries: &[CatalogEntry]) -> Result<usize> {
    let mut tx = pool.begin().await.context("Failed to start catalog import")?;

    for entry in entries {
        upsert_course(&mut *tx, entry).await?;
    }

    tx.commit().await.context("Failed to commit catalog import")?;
    info!(imported = entries.len(), "Catalog imported");
    Ok(entries.len())
}

pub async fn get_course(pool: &PgPool, course_id: i64) -> Result<Option<Course>> {
    sqlx::query_as::<_, Course>(
        "SELECT id, title, url, description, provider, tags FROM courses WHERE id = $1",
    )
    .bind(course_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read course")
}

/// Search courses by full-text match, falling back to substring match on
/// title and tags
pub async fn search_courses(
    pool: &PgPool,
    query: &SearchQuery,
    limit: i64,
    offset: i64,
) -> Result<SearchPage> {
    debug!(query = %query, limit, offset, "Searching courses");

    let hits = sqlx::query_as::<_, CourseHit>(
        "SELECT id, title, url, description, provider, tags, COUNT(*) OVER () AS total
         FROM courses
         WHERE search_vector @@ plainto_tsquery('simple', $1)
            OR lower(title) LIKE $2
            OR tags LIKE $2
         ORDER BY ts_rank(search_vector, plainto_tsquery('simple', $1)) DESC, title ASC, id ASC
         LIMIT $3 OFFSET $4",
    )
    .bind(query.as_str())
    .bind(query.like_pattern())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to search courses")?;

    let total = hits.first().map(|hit| hit.total).unwrap_or(0);
    let courses: Vec<Course> = hits.into_iter().map(|hit| hit.course).collect();
    let has_more = offset + (courses.len() as i64) < total;

    Ok(SearchPage {
        courses,
        offset,
        total,
        has_more,
    })
}

// --- Search history ---

pub async fn record_search(pool: &PgPool, user_id: i64, query: &str, results_count: i64) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO search_history (user_id, query, results_count) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(query)
    .bind(results_count as i32)
    .fetch_one(pool)
    .await
    .context("Failed to record search")?;

    debug!(user_id, history_id = id, "Search recorded");
    Ok(id)
}

/// Read one history entry, only if it belongs to the given user
pub async fn get_search_entry(pool: &PgPool, user_id: i64, history_id: i64) -> Result<Option<HistoryEntry>> {
    sqlx::query_as::<_, HistoryEntry>(
        "SELECT id, user_id, query, results_count, created_at
         FROM search_history WHERE id = $1 AND user_id = $2",
    )
    .bind(history_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read search history entry")
}

/// Most recent searches first
pub async fn list_search_history(pool: &PgPool, user_id: i64, limit: i64) -> Result<Vec<HistoryEntry>> {
    sqlx::query_as::<_, HistoryEntry>(
        "SELECT id, user_id, query, results_count, created_at
         FROM search_history WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list search history")
}

pub async fn clear_search_history(pool: &PgPool, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM search_history WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to clear search history")?;

    info!(user_id, removed = result.rows_affected(), "Search history cleared");
    Ok(result.rows_affected())
}

// --- Favorites ---

/// Returns `true` when the course was not already a favorite
pub async fn add_favorite(pool: &PgPool, user_id: i64, course_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO favorites (user_id, course_id) VALUES ($1, $2)
         ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(course_id)
    .execute(pool)
    .await
    .context("Failed to add favorite")?;

    Ok(result.rows_affected() > 0)
}

pub async fn remove_favorite(pool: &PgPool, user_id: i64, course_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND course_id = $2")
        .bind(user_id)
        .bind(course_id)
        .execute(pool)
        .await
        .context("Failed to remove favorite")?;

    Ok(result.rows_affected() > 0)
}

/// Favorite courses, most recently saved first
pub async fn list_favorites(pool: &PgPool, user_id: i64, limit: i64) -> Result<Vec<Course>> {
    sqlx::query_as::<_, Course>(
        "SELECT c.id, c.title, c.url, c.description, c.provider, c.tags
         FROM favorites f
         JOIN courses c ON c.id = f.course_id
         WHERE f.user_id = $1
         ORDER BY f.created_at DESC, f.id DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list favorites")
}
