use anyhow::{Context, Result};
use course_links_bot::course_model::CatalogEntry;
use course_links_bot::db::*;
use course_links_bot::query::SearchQuery;
use sqlx::PgPool;
use std::env;
use tokio::sync::Mutex;

// Every test recreates the same tables, so they must not overlap
static DB_LOCK: Mutex<()> = Mutex::const_new(());

/// Helper macro to skip tests when database is not available
macro_rules! skip_if_no_db {
    ($test_fn:expr) => {{
        let _lock = DB_LOCK.lock().await;
        match setup_test_db().await {
            Ok(pool) => $test_fn(&pool).await,
            Err(_) => {
                eprintln!("Skipping test: Database not available");
                Ok(())
            }
        }
    }};
}

async fn setup_test_db() -> Result<PgPool> {
    // Skip tests if no DATABASE_URL is provided
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping database tests: DATABASE_URL not set");
            return Err(anyhow::anyhow!("Test database not configured"));
        }
    };

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to test database")?;

    for table in ["favorites", "search_history", "courses", "users"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
            .execute(&pool)
            .await?;
    }

    init_database_schema(&pool).await?;

    Ok(pool)
}

fn entry(title: &str, url: &str, tags: &[&str]) -> CatalogEntry {
    CatalogEntry {
        title: title.to_string(),
        url: url.to_string(),
        description: String::new(),
        provider: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

async fn seed_python_courses(pool: &PgPool, count: usize) -> Result<()> {
    let entries: Vec<CatalogEntry> = (1..=count)
        .map(|i| {
            entry(
                &format!("Python course {i:02}"),
                &format!("https://example.com/python/{i}"),
                &["python", "programming"],
            )
        })
        .collect();
    import_catalog(pool, &entries).await?;
    Ok(())
}

#[tokio::test]
async fn test_user_operations() -> Result<()> {
    skip_if_no_db!(test_user_operations_impl)
}

async fn test_user_operations_impl(pool: &PgPool) -> Result<()> {
    let user = get_or_create_user(pool, 12345, Some("fr-CA"), 5).await?;
    assert_eq!(user.telegram_id, 12345);
    assert_eq!(user.language_code, "fr");
    assert_eq!(user.results_per_page, 5);

    // Existing users keep their stored settings
    let again = get_or_create_user(pool, 12345, Some("en"), 10).await?;
    assert_eq!(again.id, user.id);
    assert_eq!(again.language_code, "fr");
    assert_eq!(again.results_per_page, 5);

    let unknown_language = get_or_create_user(pool, 999, None, 3).await?;
    assert_eq!(unknown_language.language_code, "en");

    Ok(())
}

#[tokio::test]
async fn test_settings_updates() -> Result<()> {
    skip_if_no_db!(test_settings_updates_impl)
}

async fn test_settings_updates_impl(pool: &PgPool) -> Result<()> {
    let user = get_or_create_user(pool, 42, Some("en"), 5).await?;

    assert!(update_user_language(pool, user.id, "fr").await?);
    assert!(update_results_per_page(pool, user.id, 10).await?);
    assert!(!update_results_per_page(pool, user.id + 1000, 10).await?);

    let updated = get_or_create_user(pool, 42, Some("en"), 5).await?;
    assert_eq!(updated.language_code, "fr");
    assert_eq!(updated.results_per_page, 10);

    Ok(())
}

#[tokio::test]
async fn test_course_upsert_by_url() -> Result<()> {
    skip_if_no_db!(test_course_upsert_by_url_impl)
}

async fn test_course_upsert_by_url_impl(pool: &PgPool) -> Result<()> {
    let first = upsert_course(pool, &entry("Rust Book", "https://doc.rust-lang.org/book/", &["rust"])).await?;
    let second = upsert_course(
        pool,
        &entry("The Rust Book", "https://doc.rust-lang.org/book/", &["Rust", "Systems"]),
    )
    .await?;
    assert_eq!(first, second);

    let course = get_course(pool, first).await?.expect("course exists");
    assert_eq!(course.title, "The Rust Book");
    assert_eq!(course.tags, "rust systems");
    assert_eq!(get_course(pool, first + 1000).await?, None);

    Ok(())
}

#[tokio::test]
async fn test_search_paging() -> Result<()> {
    skip_if_no_db!(test_search_paging_impl)
}

async fn test_search_paging_impl(pool: &PgPool) -> Result<()> {
    seed_python_courses(pool, 12).await?;
    import_catalog(pool, &[entry("Intro to Go", "https://example.com/go", &["go"])]).await?;

    let query = SearchQuery::parse("python").unwrap();

    let first = search_courses(pool, &query, 5, 0).await?;
    assert_eq!(first.courses.len(), 5);
    assert_eq!(first.total, 12);
    assert!(first.has_more);

    let last = search_courses(pool, &query, 5, 10).await?;
    assert_eq!(last.courses.len(), 2);
    assert_eq!(last.offset, 10);
    assert!(!last.has_more);

    // Pages never overlap
    let second = search_courses(pool, &query, 5, 5).await?;
    for course in &second.courses {
        assert!(!first.courses.contains(course));
    }

    let beyond = search_courses(pool, &query, 5, 50).await?;
    assert!(beyond.courses.is_empty());
    assert!(!beyond.has_more);

    Ok(())
}

#[tokio::test]
async fn test_search_substring_fallback_and_no_results() -> Result<()> {
    skip_if_no_db!(test_search_substring_fallback_impl)
}

async fn test_search_substring_fallback_impl(pool: &PgPool) -> Result<()> {
    import_catalog(
        pool,
        &[entry("Machine Learning Crash Course", "https://example.com/ml", &["ai"])],
    )
    .await?;

    // Partial word only matches through the substring fallback
    let partial = search_courses(pool, &SearchQuery::parse("learn").unwrap(), 5, 0).await?;
    assert_eq!(partial.total, 1);

    let by_tag = search_courses(pool, &SearchQuery::parse("AI").unwrap(), 5, 0).await?;
    assert_eq!(by_tag.total, 1);

    let none = search_courses(pool, &SearchQuery::parse("haskell").unwrap(), 5, 0).await?;
    assert!(none.courses.is_empty());
    assert_eq!(none.total, 0);

    Ok(())
}

#[tokio::test]
async fn test_search_history() -> Result<()> {
    skip_if_no_db!(test_search_history_impl)
}

async fn test_search_history_impl(pool: &PgPool) -> Result<()> {
    let user = get_or_create_user(pool, 7, None, 5).await?;
    let other = get_or_create_user(pool, 8, None, 5).await?;

    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(record_search(pool, user.id, &format!("query {i}"), i).await?);
    }

    let history = list_search_history(pool, user.id, HISTORY_LIMIT).await?;
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].query, "query 11");
    assert_eq!(history[0].results_count, 11);

    let entry = get_search_entry(pool, user.id, ids[3]).await?.expect("entry exists");
    assert_eq!(entry.query, "query 3");
    // History rows are private to their owner
    assert_eq!(get_search_entry(pool, other.id, ids[3]).await?, None);

    assert_eq!(clear_search_history(pool, user.id).await?, 12);
    assert!(list_search_history(pool, user.id, HISTORY_LIMIT).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_favorites() -> Result<()> {
    skip_if_no_db!(test_favorites_impl)
}

async fn test_favorites_impl(pool: &PgPool) -> Result<()> {
    let user = get_or_create_user(pool, 5, None, 5).await?;
    let rust = upsert_course(pool, &entry("Rust Book", "https://example.com/rust", &[])).await?;
    let go = upsert_course(pool, &entry("Go Tour", "https://example.com/go", &[])).await?;

    assert!(add_favorite(pool, user.id, rust).await?);
    assert!(!add_favorite(pool, user.id, rust).await?);
    assert!(add_favorite(pool, user.id, go).await?);

    let favorites = list_favorites(pool, user.id, FAVORITES_LIMIT).await?;
    assert_eq!(favorites.len(), 2);
    assert_eq!(favorites[0].id, go);

    assert!(remove_favorite(pool, user.id, rust).await?);
    assert!(!remove_favorite(pool, user.id, rust).await?);
    assert_eq!(list_favorites(pool, user.id, FAVORITES_LIMIT).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_favorites_are_capped_newest_first() -> Result<()> {
    skip_if_no_db!(test_favorites_are_capped_impl)
}

async fn test_favorites_are_capped_impl(pool: &PgPool) -> Result<()> {
    let user = get_or_create_user(pool, 6, None, 5).await?;
    let total = FAVORITES_LIMIT + 5;

    let mut last = 0;
    for i in 0..total {
        let course = upsert_course(pool, &entry(&format!("Course {i}"), &format!("https://example.com/{i}"), &[])).await?;
        add_favorite(pool, user.id, course).await?;
        last = course;
    }

    let favorites = list_favorites(pool, user.id, FAVORITES_LIMIT).await?;
    assert_eq!(favorites.len() as i64, FAVORITES_LIMIT);
    assert_eq!(favorites[0].id, last);

    Ok(())
}

#[tokio::test]
async fn test_import_refreshes_existing_course() -> Result<()> {
    skip_if_no_db!(test_import_refreshes_existing_course_impl)
}

async fn test_import_refreshes_existing_course_impl(pool: &PgPool) -> Result<()> {
    let id = upsert_course(pool, &entry("Go Tour", "https://example.com/go", &["go"])).await?;

    let imported = import_catalog(
        pool,
        &[
            entry("A Tour of Go", "https://example.com/go", &["Go", "Basics"]),
            entry("Effective Go", "https://example.com/effective-go", &[]),
        ],
    )
    .await?;
    assert_eq!(imported, 2);

    let course = get_course(pool, id).await?.expect("course exists");
    assert_eq!(course.title, "A Tour of Go");
    assert_eq!(course.tags, "go basics");

    Ok(())
}
