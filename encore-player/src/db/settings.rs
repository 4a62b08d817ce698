//! Settings key-value store and the preference port the controller
//! uses for the persisted view mode.

use encore_common::ViewMode;
use futures::future::BoxFuture;
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Settings key for the user's preferred playback surface.
pub const VIEW_MODE_KEY: &str = "player_view_mode";

/// Generic setting getter
///
/// Returns None if the setting doesn't exist, parses the stored string
/// otherwise.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter
///
/// Inserts or updates setting in database.
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

/// Load the persisted view mode, defaulting to Auto when unset.
pub async fn get_view_mode(db: &Pool<Sqlite>) -> Result<ViewMode> {
    Ok(get_setting::<ViewMode>(db, VIEW_MODE_KEY)
        .await?
        .unwrap_or(ViewMode::Auto))
}

pub async fn set_view_mode(db: &Pool<Sqlite>, mode: ViewMode) -> Result<()> {
    set_setting(db, VIEW_MODE_KEY, mode).await
}

/// Persistence port for the session's view-mode preference. Reads
/// happen once at controller start, writes on every explicit change.
pub trait PreferenceStore: Send + Sync {
    fn load_view_mode(&self) -> BoxFuture<'_, Result<ViewMode>>;
    fn store_view_mode(&self, mode: ViewMode) -> BoxFuture<'_, Result<()>>;
}

/// Preference store backed by the settings table.
pub struct SqlitePreferenceStore {
    pool: Pool<Sqlite>,
}

impl SqlitePreferenceStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn load_view_mode(&self) -> BoxFuture<'_, Result<ViewMode>> {
        Box::pin(async move { get_view_mode(&self.pool).await })
    }

    fn store_view_mode(&self, mode: ViewMode) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { set_view_mode(&self.pool, mode).await })
    }
}

/// Volatile preference store for tests and database-less runs.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    mode: Mutex<Option<ViewMode>>,
}

impl MemoryPreferenceStore {
    pub fn with_mode(mode: ViewMode) -> Self {
        Self {
            mode: Mutex::new(Some(mode)),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load_view_mode(&self) -> BoxFuture<'_, Result<ViewMode>> {
        let stored = *self.mode.lock().unwrap_or_else(|e| e.into_inner());
        Box::pin(async move { Ok(stored.unwrap_or(ViewMode::Auto)) })
    }

    fn store_view_mode(&self, mode: ViewMode) -> BoxFuture<'_, Result<()>> {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = Some(mode);
        Box::pin(async move { Ok(()) })
    }
}
