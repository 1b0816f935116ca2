// Settings repository for Call Minutes
// Key-value store for application settings, including the API key

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::DatabaseManager;

/// Settings key under which the speech/LLM API key is stored.
pub const API_KEY_SETTING: &str = "api_key";

impl DatabaseManager {
    /// Get a single setting by key
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| get_setting_impl(conn, key))
    }

    /// Set a single setting
    pub fn set_setting(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        self.with_connection(|conn| set_setting_impl(conn, key, value, value_type))
    }

    /// Delete a setting by key
    pub fn delete_setting(&self, key: &str) -> Result<()> {
        self.with_connection(|conn| delete_setting_impl(conn, key))
    }

    /// Store the API key used for all outgoing calls
    pub fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.set_setting(API_KEY_SETTING, api_key, "secret")
    }

    /// Read the stored API key, treating a blank value as unset
    pub fn get_api_key(&self) -> Result<Option<String>> {
        Ok(self
            .get_setting(API_KEY_SETTING)?
            .filter(|v| !v.trim().is_empty()))
    }

    /// Remove the stored API key
    pub fn clear_api_key(&self) -> Result<()> {
        self.delete_setting(API_KEY_SETTING)
    }
}

fn get_setting_impl(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn
        .prepare("SELECT value FROM settings WHERE key = ?")
        .context("Failed to prepare get_setting query")?;

    let result = stmt.query_row(params![key], |row| row.get(0));

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get setting"),
    }
}

fn set_setting_impl(conn: &Connection, key: &str, value: &str, value_type: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO settings (key, value, value_type, updated_at)
        VALUES (?1, ?2, ?3, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            value_type = excluded.value_type,
            updated_at = datetime('now')
        "#,
        params![key, value, value_type],
    )
    .context("Failed to set setting")?;

    Ok(())
}

fn delete_setting_impl(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?", params![key])
        .context("Failed to delete setting")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_db() -> DatabaseManager {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = DatabaseManager::new(db_path).unwrap();
        // Keep the temp dir alive for the life of the process so SQLite's file
        // isn't unlinked out from under the open connection.
        let _ = dir.keep();
        db
    }

    #[test]
    fn test_set_and_get_setting() {
        let db = create_test_db();

        db.set_setting("test_key", "test_value", "string").unwrap();
        let value = db.get_setting("test_key").unwrap();
        assert_eq!(value, Some("test_value".to_string()));

        db.set_setting("test_key", "other", "string").unwrap();
        assert_eq!(db.get_setting("test_key").unwrap(), Some("other".to_string()));
    }

    #[test]
    fn test_api_key_round_trip() {
        let db = create_test_db();

        assert_eq!(db.get_api_key().unwrap(), None);
        db.set_api_key("sk-test").unwrap();
        assert_eq!(db.get_api_key().unwrap(), Some("sk-test".to_string()));

        db.clear_api_key().unwrap();
        assert_eq!(db.get_api_key().unwrap(), None);
    }

    #[test]
    fn test_blank_api_key_counts_as_unset() {
        let db = create_test_db();

        db.set_api_key("   ").unwrap();
        assert_eq!(db.get_api_key().unwrap(), None);
    }
}
