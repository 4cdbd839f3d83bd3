//! Settings repository.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::Setting;

/// Repository for key-value settings.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Get a setting.
    pub fn get(conn: &Connection, key: &str) -> Result<Option<Setting>> {
        let mut stmt = conn.prepare("SELECT key, value FROM settings WHERE key = ?1")?;

        let setting = stmt
            .query_row([key], |row| {
                let value_str: String = row.get(1)?;
                Ok(Setting {
                    key: row.get(0)?,
                    value: serde_json::from_str(&value_str).unwrap_or(serde_json::Value::Null),
                })
            })
            .optional()?;

        Ok(setting)
    }

    /// Set a setting (insert or update).
    pub fn set(conn: &Connection, key: &str, value: &serde_json::Value) -> Result<()> {
        let value_json = serde_json::to_string(value)?;

        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value_json],
        )?;

        Ok(())
    }

    /// Delete a setting.
    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(deleted > 0)
    }

    /// Get all settings, ordered by key.
    pub fn get_all(conn: &Connection) -> Result<Vec<Setting>> {
        let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;

        let settings = stmt
            .query_map([], |row| {
                let value_str: String = row.get(1)?;
                Ok(Setting {
                    key: row.get(0)?,
                    value: serde_json::from_str(&value_str).unwrap_or(serde_json::Value::Null),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(settings)
    }
}
