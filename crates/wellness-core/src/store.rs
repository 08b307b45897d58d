// SQLite-backed session cache.
//
// Holds the small amount of state the client keeps between runs: the auth
// token, the signed-in user, and the remembered login email.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::User;

const KEY_TOKEN: &str = "token";
const KEY_USER: &str = "user";
const KEY_REMEMBERED_EMAIL: &str = "remembered_email";

/// Key-value store for client-side session state.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral store.
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create store directory {}", parent.display())
                    })?;
                }
            }
        }

        let conn =
            Connection::open(path).with_context(|| format!("failed to open store at {path}"))?;

        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .context("failed to set store pragmas")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS session_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .context("failed to create store schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-call; the
        // connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .with_context(|| format!("failed to write key {key}"))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn()
            .query_row(
                "SELECT value FROM session_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to read key {key}"))
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM session_state WHERE key = ?1", params![key])
            .with_context(|| format!("failed to delete key {key}"))?;
        Ok(())
    }

    // -- Session --

    pub fn token(&self) -> Result<Option<String>> {
        self.get(KEY_TOKEN)
    }

    /// Cached user. A corrupt entry reads as absent.
    pub fn user(&self) -> Result<Option<User>> {
        let Some(raw) = self.get(KEY_USER)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!("Discarding unreadable cached user: {}", e);
                Ok(None)
            }
        }
    }

    /// Persist token and user together.
    pub fn save_session(&self, token: &str, user: &User) -> Result<()> {
        let user_json = serde_json::to_string(user).context("failed to encode user")?;
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute(
            "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
            params![KEY_TOKEN, token],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
            params![KEY_USER, user_json],
        )?;
        tx.commit().context("failed to commit session")?;
        Ok(())
    }

    pub fn save_user(&self, user: &User) -> Result<()> {
        let user_json = serde_json::to_string(user).context("failed to encode user")?;
        self.set(KEY_USER, &user_json)
    }

    /// Remove token and user. The remembered email survives.
    pub fn clear_session(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute(
            "DELETE FROM session_state WHERE key IN (?1, ?2)",
            params![KEY_TOKEN, KEY_USER],
        )?;
        tx.commit().context("failed to clear session")?;
        Ok(())
    }

    // -- Remember me --

    pub fn remembered_email(&self) -> Result<Option<String>> {
        self.get(KEY_REMEMBERED_EMAIL)
    }

    pub fn set_remembered_email(&self, email: Option<&str>) -> Result<()> {
        match email {
            Some(email) => self.set(KEY_REMEMBERED_EMAIL, email),
            None => self.remove(KEY_REMEMBERED_EMAIL),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
