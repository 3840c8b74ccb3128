//! SQLite persistence for per-chat settings and warn counters.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    config::{DEFAULT_GOODBYE, DEFAULT_RULES, DEFAULT_WELCOME},
    domain::{ChatId, UserId},
    Result,
};

/// Values a chat row starts with the first time the bot sees the chat.
#[derive(Clone, Debug)]
pub struct ChatDefaults {
    pub rules: String,
    pub warn_limit: u32,
    pub welcome: String,
    pub goodbye: String,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.to_string(),
            warn_limit: 3,
            welcome: DEFAULT_WELCOME.to_string(),
            goodbye: DEFAULT_GOODBYE.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSettings {
    pub rules: String,
    pub anti_link: bool,
    /// Minimum seconds between two messages of one user; 0 disables.
    pub slow_mode: u32,
    pub warn_limit: u32,
    pub welcome: String,
    pub goodbye: String,
}

/// A single-column settings change.
#[derive(Clone, Debug)]
pub enum SettingUpdate {
    Rules(String),
    AntiLink(bool),
    SlowMode(u32),
    WarnLimit(u32),
    Welcome(String),
    Goodbye(String),
}

pub struct ChatStore {
    conn: Mutex<Connection>,
    defaults: ChatDefaults,
}

impl ChatStore {
    pub fn open(path: impl AsRef<Path>, defaults: ChatDefaults) -> Result<Self> {
        Self::with_connection(Connection::open(path)?, defaults)
    }

    pub fn open_in_memory(defaults: ChatDefaults) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, defaults)
    }

    fn with_connection(conn: Connection, defaults: ChatDefaults) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chats (
                chat_id    INTEGER PRIMARY KEY,
                rules      TEXT    NOT NULL,
                anti_link  INTEGER NOT NULL DEFAULT 0,
                slow_mode  INTEGER NOT NULL DEFAULT 0,
                warn_limit INTEGER NOT NULL,
                welcome    TEXT    NOT NULL,
                goodbye    TEXT    NOT NULL
            );
            CREATE TABLE IF NOT EXISTS warns (
                chat_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                count   INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (chat_id, user_id)
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            defaults,
        })
    }

    pub fn defaults(&self) -> &ChatDefaults {
        &self.defaults
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_chat_on(&self, conn: &Connection, chat_id: ChatId) -> Result<()> {
        conn.execute(
            "INSERT INTO chats (chat_id, rules, warn_limit, welcome, goodbye)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(chat_id) DO NOTHING",
            params![
                chat_id.0,
                self.defaults.rules,
                self.defaults.warn_limit,
                self.defaults.welcome,
                self.defaults.goodbye,
            ],
        )?;
        Ok(())
    }

    pub fn ensure_chat(&self, chat_id: ChatId) -> Result<()> {
        let conn = self.lock_conn();
        self.ensure_chat_on(&conn, chat_id)
    }

    pub fn settings(&self, chat_id: ChatId) -> Result<ChatSettings> {
        let conn = self.lock_conn();
        self.ensure_chat_on(&conn, chat_id)?;
        let settings = conn.query_row(
            "SELECT rules, anti_link, slow_mode, warn_limit, welcome, goodbye
             FROM chats WHERE chat_id = ?1",
            params![chat_id.0],
            |row| {
                Ok(ChatSettings {
                    rules: row.get(0)?,
                    anti_link: row.get::<_, i64>(1)? != 0,
                    slow_mode: row.get::<_, i64>(2)?.clamp(0, u32::MAX as i64) as u32,
                    warn_limit: row.get::<_, i64>(3)?.clamp(1, u32::MAX as i64) as u32,
                    welcome: row.get(4)?,
                    goodbye: row.get(5)?,
                })
            },
        )?;
        Ok(settings)
    }

    pub fn update(&self, chat_id: ChatId, update: SettingUpdate) -> Result<()> {
        let conn = self.lock_conn();
        self.ensure_chat_on(&conn, chat_id)?;

        let id = chat_id.0;
        match update {
            SettingUpdate::Rules(v) => conn.execute(
                "UPDATE chats SET rules = ?1 WHERE chat_id = ?2",
                params![v, id],
            ),
            SettingUpdate::AntiLink(v) => conn.execute(
                "UPDATE chats SET anti_link = ?1 WHERE chat_id = ?2",
                params![v as i64, id],
            ),
            SettingUpdate::SlowMode(v) => conn.execute(
                "UPDATE chats SET slow_mode = ?1 WHERE chat_id = ?2",
                params![v, id],
            ),
            SettingUpdate::WarnLimit(v) => conn.execute(
                "UPDATE chats SET warn_limit = ?1 WHERE chat_id = ?2",
                params![v, id],
            ),
            SettingUpdate::Welcome(v) => conn.execute(
                "UPDATE chats SET welcome = ?1 WHERE chat_id = ?2",
                params![v, id],
            ),
            SettingUpdate::Goodbye(v) => conn.execute(
                "UPDATE chats SET goodbye = ?1 WHERE chat_id = ?2",
                params![v, id],
            ),
        }?;
        Ok(())
    }

    pub fn warns(&self, chat_id: ChatId, user_id: UserId) -> Result<u32> {
        let conn = self.lock_conn();
        let count: Option<i64> = conn
            .query_row(
                "SELECT count FROM warns WHERE chat_id = ?1 AND user_id = ?2",
                params![chat_id.0, user_id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0).max(0) as u32)
    }

    /// Zero removes the row.
    pub fn set_warns(&self, chat_id: ChatId, user_id: UserId, count: u32) -> Result<()> {
        let conn = self.lock_conn();
        if count == 0 {
            conn.execute(
                "DELETE FROM warns WHERE chat_id = ?1 AND user_id = ?2",
                params![chat_id.0, user_id.0],
            )?;
        } else {
            conn.execute(
                "INSERT INTO warns (chat_id, user_id, count) VALUES (?1, ?2, ?3)
                 ON CONFLICT(chat_id, user_id) DO UPDATE SET count = excluded.count",
                params![chat_id.0, user_id.0, count],
            )?;
        }
        Ok(())
    }

    /// Increment the warn counter and return the new value.
    pub fn add_warn(&self, chat_id: ChatId, user_id: UserId) -> Result<u32> {
        let conn = self.lock_conn();
        let count: i64 = conn.query_row(
            "INSERT INTO warns (chat_id, user_id, count) VALUES (?1, ?2, 1)
             ON CONFLICT(chat_id, user_id) DO UPDATE SET count = count + 1
             RETURNING count",
            params![chat_id.0, user_id.0],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u32)
    }
}
