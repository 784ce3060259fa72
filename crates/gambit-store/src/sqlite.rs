//! SQLite-backed `BotStore` implementation with durable persistence.

use crate::{
    AliasRecord, BotStore, DebtRecord, JokeRecord, KarmaEntry, QuoteRecord, SpotSettlement,
    StoreError, StoreResult, Title, UserRecord,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

const USER_COLUMNS: &str = "user_id, conversation_id, full_name, nickname, title, privilege";

/// Persistent SQLite store backend.
#[derive(Debug)]
pub struct SqliteBotStore {
    db_path: PathBuf,
}

impl SqliteBotStore {
    /// Creates a SQLite-backed store at `path`, creating schema if needed.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        let connection = store.open_connection()?;
        store.initialize_schema(&connection)?;
        tracing::debug!(path = %store.db_path.display(), "opened sqlite bot store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open_connection(&self) -> StoreResult<Connection> {
        let connection = Connection::open(&self.db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        Ok(connection)
    }

    fn initialize_schema(&self, connection: &Connection) -> StoreResult<()> {
        connection.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT NOT NULL,
                conversation_id TEXT NOT NULL,
                full_name TEXT NOT NULL COLLATE NOCASE,
                nickname TEXT NULL COLLATE NOCASE,
                title TEXT NULL,
                privilege INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, conversation_id)
            );

            CREATE INDEX IF NOT EXISTS idx_users_conversation_name
                ON users (conversation_id, full_name);

            CREATE TABLE IF NOT EXISTS karma (
                target TEXT PRIMARY KEY COLLATE NOCASE,
                karma INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS aliases (
                old TEXT PRIMARY KEY COLLATE NOCASE,
                new TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS debt (
                lender TEXT NOT NULL COLLATE NOCASE,
                borrower TEXT NOT NULL COLLATE NOCASE,
                amount INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (lender, borrower)
            );

            CREATE TABLE IF NOT EXISTS quotes (
                quote_row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                quote TEXT NOT NULL,
                said_by TEXT NOT NULL COLLATE NOCASE,
                said_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS commands (
                name TEXT PRIMARY KEY,
                privilege INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS jokes (
                joke TEXT NOT NULL,
                type TEXT NOT NULL COLLATE NOCASE
            );
            "#,
        )?;
        Ok(())
    }

    fn query_users(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> StoreResult<Vec<UserRecord>> {
        let connection = self.open_connection()?;
        let mut statement = connection.prepare(sql)?;
        let rows = statement.query_map(args, user_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(user_from_db(row?)?);
        }
        Ok(users)
    }
}

struct RawUserRow {
    user_id: String,
    conversation_id: String,
    full_name: String,
    nickname: Option<String>,
    title: Option<String>,
    privilege: i64,
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<RawUserRow> {
    Ok(RawUserRow {
        user_id: row.get(0)?,
        conversation_id: row.get(1)?,
        full_name: row.get(2)?,
        nickname: row.get(3)?,
        title: row.get(4)?,
        privilege: row.get(5)?,
    })
}

fn user_from_db(raw: RawUserRow) -> StoreResult<UserRecord> {
    let title = raw
        .title
        .as_deref()
        .map(|value| {
            value
                .parse::<Title>()
                .map_err(|_| StoreError::InvalidPersistedValue {
                    field: "users.title",
                    value: value.to_string(),
                })
        })
        .transpose()?;
    Ok(UserRecord {
        user_id: raw.user_id,
        conversation_id: raw.conversation_id,
        full_name: raw.full_name,
        nickname: raw.nickname,
        title,
        privilege: privilege_from_db("users.privilege", raw.privilege)?,
    })
}

fn privilege_from_db(field: &'static str, value: i64) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidPersistedValue {
        field,
        value: value.to_string(),
    })
}

fn add_karma(connection: &Connection, target: &str, delta: i64) -> rusqlite::Result<i64> {
    connection.execute(
        "INSERT OR IGNORE INTO karma (target, karma) VALUES (?1, 0)",
        params![target],
    )?;
    connection.execute(
        "UPDATE karma SET karma = karma + ?1 WHERE target = ?2",
        params![delta, target],
    )?;
    connection.query_row(
        "SELECT karma FROM karma WHERE target = ?1",
        params![target],
        |row| row.get(0),
    )
}

fn debt_amount(connection: &Connection, lender: &str, borrower: &str) -> rusqlite::Result<i64> {
    Ok(connection
        .query_row(
            "SELECT amount FROM debt WHERE lender = ?1 AND borrower = ?2",
            params![lender, borrower],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0))
}

fn upsert_debt(
    connection: &Connection,
    lender: &str,
    borrower: &str,
    amount: i64,
) -> rusqlite::Result<()> {
    connection.execute(
        r#"
        INSERT INTO debt (lender, borrower, amount) VALUES (?1, ?2, ?3)
        ON CONFLICT (lender, borrower) DO UPDATE SET amount = excluded.amount
        "#,
        params![lender, borrower, amount],
    )?;
    Ok(())
}

fn timestamp_to_db(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

fn timestamp_from_db(value: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

impl BotStore for SqliteBotStore {
    fn find_user(&self, user_id: &str, conversation_id: &str) -> StoreResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1 AND conversation_id = ?2"
        );
        Ok(self
            .query_users(&sql, &[&user_id, &conversation_id])?
            .into_iter()
            .next())
    }

    fn find_user_by_name(
        &self,
        conversation_id: &str,
        full_name: &str,
    ) -> StoreResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE conversation_id = ?1 AND full_name = ?2 LIMIT 1"
        );
        Ok(self
            .query_users(&sql, &[&conversation_id, &full_name])?
            .into_iter()
            .next())
    }

    fn insert_user(
        &self,
        user_id: &str,
        conversation_id: &str,
        full_name: &str,
    ) -> StoreResult<()> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        transaction.execute(
            "INSERT OR IGNORE INTO users (user_id, conversation_id, full_name) VALUES (?1, ?2, ?3)",
            params![user_id, conversation_id, full_name],
        )?;
        transaction.commit()?;
        Ok(())
    }

    fn users_in_conversation(&self, conversation_id: &str) -> StoreResult<Vec<UserRecord>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE conversation_id = ?1 ORDER BY rowid"
        );
        self.query_users(&sql, &[&conversation_id])
    }

    fn all_users(&self) -> StoreResult<Vec<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid");
        self.query_users(&sql, &[])
    }

    fn set_nickname(
        &self,
        conversation_id: &str,
        full_name: &str,
        nickname: &str,
    ) -> StoreResult<bool> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        let updated = transaction.execute(
            "UPDATE users SET nickname = ?1 WHERE conversation_id = ?2 AND full_name = ?3",
            params![nickname, conversation_id, full_name],
        )?;
        transaction.commit()?;
        Ok(updated > 0)
    }

    fn set_privilege(
        &self,
        conversation_id: &str,
        full_name: &str,
        privilege: u32,
    ) -> StoreResult<bool> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        let updated = transaction.execute(
            "UPDATE users SET privilege = ?1 WHERE conversation_id = ?2 AND full_name = ?3",
            params![i64::from(privilege), conversation_id, full_name],
        )?;
        transaction.commit()?;
        Ok(updated > 0)
    }

    fn clear_titles(&self) -> StoreResult<()> {
        let connection = self.open_connection()?;
        connection.execute("UPDATE users SET title = NULL", [])?;
        Ok(())
    }

    fn set_title(&self, conversation_id: &str, full_name: &str, title: Title) -> StoreResult<()> {
        let connection = self.open_connection()?;
        connection.execute(
            "UPDATE users SET title = ?1 WHERE conversation_id = ?2 AND full_name = ?3",
            params![title.as_str(), conversation_id, full_name],
        )?;
        Ok(())
    }

    fn karma_entries(&self) -> StoreResult<Vec<KarmaEntry>> {
        let connection = self.open_connection()?;
        let mut statement = connection.prepare("SELECT target, karma FROM karma ORDER BY rowid")?;
        let rows = statement.query_map([], |row| {
            Ok(KarmaEntry {
                target: row.get(0)?,
                karma: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn find_karma(&self, target: &str) -> StoreResult<Option<KarmaEntry>> {
        let connection = self.open_connection()?;
        Ok(connection
            .query_row(
                "SELECT target, karma FROM karma WHERE target = ?1",
                params![target],
                |row| {
                    Ok(KarmaEntry {
                        target: row.get(0)?,
                        karma: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn change_karma(&self, target: &str, delta: i64) -> StoreResult<i64> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        let total = add_karma(&transaction, target, delta)?;
        transaction.commit()?;
        Ok(total)
    }

    fn aliases(&self) -> StoreResult<Vec<AliasRecord>> {
        let connection = self.open_connection()?;
        let mut statement = connection.prepare("SELECT old, new FROM aliases ORDER BY rowid")?;
        let rows = statement.query_map([], |row| {
            Ok(AliasRecord {
                old: row.get(0)?,
                new: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn find_alias(&self, old: &str) -> StoreResult<Option<AliasRecord>> {
        let connection = self.open_connection()?;
        Ok(connection
            .query_row(
                "SELECT old, new FROM aliases WHERE old = ?1",
                params![old],
                |row| {
                    Ok(AliasRecord {
                        old: row.get(0)?,
                        new: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn insert_alias(&self, old: &str, new: &str) -> StoreResult<()> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        transaction.execute(
            "INSERT OR REPLACE INTO aliases (old, new) VALUES (?1, ?2)",
            params![old, new],
        )?;
        transaction.commit()?;
        Ok(())
    }

    fn remove_alias(&self, old: &str) -> StoreResult<bool> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        let removed = transaction.execute("DELETE FROM aliases WHERE old = ?1", params![old])?;
        transaction.commit()?;
        Ok(removed > 0)
    }

    fn debts(&self) -> StoreResult<Vec<DebtRecord>> {
        let connection = self.open_connection()?;
        let mut statement =
            connection.prepare("SELECT lender, borrower, amount FROM debt ORDER BY rowid")?;
        let rows = statement.query_map([], |row| {
            Ok(DebtRecord {
                lender: row.get(0)?,
                borrower: row.get(1)?,
                amount: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn settle_spot(
        &self,
        lender: &str,
        lender_account: &str,
        borrower: &str,
        amount: i64,
    ) -> StoreResult<SpotSettlement> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        let settlement = SpotSettlement::compute(
            amount,
            debt_amount(&transaction, borrower, lender)?,
            debt_amount(&transaction, lender, borrower)?,
        );
        if settlement.repaid > 0 {
            upsert_debt(&transaction, borrower, lender, settlement.still_owed)?;
        }
        upsert_debt(&transaction, lender, borrower, settlement.receivable)?;
        add_karma(&transaction, lender_account, -amount)?;
        add_karma(&transaction, borrower, amount)?;
        transaction.commit()?;
        Ok(settlement)
    }

    fn insert_quote(
        &self,
        quote: &str,
        said_by: &str,
        said_at: DateTime<Utc>,
    ) -> StoreResult<QuoteRecord> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        transaction.execute(
            "INSERT INTO quotes (quote, said_by, said_at) VALUES (?1, ?2, ?3)",
            params![quote, said_by, timestamp_to_db(said_at)],
        )?;
        transaction.commit()?;
        Ok(QuoteRecord {
            quote: quote.to_string(),
            said_by: said_by.to_string(),
            said_at,
        })
    }

    fn quotes(&self, said_by: Option<&str>) -> StoreResult<Vec<QuoteRecord>> {
        let connection = self.open_connection()?;
        let mut statement = connection.prepare(
            r#"
            SELECT quote, said_by, said_at FROM quotes
            WHERE ?1 IS NULL OR said_by = ?1
            ORDER BY quote_row_id
            "#,
        )?;
        let rows = statement.query_map(params![said_by], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut quotes = Vec::new();
        for row in rows {
            let (quote, said_by, said_at) = row?;
            quotes.push(QuoteRecord {
                quote,
                said_by,
                said_at: timestamp_from_db(&said_at)?,
            });
        }
        Ok(quotes)
    }

    fn register_command(&self, name: &str) -> StoreResult<u32> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        transaction.execute(
            "INSERT OR IGNORE INTO commands (name, privilege) VALUES (?1, 0)",
            params![name],
        )?;
        let stored = transaction.query_row(
            "SELECT privilege FROM commands WHERE name = ?1",
            params![name],
            |row| row.get::<_, i64>(0),
        )?;
        transaction.commit()?;
        privilege_from_db("commands.privilege", stored)
    }

    fn command_privilege(&self, name: &str) -> StoreResult<Option<u32>> {
        let connection = self.open_connection()?;
        let stored = connection
            .query_row(
                "SELECT privilege FROM commands WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        stored
            .map(|value| privilege_from_db("commands.privilege", value))
            .transpose()
    }

    fn set_command_privilege(&self, name: &str, privilege: u32) -> StoreResult<bool> {
        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        let updated = transaction.execute(
            "UPDATE commands SET privilege = ?1 WHERE name = ?2",
            params![i64::from(privilege), name],
        )?;
        transaction.commit()?;
        Ok(updated > 0)
    }

    fn jokes(&self, kind: &str) -> StoreResult<Vec<JokeRecord>> {
        let connection = self.open_connection()?;
        let mut statement =
            connection.prepare("SELECT type, joke FROM jokes WHERE type = ?1 ORDER BY rowid")?;
        let rows = statement.query_map(params![kind], |row| {
            Ok(JokeRecord {
                kind: row.get(0)?,
                joke: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_joke(&self, kind: &str, joke: &str) -> StoreResult<()> {
        let connection = self.open_connection()?;
        connection.execute(
            "INSERT INTO jokes (joke, type) VALUES (?1, ?2)",
            params![joke, kind],
        )?;
        Ok(())
    }
}
