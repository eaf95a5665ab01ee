//! Account persistence using SQLite.
//!
//! # Schema
//! ```sql
//! CREATE TABLE accounts (
//!     id                INTEGER PRIMARY KEY AUTOINCREMENT,
//!     username          TEXT UNIQUE NOT NULL,
//!     external_identity TEXT NOT NULL,
//!     encrypted_secret  TEXT NOT NULL,   -- opaque cipher blob
//!     created_at        TEXT NOT NULL    -- ISO 8601 timestamp
//! );
//! ```
//!
//! Username uniqueness is enforced by the UNIQUE constraint, so concurrent
//! duplicate registrations race inside SQLite rather than in application
//! code: exactly one insert succeeds, the rest fail with
//! [`InsertError::DuplicateUsername`].
//!
//! # Thread Safety
//! The connection is wrapped in a Mutex for safe concurrent access; SQLite
//! itself provides the transactional guarantees.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// A persisted account row.
///
/// `encrypted_secret` is opaque everywhere except the credential cipher and
/// must never appear in a log line or API response.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub external_identity: String,
    pub encrypted_secret: String,
    pub created_at: DateTime<Utc>,
}

/// Insert failures, split so callers can distinguish the business-rule
/// violation from infrastructure trouble.
#[derive(Debug)]
pub enum InsertError {
    /// The username is already taken (UNIQUE constraint violation)
    DuplicateUsername,
    /// The storage engine failed
    Storage(anyhow::Error),
}

impl std::fmt::Display for InsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsertError::DuplicateUsername => write!(f, "Username already exists"),
            InsertError::Storage(e) => write!(f, "Storage failure: {}", e),
        }
    }
}

impl std::error::Error for InsertError {}

/// Persists account records in SQLite.
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    /// Opens (or creates) the SQLite database and ensures the schema exists.
    ///
    /// Schema creation is idempotent and safe to run on every startup.
    /// Pass `:memory:` for an ephemeral store in tests.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(&db_path).with_context(|| {
            format!("Failed to open account DB at {}", db_path.as_ref().display())
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    fn create_table(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                username          TEXT UNIQUE NOT NULL,
                external_identity TEXT NOT NULL,
                encrypted_secret  TEXT NOT NULL,
                created_at        TEXT NOT NULL
            );",
        )
        .context("Failed to create accounts table")?;
        Ok(())
    }

    /// Inserts a new account and returns its id.
    ///
    /// Atomic with respect to the uniqueness constraint: of any set of
    /// concurrent inserts for the same username, exactly one succeeds.
    pub fn insert(
        &self,
        username: &str,
        external_identity: &str,
        encrypted_secret: &str,
    ) -> Result<i64, InsertError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO accounts (username, external_identity, encrypted_secret, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                username,
                external_identity,
                encrypted_secret,
                Utc::now().to_rfc3339()
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(InsertError::DuplicateUsername)
            }
            Err(e) => Err(InsertError::Storage(
                anyhow::Error::new(e).context("Failed to insert account"),
            )),
        }
    }

    /// Looks up an account by username.
    pub fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, username, external_identity, encrypted_secret, created_at
             FROM accounts WHERE username = ?1",
            params![username],
            row_to_account,
        )
        .optional()
        .context("Failed to query account by username")
    }

    /// Looks up an account by id.
    pub fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, username, external_identity, encrypted_secret, created_at
             FROM accounts WHERE id = ?1",
            params![id],
            row_to_account,
        )
        .optional()
        .context("Failed to query account by id")
    }
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let created_at_str: String = row.get(4)?;
    let created_at = created_at_str
        .parse::<DateTime<Utc>>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        external_identity: row.get(2)?,
        encrypted_secret: row.get(3)?,
        created_at,
    })
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn in_memory_store() -> UserStore {
        UserStore::new(":memory:").expect("in-memory store failed")
    }

    #[test]
    fn test_insert_and_find_by_username() {
        let store = in_memory_store();

        let id = store
            .insert("alice", "alice@example.com", "blob-1")
            .expect("insert failed");
        assert!(id > 0);

        let account = store
            .find_by_username("alice")
            .unwrap()
            .expect("account not found");
        assert_eq!(account.id, id);
        assert_eq!(account.username, "alice");
        assert_eq!(account.external_identity, "alice@example.com");
        assert_eq!(account.encrypted_secret, "blob-1");
    }

    #[test]
    fn test_find_by_id() {
        let store = in_memory_store();
        let id = store.insert("bob", "bob@example.com", "blob-2").unwrap();

        let account = store.find_by_id(id).unwrap().expect("account not found");
        assert_eq!(account.username, "bob");

        assert!(store.find_by_id(id + 1000).unwrap().is_none());
    }

    #[test]
    fn test_find_missing_username() {
        let store = in_memory_store();
        assert!(store.find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = in_memory_store();
        store.insert("alice", "alice@example.com", "blob-1").unwrap();

        let result = store.insert("alice", "other@example.com", "blob-2");
        assert!(matches!(result, Err(InsertError::DuplicateUsername)));

        // First row unchanged
        let account = store.find_by_username("alice").unwrap().unwrap();
        assert_eq!(account.external_identity, "alice@example.com");
        assert_eq!(account.encrypted_secret, "blob-1");
    }

    #[test]
    fn test_usernames_are_case_sensitive() {
        let store = in_memory_store();
        store.insert("alice", "a@example.com", "blob-1").unwrap();

        // Different case is a different account
        assert!(store.insert("Alice", "a@example.com", "blob-2").is_ok());
    }

    #[test]
    fn test_concurrent_duplicate_inserts_one_winner() {
        let store = Arc::new(in_memory_store());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.insert("alice", &format!("alice{}@example.com", i), "blob")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(InsertError::DuplicateUsername)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 7);
    }

    #[test]
    fn test_schema_creation_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("users.db");

        {
            let store = UserStore::new(&path).unwrap();
            store.insert("alice", "alice@example.com", "blob-1").unwrap();
        }

        // Re-opening runs schema creation again without clobbering data
        let store = UserStore::new(&path).unwrap();
        assert!(store.find_by_username("alice").unwrap().is_some());
    }
}
