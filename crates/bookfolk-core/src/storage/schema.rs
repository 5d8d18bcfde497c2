//! SQLite schema for the local backend
//!
//! Documents are stored as JSON text keyed by (collection, id), the same
//! layout as the remote document store. Local accounts live alongside
//! them. The applied version is kept in `PRAGMA user_version`.

use rusqlite::{Connection, Result};

/// Migrations in order; entry `n` brings the schema to version `n + 1`
const MIGRATIONS: &[&str] = &[r#"
    CREATE TABLE documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        body TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (collection, id)
    );

    CREATE TABLE accounts (
        uid TEXT PRIMARY KEY,
        email TEXT UNIQUE NOT NULL COLLATE NOCASE,
        display_name TEXT,
        password_hash TEXT NOT NULL,
        disabled INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    );
    "#];

/// Version a fully migrated database reports
pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Bring the database up to [`SCHEMA_VERSION`]
///
/// Each pending migration runs in its own transaction together with the
/// version bump.
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current = schema_version(conn)?;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", index as i32 + 1)?;
        tx.commit()?;
    }
    Ok(())
}

/// Version recorded in the database (0 when fresh)
pub fn schema_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Whether any migration is still pending
pub fn needs_init(conn: &Connection) -> bool {
    schema_version(conn).map_or(true, |v| v < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_fresh_database_is_migrated() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_init(&conn));
        assert_eq!(schema_version(&conn).unwrap(), 0);

        init_schema(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_init(&conn));
        let tables = table_names(&conn);
        assert!(tables.contains(&"documents".to_string()));
        assert!(tables.contains(&"accounts".to_string()));
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_account_email_is_case_insensitive() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let insert = "INSERT INTO accounts (uid, email, password_hash, created_at) VALUES (?1, ?2, 'x', 0)";
        conn.execute(insert, ["u1", "Reader@Example.com"]).unwrap();
        assert!(conn.execute(insert, ["u2", "reader@example.com"]).is_err());
    }
}
