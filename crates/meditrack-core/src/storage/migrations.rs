//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current version.

use indoc::indoc;
use rusqlite::{Connection, Result as SqliteResult};

/// Apply all pending migrations.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or(0)
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Initial schema: the live medicine table, the analytics log, the
/// deleted-medicine archive, a kv store for process state, and the
/// durable timer queue.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS medicines (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            dose        TEXT NOT NULL,
            time        TEXT NOT NULL,
            days        TEXT NOT NULL,
            is_consumed INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS dose_log (
            log_id         INTEGER PRIMARY KEY AUTOINCREMENT,
            medicine_id    INTEGER NOT NULL,
            medicine_name  TEXT NOT NULL,
            scheduled_time TEXT NOT NULL,
            actual_time    TEXT,
            dose           TEXT NOT NULL,
            was_taken      INTEGER NOT NULL DEFAULT 0,
            date           TEXT NOT NULL,
            is_deleted     INTEGER NOT NULL DEFAULT 0,
            UNIQUE (medicine_id, date)
        );

        CREATE TABLE IF NOT EXISTS deleted_medicines (
            deleted_id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name          TEXT NOT NULL,
            dose          TEXT NOT NULL,
            time          TEXT NOT NULL,
            days          TEXT NOT NULL,
            deletion_date TEXT NOT NULL,
            total_logs    INTEGER NOT NULL DEFAULT 0,
            taken_logs    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS timers (
            key            INTEGER PRIMARY KEY,
            payload        TEXT NOT NULL,
            next_fire      TEXT NOT NULL,
            period_minutes INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_dose_log_date ON dose_log(date);
        CREATE INDEX IF NOT EXISTS idx_dose_log_medicine ON dose_log(medicine_id);
        CREATE INDEX IF NOT EXISTS idx_timers_next_fire ON timers(next_fire);
    "})?;
    set_schema_version(conn, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 1);
    }
}
