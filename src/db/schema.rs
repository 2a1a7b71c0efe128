//! Versioned schema migrations.
//!
//! Each migration runs in its own transaction together with the row that
//! records it in `schema_migrations`, so a failed migration leaves no trace.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::Connection;

/// `(version, name, sql)`, applied in slice order.
const MIGRATIONS: &[(&str, &str, &str)] = &[(
    "001",
    "users_projects_sections",
    include_str!("migrations/001_initial.sql"),
)];

/// Apply every migration not yet recorded. Returns the versions applied now.
pub fn run_migrations(conn: &Connection) -> Result<Vec<&'static str>> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let done = applied_versions(conn)?;
    let mut applied = Vec::new();

    for &(version, name, sql) in MIGRATIONS {
        if done.contains(version) {
            continue;
        }
        tracing::info!(version, name, "Applying migration");

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Migration {version} ({name}) failed"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
            (version, name, chrono::Utc::now().to_rfc3339()),
        )?;
        tx.commit()?;

        applied.push(version);
    }

    Ok(applied)
}

fn applied_versions(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn fresh_database_gets_every_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), vec!["001"]);

        let tables = tables(&conn);
        for name in ["projects", "schema_migrations", "sections", "users"] {
            assert!(tables.iter().any(|t| t == name), "missing table {name}");
        }
    }

    #[test]
    fn second_run_applies_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        assert!(run_migrations(&conn).unwrap().is_empty());
        assert_eq!(applied_versions(&conn).unwrap().len(), 1);
    }

    #[test]
    fn section_order_is_unique_per_project() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute_batch(
            "INSERT INTO users VALUES ('u', 'a@b.c', 'x', '2024-01-01T00:00:00Z');
             INSERT INTO projects VALUES ('p', 'u', 'T', 'report', '', '2024-01-01T00:00:00Z');
             INSERT INTO sections (id, project_id, heading, sort_order) VALUES ('s1', 'p', 'A', 0);",
        )
        .unwrap();

        let duplicate = conn.execute(
            "INSERT INTO sections (id, project_id, heading, sort_order) VALUES ('s2', 'p', 'B', 0)",
            [],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn unknown_doc_type_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute("INSERT INTO users VALUES ('u', 'a@b.c', 'x', '2024-01-01T00:00:00Z')", [])
            .unwrap();

        let bad = conn.execute(
            "INSERT INTO projects VALUES ('p', 'u', 'T', 'memo', '', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(bad.is_err());
    }
}
