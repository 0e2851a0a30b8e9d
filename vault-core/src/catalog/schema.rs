/// Embedded schema for a vault's catalog database (spec.md §6, "Persisted
/// state layout"): `file_entries` referencing `file_statuses` by id,
/// applied with `sqlx::raw_sql` against a fresh or existing SQLite file the
/// same way `ferrex-core`'s Postgres repositories assume a pre-migrated
/// pool, except here the core owns the migration since each vault gets its
/// own private database file rather than a shared server-managed one.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS file_statuses (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

INSERT OR IGNORE INTO file_statuses (id, name) VALUES (1, 'active');
INSERT OR IGNORE INTO file_statuses (id, name) VALUES (2, 'deleted');
INSERT OR IGNORE INTO file_statuses (id, name) VALUES (3, 'disabled');

CREATE TABLE IF NOT EXISTS file_entries (
    id         TEXT PRIMARY KEY,
    path       TEXT NOT NULL,
    name       TEXT NOT NULL,
    parent_id  TEXT REFERENCES file_entries(id),
    is_dir     INTEGER NOT NULL,
    size       INTEGER NOT NULL,
    created    TEXT NOT NULL,
    modified   TEXT NOT NULL,
    status_id  INTEGER NOT NULL REFERENCES file_statuses(id)
);

CREATE INDEX IF NOT EXISTS idx_file_entries_path ON file_entries(path);
CREATE INDEX IF NOT EXISTS idx_file_entries_parent ON file_entries(parent_id);
CREATE INDEX IF NOT EXISTS idx_file_entries_status ON file_entries(status_id);
"#;

pub fn status_id(status: vault_model::FileStatus) -> i64 {
    match status {
        vault_model::FileStatus::Active => 1,
        vault_model::FileStatus::Deleted => 2,
        vault_model::FileStatus::Disabled => 3,
    }
}

pub fn status_from_id(id: i64) -> Option<vault_model::FileStatus> {
    match id {
        1 => Some(vault_model::FileStatus::Active),
        2 => Some(vault_model::FileStatus::Deleted),
        3 => Some(vault_model::FileStatus::Disabled),
        _ => None,
    }
}
