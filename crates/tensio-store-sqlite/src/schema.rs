//! SQL schema for the Tensio SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// The reconciliation logic keys on `(region, year)`, so that composite key
/// is UNIQUE here and every upsert targets it. Rows are never deleted;
/// supersession flips `is_archived`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS predictions (
    id              INTEGER PRIMARY KEY,
    region          TEXT NOT NULL,
    area_label      TEXT,
    year            INTEGER NOT NULL,
    percentage      REAL,
    priority        TEXT,
    latitude        REAL,
    longitude       REAL,
    predicted_route TEXT,
    focus_month     TEXT,
    focus_date      TEXT,             -- ISO 8601 date or NULL
    is_archived     INTEGER NOT NULL DEFAULT 0,
    metadata        TEXT NOT NULL DEFAULT 'null',  -- full original row, JSON
    created_at      TEXT NOT NULL,    -- ISO 8601 UTC; server-assigned
    updated_at      TEXT NOT NULL,
    UNIQUE (region, year)
);

CREATE INDEX IF NOT EXISTS predictions_year_idx     ON predictions(year);
CREATE INDEX IF NOT EXISTS predictions_archived_idx ON predictions(is_archived);

PRAGMA user_version = 1;
";
