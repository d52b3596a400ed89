//! SQL schema for the Muster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per personnel record. Insertion order (rowid) is the natural
-- listing order.
CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    sex           TEXT NOT NULL,
    phone         TEXT NOT NULL,
    email         TEXT NOT NULL,
    rank          TEXT NOT NULL,
    start_date    TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    avatar        TEXT NOT NULL,
    superior      TEXT,            -- user_id of the superior; not a foreign key
    superior_name TEXT,            -- cached copy of the superior's name
    subordinates  TEXT NOT NULL DEFAULT '[]',  -- JSON array of user_ids
    timestamp     TEXT NOT NULL    -- unpadded local creation stamp
);

CREATE INDEX IF NOT EXISTS users_superior_idx ON users(superior);

PRAGMA user_version = 1;
";
