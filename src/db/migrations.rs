use rusqlite_migration::{M, Migrations};

/// Schema history. Tracked through SQLite's `user_version` pragma.
/// Timestamps are unix milliseconds.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL UNIQUE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX idx_sessions_user ON sessions(user_id);",
        ),
        M::up(
            "CREATE TABLE timers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    description TEXT NOT NULL CHECK (length(description) <= 255),
    start_ms INTEGER NOT NULL,
    end_ms INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    CHECK ((is_active = 1 AND end_ms IS NULL) OR (is_active = 0 AND end_ms IS NOT NULL))
);

CREATE INDEX idx_timers_user ON timers(user_id, is_active);",
        ),
    ])
}
