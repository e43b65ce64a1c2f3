use crate::db::{self, DbPool};
use crate::types::timers::{Timer, TimerId};
use crate::types::users::{Session, User, UserId};

use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::MutexGuard;
use time::OffsetDateTime;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),
    #[error("database io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("timestamp out of range: {0}")]
    Timestamp(#[from] time::error::ComponentRange),
    #[error("username is already taken")]
    UsernameTaken,
}

/// Users, sessions and timers, backed by a single SQLite connection.
#[derive(Debug, Clone)]
pub struct Store {
    db: DbPool,
}

impl Store {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        db::init_db(path).map(Self::new)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        db::init_in_memory().map(Self::new)
    }

    /// Run blocking store work on the blocking pool.
    pub async fn run<F, R, E>(&self, task: F) -> Result<R, E>
    where
        F: FnOnce(&Store) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || task(&store))
            .await
            .map_err(|err| E::from(StoreError::Task(err)))?
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().expect("database lock")
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn();
        let user = conn
            .query_row(
                "SELECT id, username, password_hash FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<User, StoreError> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_hash, to_millis(now)],
        );
        match inserted {
            Ok(_) => Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::UsernameTaken)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn create_session(
        &self,
        user_id: UserId,
        session_id: &str,
        now: OffsetDateTime,
        ttl: time::Duration,
    ) -> Result<Session, StoreError> {
        let expires_at = now + ttl;
        self.conn().execute(
            "INSERT INTO sessions (session_id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, user_id, to_millis(now), to_millis(expires_at)],
        )?;
        Ok(Session {
            session_id: session_id.to_string(),
            user_id,
            created_at: now,
            expires_at,
        })
    }

    /// Resolve a session token to its user. Expired sessions resolve to
    /// `None` and are deleted.
    pub fn lookup_by_session_id(
        &self,
        session_id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let conn = self.conn();
        let found = conn
            .query_row(
                "SELECT u.id, u.username, u.password_hash, s.expires_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.session_id = ?1",
                params![session_id],
                |row| Ok((user_from_row(row)?, row.get::<_, i64>(3)?)),
            )
            .optional()?;

        let Some((user, expires_at)) = found else {
            return Ok(None);
        };
        if expires_at <= to_millis(now) {
            conn.execute(
                "DELETE FROM sessions WHERE session_id = ?1",
                params![session_id],
            )?;
            tracing::debug!(user_id = user.id, "expired session removed");
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub fn delete_session(&self, session_id: &str) -> Result<bool, StoreError> {
        let deleted = self.conn().execute(
            "DELETE FROM sessions WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(deleted > 0)
    }

    /// Timers owned by `user_id` in creation order, optionally filtered by
    /// their active flag.
    pub fn list_by_user(
        &self,
        user_id: UserId,
        active: Option<bool>,
    ) -> Result<Vec<Timer>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, description, start_ms, end_ms, is_active
             FROM timers
             WHERE user_id = ?1 AND (?2 IS NULL OR is_active = ?2)
             ORDER BY id",
        )?;
        let timers = stmt
            .query_map(params![user_id, active], timer_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(timers)
    }

    pub fn create_timer(
        &self,
        user_id: UserId,
        description: &str,
        now: OffsetDateTime,
    ) -> Result<Timer, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO timers (user_id, description, start_ms, is_active) VALUES (?1, ?2, ?3, 1)",
            params![user_id, description, to_millis(now)],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Timer {
            id,
            user_id,
            description: description.to_string(),
            start: from_millis(to_millis(now))?,
            end: None,
            is_active: true,
        })
    }

    /// Stop an active timer owned by `user_id`. Returns `None` when the
    /// timer is unknown, owned by someone else, or already stopped.
    pub fn stop_timer(
        &self,
        user_id: UserId,
        timer_id: TimerId,
        now: OffsetDateTime,
    ) -> Result<Option<Timer>, StoreError> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE timers SET is_active = 0, end_ms = ?3
             WHERE id = ?1 AND user_id = ?2 AND is_active = 1",
            params![timer_id, user_id, to_millis(now)],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        let timer = conn
            .query_row(
                "SELECT id, user_id, description, start_ms, end_ms, is_active
                 FROM timers WHERE id = ?1",
                params![timer_id],
                timer_from_row,
            )
            .optional()?;
        Ok(timer)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
    })
}

fn timer_from_row(row: &Row<'_>) -> rusqlite::Result<Timer> {
    let start = column_timestamp(3, row.get(3)?)?;
    let end = match row.get::<_, Option<i64>>(4)? {
        Some(ms) => Some(column_timestamp(4, ms)?),
        None => None,
    };
    Ok(Timer {
        id: row.get(0)?,
        user_id: row.get(1)?,
        description: row.get(2)?,
        start,
        end,
        is_active: row.get(5)?,
    })
}

fn column_timestamp(index: usize, ms: i64) -> rusqlite::Result<OffsetDateTime> {
    from_millis(ms).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(err))
    })
}

pub(crate) fn to_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn from_millis(ms: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use time::format_description::well_known::Rfc3339;

    fn now() -> OffsetDateTime {
        OffsetDateTime::parse("2025-01-12T09:30:00Z", &Rfc3339).expect("parse now")
    }

    fn store_with_user(username: &str) -> (Store, User) {
        let store = Store::open_in_memory().expect("open store");
        let user = store
            .create_user(username, "hash", now())
            .expect("create user");
        (store, user)
    }

    #[test]
    fn create_user__should_reject_duplicate_username() {
        // Given
        let (store, _) = store_with_user("alice");

        // When
        let result = store.create_user("alice", "other", now());

        // Then
        assert!(matches!(result, Err(StoreError::UsernameTaken)));
    }

    #[test]
    fn find_user_by_username__should_return_created_user() {
        // Given
        let (store, user) = store_with_user("alice");

        // When
        let found = store.find_user_by_username("alice").expect("find user");

        // Then
        assert_eq!(found, Some(user));
        assert!(store.find_user_by_username("bob").expect("find").is_none());
    }

    #[test]
    fn lookup_by_session_id__should_resolve_live_session() {
        // Given
        let (store, user) = store_with_user("alice");
        store
            .create_session(user.id, "token-1", now(), time::Duration::hours(1))
            .expect("create session");

        // When
        let found = store
            .lookup_by_session_id("token-1", now() + time::Duration::minutes(5))
            .expect("lookup");

        // Then
        assert_eq!(found.map(|user| user.username), Some("alice".to_string()));
    }

    #[test]
    fn lookup_by_session_id__should_drop_expired_session() {
        // Given
        let (store, user) = store_with_user("alice");
        store
            .create_session(user.id, "token-1", now(), time::Duration::hours(1))
            .expect("create session");

        // When
        let found = store
            .lookup_by_session_id("token-1", now() + time::Duration::hours(2))
            .expect("lookup");

        // Then
        assert!(found.is_none());
        assert!(!store.delete_session("token-1").expect("delete"));
    }

    #[test]
    fn delete_session__should_report_whether_session_existed() {
        // Given
        let (store, user) = store_with_user("alice");
        store
            .create_session(user.id, "token-1", now(), time::Duration::hours(1))
            .expect("create session");

        // Then
        assert!(store.delete_session("token-1").expect("delete"));
        assert!(!store.delete_session("token-1").expect("delete again"));
        assert!(
            store
                .lookup_by_session_id("token-1", now())
                .expect("lookup")
                .is_none()
        );
    }

    #[test]
    fn stop_timer__should_set_end_and_clear_active_flag() {
        // Given
        let (store, user) = store_with_user("alice");
        let timer = store
            .create_timer(user.id, "review notes", now())
            .expect("create timer");
        assert!(timer.is_active);
        assert!(timer.end.is_none());

        // When
        let stopped = store
            .stop_timer(user.id, timer.id, now() + time::Duration::seconds(90))
            .expect("stop timer")
            .expect("stopped timer");

        // Then
        assert!(!stopped.is_active);
        assert_eq!(stopped.end, Some(now() + time::Duration::seconds(90)));
        assert!(stopped.is_consistent());
    }

    #[test]
    fn stop_timer__should_ignore_foreign_and_stopped_timers() {
        // Given
        let (store, alice) = store_with_user("alice");
        let bob = store.create_user("bob", "hash", now()).expect("create bob");
        let timer = store
            .create_timer(alice.id, "alice's", now())
            .expect("create timer");

        // Then
        assert!(store.stop_timer(bob.id, timer.id, now()).expect("stop").is_none());
        assert!(store.stop_timer(alice.id, timer.id, now()).expect("stop").is_some());
        assert!(store.stop_timer(alice.id, timer.id, now()).expect("stop").is_none());
        assert!(store.stop_timer(alice.id, 999, now()).expect("stop").is_none());
    }

    #[test]
    fn list_by_user__should_filter_by_owner_and_active_flag() {
        // Given
        let (store, alice) = store_with_user("alice");
        let bob = store.create_user("bob", "hash", now()).expect("create bob");
        let first = store.create_timer(alice.id, "first", now()).expect("create");
        store.create_timer(alice.id, "second", now()).expect("create");
        store.create_timer(bob.id, "bob's", now()).expect("create");
        store
            .stop_timer(alice.id, first.id, now())
            .expect("stop")
            .expect("stopped");

        // When
        let all = store.list_by_user(alice.id, None).expect("list all");
        let active = store.list_by_user(alice.id, Some(true)).expect("list active");
        let stopped = store.list_by_user(alice.id, Some(false)).expect("list stopped");

        // Then
        let descriptions: Vec<_> = all.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, vec!["first", "second"]);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].description, "second");
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].description, "first");
        assert!(all.iter().all(Timer::is_consistent));
    }

    #[test]
    fn create_timer__should_reject_overlong_description() {
        // Given
        let (store, user) = store_with_user("alice");
        let description = "x".repeat(256);

        // When
        let result = store.create_timer(user.id, &description, now());

        // Then
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
    }

    #[tokio::test]
    async fn run__should_execute_on_blocking_pool() {
        // Given
        let (store, user) = store_with_user("alice");

        // When
        let timers = store
            .run(move |store| store.list_by_user(user.id, None))
            .await
            .expect("list timers");

        // Then
        assert!(timers.is_empty());
    }
}
