use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{Approval, EventScope, Store, StoreError, StoreResult};
use crate::models::{Availability, Event, NewEvent, User};

/// Key for the transaction-scoped advisory lock that serializes every
/// check-then-write on approved slots.
const SLOT_LOCK_KEY: i64 = 0x0a11_0c47;

/// SQLSTATE raised by the `events_no_approved_overlap` exclusion constraint.
const EXCLUSION_VIOLATION: &str = "23P01";

const EVENT_COLUMNS: &str = "id, name, start_at, end_at, description, created_by, \
                             is_approved, approved_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin_slot_write(&self) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SLOT_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

async fn overlapping<'e, E>(
    executor: E,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_id: Option<Uuid>,
) -> StoreResult<bool>
where
    E: PgExecutor<'e>,
{
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM events
            WHERE is_approved
              AND start_at < $2
              AND end_at > $1
              AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(exclude_id)
    .fetch_one(executor)
    .await?;
    Ok(taken)
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(EXCLUSION_VIOLATION) => {
            StoreError::Conflict
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_events(&self, scope: EventScope) -> StoreResult<Vec<Event>> {
        let events = match scope {
            EventScope::All => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events ORDER BY start_at, created_at"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            EventScope::VisibleTo(user_id) => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events \
                     WHERE is_approved OR created_by = $1 \
                     ORDER BY start_at, created_at"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(events)
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn is_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<bool> {
        overlapping(&self.pool, start, end, exclude_id).await
    }

    async fn insert_event(&self, new: NewEvent, check_overlap: bool) -> StoreResult<Event> {
        let mut tx = self.begin_slot_write().await?;

        if (check_overlap || new.is_approved())
            && overlapping(&mut *tx, new.start, new.end, None).await?
        {
            return Err(StoreError::Conflict);
        }

        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (id, name, start_at, end_at, description, created_by, is_approved, approved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(new.start)
        .bind(new.end)
        .bind(&new.description)
        .bind(new.created_by)
        .bind(new.is_approved())
        .bind(new.approved_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        debug!(event_id = %event.id, approved = event.is_approved, "Inserted event");
        Ok(event)
    }

    async fn save_event(&self, event: &Event, check_overlap: bool) -> StoreResult<Event> {
        let mut tx = self.begin_slot_write().await?;

        let approved = sqlx::query_scalar::<_, bool>(
            "SELECT is_approved FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(event.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        if (check_overlap || approved)
            && overlapping(&mut *tx, event.start, event.end, Some(event.id)).await?
        {
            return Err(StoreError::Conflict);
        }

        let saved = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET name = $2, start_at = $3, end_at = $4, description = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.name)
        .bind(event.start)
        .bind(event.end)
        .bind(&event.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn approve_event(&self, id: Uuid, approved_at: DateTime<Utc>) -> StoreResult<Approval> {
        let mut tx = self.begin_slot_write().await?;

        let current = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        if current.is_approved {
            return Ok(Approval::Unchanged(current));
        }

        if overlapping(&mut *tx, current.start, current.end, Some(id)).await? {
            return Err(StoreError::Conflict);
        }

        let approved = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET is_approved = TRUE, approved_at = $2, updated_at = $2
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(approved_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        Ok(Approval::Granted(approved))
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, full_name, email, is_staff, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_clients(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, full_name, email, is_staff, created_at, updated_at \
             FROM users WHERE NOT is_staff ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn list_availability(&self) -> StoreResult<Vec<Availability>> {
        let windows = sqlx::query_as::<_, Availability>(
            "SELECT id, weekday, start_time, end_time FROM availability \
             ORDER BY weekday, start_time",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(windows)
    }
}
