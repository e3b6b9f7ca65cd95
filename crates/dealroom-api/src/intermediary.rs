use std::sync::Mutex;
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use dealroom_db::queries::users;

use crate::error::{ApiError, ApiResult};

/// Read-through cache for the admin account every unreleased message is
/// addressed to. Owned by the application state and handed to the message
/// gateway; the process can drop the cached id with [`invalidate`].
///
/// [`invalidate`]: IntermediaryDirectory::invalidate
pub struct IntermediaryDirectory {
    email: String,
    ttl: Duration,
    slot: Mutex<Option<CachedAdmin>>,
}

#[derive(Clone, Copy)]
struct CachedAdmin {
    id: Uuid,
    fetched_at: Instant,
}

impl IntermediaryDirectory {
    /// `email` is matched the way accounts are stored: trimmed, lowercase.
    pub fn new(email: &str, ttl: Duration) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The intermediary's user id, from cache when fresh, else from `conn`.
    pub fn resolve(&self, conn: &Connection) -> ApiResult<Uuid> {
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }

        let id = users::find_admin_id_by_email(conn, &self.email)?.ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "admin intermediary account {} is not provisioned",
                self.email
            ))
        })?;
        debug!("Resolved admin intermediary {} -> {}", self.email, id);

        let mut slot = self
            .slot
            .lock()
            .map_err(|e| anyhow::anyhow!("intermediary cache poisoned: {}", e))?;
        *slot = Some(CachedAdmin {
            id,
            fetched_at: Instant::now(),
        });
        Ok(id)
    }

    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }

    fn cached(&self) -> Option<Uuid> {
        let slot = self.slot.lock().ok()?;
        (*slot).filter(|c| c.fetched_at.elapsed() < self.ttl).map(|c| c.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dealroom_db::Database;
    use dealroom_db::models::UserRow;
    use dealroom_types::models::Role;

    fn admin(conn: &Connection, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        users::insert_user(
            conn,
            &UserRow {
                id,
                email: email.into(),
                name: "Moderation".into(),
                role: Role::Admin,
                password: "hash".into(),
                created_at: Utc::now(),
            },
        )
        .unwrap();
        id
    }

    #[test]
    fn serves_cached_id_until_invalidated() {
        let db = Database::open_in_memory().unwrap();
        let directory = IntermediaryDirectory::new("admin@dealroom.test", Duration::from_secs(300));

        db.with_conn(|conn| {
            let id = admin(conn, "admin@dealroom.test");
            assert_eq!(directory.resolve(conn).unwrap(), id);

            // Still served after the row is gone: the lookup is not repeated.
            conn.execute("DELETE FROM users", [])?;
            assert_eq!(directory.resolve(conn).unwrap(), id);

            directory.invalidate();
            assert!(matches!(directory.resolve(conn), Err(ApiError::Internal(_))));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn expired_entry_is_refetched() {
        let db = Database::open_in_memory().unwrap();
        let directory = IntermediaryDirectory::new("admin@dealroom.test", Duration::ZERO);

        db.with_conn(|conn| {
            admin(conn, "admin@dealroom.test");
            directory.resolve(conn).unwrap();
            conn.execute("DELETE FROM users", [])?;
            assert!(directory.resolve(conn).is_err());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn finds_admin_seeded_under_mixed_case_address() {
        let db = Database::open_in_memory().unwrap();
        let seeded = crate::auth::seed_admin(&db, "Moderation@Dealroom.Test", "a-strong-password").unwrap();

        let directory = IntermediaryDirectory::new(" Moderation@Dealroom.Test ", Duration::from_secs(300));
        let resolved = db.read(|conn| directory.resolve(conn)).unwrap();
        assert_eq!(resolved, seeded);
    }
}
