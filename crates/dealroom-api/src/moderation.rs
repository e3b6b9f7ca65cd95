use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use dealroom_db::Database;

use crate::error::{ApiError, ApiResult};
use crate::validate;

/// One admin decision, expressed as precondition + mutation + audit append.
///
/// [`execute`] runs a command against one or many targets inside a single
/// transaction: every target is loaded and checked before the first write,
/// so a failed precondition leaves all rows and the audit trail untouched.
pub trait ModerationCommand {
    type Target;
    type Outcome;

    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Input-level checks that do not depend on stored state.
    fn validate(&self) -> ApiResult<()>;

    fn load(&self, conn: &Connection, ids: &[Uuid]) -> ApiResult<Vec<Self::Target>>;

    fn target_id(target: &Self::Target) -> Uuid;

    /// State precondition for a single target.
    fn check(&self, target: &Self::Target) -> ApiResult<()>;

    /// Guarded write. Must fail if the target changed since `check`.
    fn apply(&self, conn: &Connection, target: &Self::Target, now: DateTime<Utc>) -> ApiResult<Self::Outcome>;

    fn audit(&self, conn: &Connection, target: &Self::Target, now: DateTime<Utc>) -> ApiResult<()>;
}

/// Run `command` for `ids` atomically. Outcomes come back in `ids` order.
pub fn execute<C: ModerationCommand>(db: &Database, command: &C, ids: &[Uuid]) -> ApiResult<Vec<C::Outcome>> {
    command.validate()?;
    let ids = validate::bulk_ids(ids)?;

    db.transaction(|tx| {
        let mut targets = command.load(tx, &ids)?;
        if let Some(missing) = ids
            .iter()
            .find(|id| !targets.iter().any(|t| C::target_id(t) == **id))
        {
            return Err(ApiError::not_found(C::ENTITY, missing));
        }
        targets.sort_by_key(|t| ids.iter().position(|id| *id == C::target_id(t)));

        for target in &targets {
            command.check(target)?;
        }

        let now = Utc::now();
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in &targets {
            outcomes.push(command.apply(tx, target, now)?);
            command.audit(tx, target, now)?;
        }
        Ok(outcomes)
    })
}

/// Error for a guarded write that matched no row.
pub fn lost_race(entity: &str, id: Uuid) -> ApiError {
    ApiError::bad_request(format!("{} {} was modified concurrently", entity, id))
}
