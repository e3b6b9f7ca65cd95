//! Query functions take a plain `&Connection` so they can run either on their
//! own (through `Database::with_conn`) or as steps of a `Database::transaction`.

pub mod domains;
pub mod inquiries;
pub mod messages;
pub mod users;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            Self::NewestFirst => "DESC",
            Self::OldestFirst => "ASC",
        }
    }
}

/// Timestamps are stored as fixed-width RFC 3339 so TEXT ordering is
/// chronological.
pub fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn id(u: Uuid) -> String {
    u.to_string()
}

pub(crate) fn opt_id(u: Option<Uuid>) -> Option<String> {
    u.map(|u| u.to_string())
}

/// Read a TEXT column and parse it into `T`.
pub(crate) fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parsed_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// `?1, ?2, …` for an IN clause starting at parameter `start`.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> anyhow::Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> anyhow::Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use rusqlite::Connection;
    use uuid::Uuid;

    use dealroom_types::models::{DomainStatus, InquiryStatus, Role};

    use crate::models::{DomainRow, InquiryRow, UserRow};

    pub fn user(conn: &Connection, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        super::users::insert_user(
            conn,
            &UserRow {
                id,
                email: format!("{}@example.test", id.simple()),
                name: format!("{:?} user", role),
                role,
                password: "hash".into(),
                created_at: Utc::now(),
            },
        )
        .unwrap();
        id
    }

    pub fn domain(conn: &Connection, owner_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        super::domains::insert_domain(
            conn,
            &DomainRow {
                id,
                name: format!("{}.com", id.simple()),
                owner_id,
                status: DomainStatus::Verified,
                asking_price_cents: Some(250_000),
                created_at: Utc::now(),
            },
        )
        .unwrap();
        id
    }

    pub fn inquiry(conn: &Connection, domain_id: Uuid, buyer_id: Option<Uuid>, seller_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        super::inquiries::insert_inquiry(
            conn,
            &InquiryRow {
                id,
                domain_id,
                domain_name: String::new(),
                buyer_id,
                seller_id,
                anonymous_buyer_id: format!("Buyer-{}", &id.simple().to_string()[..8]),
                contact_name: "Jane Buyer".into(),
                contact_email: "jane@buyer.test".into(),
                contact_phone: Some("+1 555 0100".into()),
                contact_company: None,
                budget_range: "$1k-$5k".into(),
                intended_use: "Startup brand".into(),
                timeline: "1 month".into(),
                message: "Is this available?".into(),
                status: InquiryStatus::PendingReview,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
        id
    }
}
