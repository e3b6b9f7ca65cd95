use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use dealroom_types::models::InquiryStatus;

use super::{OptionalExt, SortOrder, id, opt_id, parsed, parsed_opt, placeholders, ts};
use crate::Database;
use crate::models::{DealRow, InquiryModerationRow, InquiryRow};

const INQUIRY_SELECT: &str = "SELECT i.id, i.domain_id, d.name, i.buyer_id, i.seller_id,
        i.anonymous_buyer_id, i.contact_name, i.contact_email, i.contact_phone,
        i.contact_company, i.budget_range, i.intended_use, i.timeline, i.message,
        i.status, i.created_at, i.updated_at
     FROM inquiries i
     JOIN domains d ON d.id = i.domain_id";

/// Ownership and status constraints for inquiry listings. Unset fields do not
/// constrain; `statuses: Some(vec![])` matches nothing.
#[derive(Debug, Clone, Default)]
pub struct InquiryFilter {
    pub buyer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub domain_id: Option<Uuid>,
    pub statuses: Option<Vec<InquiryStatus>>,
}

impl InquiryFilter {
    fn where_clause(&self) -> (String, Vec<String>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<String> = Vec::new();

        let owners = [
            ("i.buyer_id", self.buyer_id),
            ("i.seller_id", self.seller_id),
            ("i.domain_id", self.domain_id),
        ];
        for (column, value) in owners {
            if let Some(value) = value {
                params.push(id(value));
                clauses.push(format!("{} = ?{}", column, params.len()));
            }
        }

        if let Some(statuses) = &self.statuses {
            if statuses.is_empty() {
                clauses.push("0".into());
            } else {
                let start = params.len() + 1;
                params.extend(statuses.iter().map(|s| s.as_str().to_string()));
                clauses.push(format!("i.status IN ({})", placeholders(start, statuses.len())));
            }
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }
}

impl Database {
    pub fn get_inquiry(&self, inquiry_id: Uuid) -> Result<Option<InquiryRow>> {
        self.with_conn(|conn| find_inquiry(conn, inquiry_id))
    }

    pub fn get_inquiry_moderations(&self, inquiry_id: Uuid) -> Result<Vec<InquiryModerationRow>> {
        self.with_conn(|conn| list_inquiry_moderations(conn, inquiry_id))
    }
}

// -- Inquiries --

pub fn insert_inquiry(conn: &Connection, inquiry: &InquiryRow) -> Result<()> {
    conn.execute(
        "INSERT INTO inquiries (id, domain_id, buyer_id, seller_id, anonymous_buyer_id,
            contact_name, contact_email, contact_phone, contact_company, budget_range,
            intended_use, timeline, message, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        rusqlite::params![
            id(inquiry.id),
            id(inquiry.domain_id),
            opt_id(inquiry.buyer_id),
            id(inquiry.seller_id),
            inquiry.anonymous_buyer_id,
            inquiry.contact_name,
            inquiry.contact_email,
            inquiry.contact_phone,
            inquiry.contact_company,
            inquiry.budget_range,
            inquiry.intended_use,
            inquiry.timeline,
            inquiry.message,
            inquiry.status.as_str(),
            ts(inquiry.created_at),
            ts(inquiry.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_inquiry(conn: &Connection, inquiry_id: Uuid) -> Result<Option<InquiryRow>> {
    let sql = format!("{INQUIRY_SELECT} WHERE i.id = ?1");
    conn.query_row(&sql, [id(inquiry_id)], map_inquiry).optional()
}

/// Fetch every inquiry in `ids` that exists; missing ids are simply absent.
pub fn find_inquiries(conn: &Connection, ids: &[Uuid]) -> Result<Vec<InquiryRow>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!("{INQUIRY_SELECT} WHERE i.id IN ({})", placeholders(1, ids.len()));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(ids.iter().map(|u| id(*u))), map_inquiry)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_inquiries(
    conn: &Connection,
    filter: &InquiryFilter,
    order: SortOrder,
    limit: u32,
    offset: u32,
) -> Result<Vec<InquiryRow>> {
    let (where_sql, params) = filter.where_clause();
    let sql = format!(
        "{INQUIRY_SELECT}{where_sql} ORDER BY i.created_at {dir}, i.rowid {dir} LIMIT {limit} OFFSET {offset}",
        dir = order.sql(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), map_inquiry)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_inquiries(conn: &Connection, filter: &InquiryFilter) -> Result<u64> {
    let (where_sql, params) = filter.where_clause();
    let sql = format!("SELECT COUNT(*) FROM inquiries i{where_sql}");
    let count: i64 = conn.query_row(&sql, rusqlite::params_from_iter(params.iter()), |r| r.get(0))?;
    Ok(count as u64)
}

/// Compare-and-set on the status column. Returns 0 when the inquiry is no
/// longer in `from`, which callers treat as a lost race.
pub fn update_inquiry_status(
    conn: &Connection,
    inquiry_id: Uuid,
    from: InquiryStatus,
    to: InquiryStatus,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE inquiries SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        rusqlite::params![to.as_str(), ts(now), id(inquiry_id), from.as_str()],
    )?;
    Ok(changed)
}

/// Overwrite the buyer-editable fields of `revised` and move it from `from`
/// to `revised.status`, under the same compare-and-set rule as
/// [`update_inquiry_status`].
pub fn update_inquiry_details(conn: &Connection, revised: &InquiryRow, from: InquiryStatus) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE inquiries SET contact_name = ?1, contact_email = ?2, contact_phone = ?3,
            contact_company = ?4, budget_range = ?5, intended_use = ?6, timeline = ?7,
            message = ?8, status = ?9, updated_at = ?10
         WHERE id = ?11 AND status = ?12",
        rusqlite::params![
            revised.contact_name,
            revised.contact_email,
            revised.contact_phone,
            revised.contact_company,
            revised.budget_range,
            revised.intended_use,
            revised.timeline,
            revised.message,
            revised.status.as_str(),
            ts(revised.updated_at),
            id(revised.id),
            from.as_str(),
        ],
    )?;
    Ok(changed)
}

pub fn anonymous_id_taken(conn: &Connection, anonymous_id: &str) -> Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM inquiries WHERE anonymous_buyer_id = ?1)",
        [anonymous_id],
        |r| r.get(0),
    )?;
    Ok(taken)
}

fn map_inquiry(row: &Row<'_>) -> rusqlite::Result<InquiryRow> {
    Ok(InquiryRow {
        id: parsed(row, 0)?,
        domain_id: parsed(row, 1)?,
        domain_name: row.get(2)?,
        buyer_id: parsed_opt(row, 3)?,
        seller_id: parsed(row, 4)?,
        anonymous_buyer_id: row.get(5)?,
        contact_name: row.get(6)?,
        contact_email: row.get(7)?,
        contact_phone: row.get(8)?,
        contact_company: row.get(9)?,
        budget_range: row.get(10)?,
        intended_use: row.get(11)?,
        timeline: row.get(12)?,
        message: row.get(13)?,
        status: parsed(row, 14)?,
        created_at: parsed(row, 15)?,
        updated_at: parsed(row, 16)?,
    })
}

// -- Moderation audit --

pub fn insert_inquiry_moderation(conn: &Connection, record: &InquiryModerationRow) -> Result<()> {
    conn.execute(
        "INSERT INTO inquiry_moderations (id, inquiry_id, admin_id, decision, notes,
            rejection_reason, requested_changes, reviewed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            id(record.id),
            id(record.inquiry_id),
            id(record.admin_id),
            record.decision.as_str(),
            record.notes,
            record.rejection_reason,
            serde_json::to_string(&record.requested_changes)?,
            ts(record.reviewed_at),
        ],
    )?;
    Ok(())
}

/// Audit trail for one inquiry, oldest decision first.
pub fn list_inquiry_moderations(conn: &Connection, inquiry_id: Uuid) -> Result<Vec<InquiryModerationRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, inquiry_id, admin_id, decision, notes, rejection_reason, requested_changes, reviewed_at
         FROM inquiry_moderations
         WHERE inquiry_id = ?1
         ORDER BY reviewed_at ASC, rowid ASC",
    )?;

    let rows = stmt
        .query_map([id(inquiry_id)], |row| {
            let changes: String = row.get(6)?;
            Ok(InquiryModerationRow {
                id: parsed(row, 0)?,
                inquiry_id: parsed(row, 1)?,
                admin_id: parsed(row, 2)?,
                decision: parsed(row, 3)?,
                notes: row.get(4)?,
                rejection_reason: row.get(5)?,
                requested_changes: serde_json::from_str(&changes).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
                })?,
                reviewed_at: parsed(row, 7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn count_inquiry_moderations(conn: &Connection, inquiry_id: Uuid) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM inquiry_moderations WHERE inquiry_id = ?1",
        [id(inquiry_id)],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}

// -- Deals --

pub fn insert_deal(conn: &Connection, deal: &DealRow) -> Result<()> {
    conn.execute(
        "INSERT INTO deals (id, inquiry_id, domain_id, buyer_id, seller_id, agreed_price_cents,
            created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            id(deal.id),
            id(deal.inquiry_id),
            id(deal.domain_id),
            opt_id(deal.buyer_id),
            id(deal.seller_id),
            deal.agreed_price_cents,
            id(deal.created_by),
            ts(deal.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_deal_by_inquiry(conn: &Connection, inquiry_id: Uuid) -> Result<Option<DealRow>> {
    conn.query_row(
        "SELECT id, inquiry_id, domain_id, buyer_id, seller_id, agreed_price_cents, created_by, created_at
         FROM deals WHERE inquiry_id = ?1",
        [id(inquiry_id)],
        |row| {
            Ok(DealRow {
                id: parsed(row, 0)?,
                inquiry_id: parsed(row, 1)?,
                domain_id: parsed(row, 2)?,
                buyer_id: parsed_opt(row, 3)?,
                seller_id: parsed(row, 4)?,
                agreed_price_cents: row.get(5)?,
                created_by: parsed(row, 6)?,
                created_at: parsed(row, 7)?,
            })
        },
    )
    .optional()
}
