use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use dealroom_types::models::MessageStatus;

use super::{OptionalExt, SortOrder, id, parsed, parsed_opt, placeholders, ts};
use crate::Database;
use crate::models::{MessageModerationRow, MessageRow};

const MESSAGE_COLUMNS: &str =
    "id, inquiry_id, sender_id, sender_type, receiver_id, content, status, sent_at, approved_at";

impl Database {
    pub fn get_message(&self, message_id: Uuid) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| find_message(conn, message_id))
    }
}

pub fn insert_message(conn: &Connection, message: &MessageRow) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, inquiry_id, sender_id, sender_type, receiver_id, content,
            status, sent_at, approved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            id(message.id),
            id(message.inquiry_id),
            id(message.sender_id),
            message.sender_type.as_str(),
            id(message.receiver_id),
            message.content,
            message.status.as_str(),
            ts(message.sent_at),
            message.approved_at.map(ts),
        ],
    )?;
    Ok(())
}

pub fn find_message(conn: &Connection, message_id: Uuid) -> Result<Option<MessageRow>> {
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
    conn.query_row(&sql, [id(message_id)], map_message).optional()
}

pub fn find_messages(conn: &Connection, ids: &[Uuid]) -> Result<Vec<MessageRow>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id IN ({})",
        placeholders(1, ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(ids.iter().map(|u| id(*u))), map_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// One page of an inquiry's thread, newest first. With `approved_only` the
/// page is drawn from released messages alone.
pub fn list_messages(
    conn: &Connection,
    inquiry_id: Uuid,
    approved_only: bool,
    limit: u32,
    offset: u32,
) -> Result<Vec<MessageRow>> {
    let status_clause = if approved_only { " AND status = ?2" } else { "" };
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE inquiry_id = ?1{status_clause}
         ORDER BY sent_at DESC, rowid DESC
         LIMIT {limit} OFFSET {offset}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = if approved_only {
        stmt.query_map(
            rusqlite::params![id(inquiry_id), MessageStatus::Approved.as_str()],
            map_message,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        stmt.query_map([id(inquiry_id)], map_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    Ok(rows)
}

pub fn count_messages(conn: &Connection, inquiry_id: Uuid, approved_only: bool) -> Result<u64> {
    let count: i64 = if approved_only {
        conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE inquiry_id = ?1 AND status = ?2",
            rusqlite::params![id(inquiry_id), MessageStatus::Approved.as_str()],
            |r| r.get(0),
        )?
    } else {
        conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE inquiry_id = ?1",
            [id(inquiry_id)],
            |r| r.get(0),
        )?
    };
    Ok(count as u64)
}

/// Moderation queue across all inquiries.
pub fn list_messages_by_status(
    conn: &Connection,
    status: MessageStatus,
    order: SortOrder,
    limit: u32,
    offset: u32,
) -> Result<Vec<MessageRow>> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE status = ?1
         ORDER BY sent_at {dir}, rowid {dir}
         LIMIT {limit} OFFSET {offset}",
        dir = order.sql(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([status.as_str()], map_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_messages_by_status(conn: &Connection, status: MessageStatus) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE status = ?1",
        [status.as_str()],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}

/// Apply a moderation outcome to a PENDING message. Returns 0 if the message
/// was already decided.
pub fn record_message_decision(
    conn: &Connection,
    message_id: Uuid,
    status: MessageStatus,
    content: &str,
    receiver_id: Uuid,
    approved_at: Option<DateTime<Utc>>,
) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE messages SET status = ?1, content = ?2, receiver_id = ?3, approved_at = ?4
         WHERE id = ?5 AND status = ?6",
        rusqlite::params![
            status.as_str(),
            content,
            id(receiver_id),
            approved_at.map(ts),
            id(message_id),
            MessageStatus::Pending.as_str(),
        ],
    )?;
    Ok(changed)
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: parsed(row, 0)?,
        inquiry_id: parsed(row, 1)?,
        sender_id: parsed(row, 2)?,
        sender_type: parsed(row, 3)?,
        receiver_id: parsed(row, 4)?,
        content: row.get(5)?,
        status: parsed(row, 6)?,
        sent_at: parsed(row, 7)?,
        approved_at: parsed_opt(row, 8)?,
    })
}

// -- Moderation audit --

pub fn insert_message_moderation(conn: &Connection, record: &MessageModerationRow) -> Result<()> {
    conn.execute(
        "INSERT INTO message_moderations (id, message_id, admin_id, decision, notes,
            rejection_reason, original_content, reviewed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            id(record.id),
            id(record.message_id),
            id(record.admin_id),
            record.decision.as_str(),
            record.notes,
            record.rejection_reason,
            record.original_content,
            ts(record.reviewed_at),
        ],
    )?;
    Ok(())
}

/// Batch-fetch audit rows for a set of message IDs.
pub fn list_message_moderations(conn: &Connection, message_ids: &[Uuid]) -> Result<Vec<MessageModerationRow>> {
    if message_ids.is_empty() {
        return Ok(vec![]);
    }

    let sql = format!(
        "SELECT id, message_id, admin_id, decision, notes, rejection_reason, original_content, reviewed_at
         FROM message_moderations
         WHERE message_id IN ({})
         ORDER BY reviewed_at ASC, rowid ASC",
        placeholders(1, message_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params_from_iter(message_ids.iter().map(|u| id(*u))),
            |row| {
                Ok(MessageModerationRow {
                    id: parsed(row, 0)?,
                    message_id: parsed(row, 1)?,
                    admin_id: parsed(row, 2)?,
                    decision: parsed(row, 3)?,
                    notes: row.get(4)?,
                    rejection_reason: row.get(5)?,
                    original_content: row.get(6)?,
                    reviewed_at: parsed(row, 7)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_message_moderations(conn: &Connection, message_id: Uuid) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM message_moderations WHERE message_id = ?1",
        [id(message_id)],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}
