use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use dealroom_types::models::DomainStatus;

use super::{OptionalExt, id, parsed, ts};
use crate::Database;
use crate::models::DomainRow;

const DOMAIN_COLUMNS: &str = "id, name, owner_id, status, asking_price_cents, created_at";

impl Database {
    pub fn get_domain(&self, domain_id: Uuid) -> Result<Option<DomainRow>> {
        self.with_conn(|conn| find_domain(conn, domain_id))
    }

    pub fn get_domains_by_owner(&self, owner_id: Uuid) -> Result<Vec<DomainRow>> {
        self.with_conn(|conn| list_domains_by_owner(conn, owner_id))
    }
}

pub fn insert_domain(conn: &Connection, domain: &DomainRow) -> Result<()> {
    conn.execute(
        "INSERT INTO domains (id, name, owner_id, status, asking_price_cents, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            id(domain.id),
            domain.name,
            id(domain.owner_id),
            domain.status.as_str(),
            domain.asking_price_cents,
            ts(domain.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_domain(conn: &Connection, domain_id: Uuid) -> Result<Option<DomainRow>> {
    let sql = format!("SELECT {DOMAIN_COLUMNS} FROM domains WHERE id = ?1");
    conn.query_row(&sql, [id(domain_id)], map_domain).optional()
}

pub fn find_domain_by_name(conn: &Connection, name: &str) -> Result<Option<DomainRow>> {
    let sql = format!("SELECT {DOMAIN_COLUMNS} FROM domains WHERE name = ?1");
    conn.query_row(&sql, [name], map_domain).optional()
}

pub fn list_domains_by_owner(conn: &Connection, owner_id: Uuid) -> Result<Vec<DomainRow>> {
    let sql = format!("SELECT {DOMAIN_COLUMNS} FROM domains WHERE owner_id = ?1 ORDER BY name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([id(owner_id)], map_domain)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns the number of rows changed (0 when the domain does not exist).
pub fn set_domain_status(conn: &Connection, domain_id: Uuid, status: DomainStatus) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE domains SET status = ?1 WHERE id = ?2",
        rusqlite::params![status.as_str(), id(domain_id)],
    )?;
    Ok(changed)
}

fn map_domain(row: &Row<'_>) -> rusqlite::Result<DomainRow> {
    Ok(DomainRow {
        id: parsed(row, 0)?,
        name: row.get(1)?,
        owner_id: parsed(row, 2)?,
        status: parsed(row, 3)?,
        asking_price_cents: row.get(4)?,
        created_at: parsed(row, 5)?,
    })
}
