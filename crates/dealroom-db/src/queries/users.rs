use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use dealroom_types::models::Role;

use super::{OptionalExt, id, parsed, ts};
use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str = "id, email, name, role, password, created_at";

impl Database {
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| find_user_by_email(conn, email))
    }
}

pub fn insert_user(conn: &Connection, user: &UserRow) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, name, role, password, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            id(user.id),
            user.email,
            user.name,
            user.role.as_str(),
            user.password,
            ts(user.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    conn.query_row(&sql, [email], map_user).optional()
}

/// Id of the ADMIN account registered under `email`, if any.
pub fn find_admin_id_by_email(conn: &Connection, email: &str) -> Result<Option<Uuid>> {
    conn.query_row(
        "SELECT id FROM users WHERE email = ?1 AND role = ?2",
        [email, Role::Admin.as_str()],
        |row| parsed(row, 0),
    )
    .optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: parsed(row, 0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: parsed(row, 3)?,
        password: row.get(4)?,
        created_at: parsed(row, 5)?,
    })
}
