use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                role        TEXT NOT NULL,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE domains (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL UNIQUE,
                owner_id            TEXT NOT NULL REFERENCES users(id),
                status              TEXT NOT NULL,
                asking_price_cents  INTEGER,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_domains_owner ON domains(owner_id);

            CREATE TABLE inquiries (
                id                  TEXT PRIMARY KEY,
                domain_id           TEXT NOT NULL REFERENCES domains(id),
                buyer_id            TEXT REFERENCES users(id),
                seller_id           TEXT NOT NULL REFERENCES users(id),
                anonymous_buyer_id  TEXT NOT NULL UNIQUE,
                contact_name        TEXT NOT NULL,
                contact_email       TEXT NOT NULL,
                contact_phone       TEXT,
                contact_company     TEXT,
                budget_range        TEXT NOT NULL,
                intended_use        TEXT NOT NULL,
                timeline            TEXT NOT NULL,
                message             TEXT NOT NULL,
                status              TEXT NOT NULL,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_inquiries_seller ON inquiries(seller_id, status);
            CREATE INDEX idx_inquiries_buyer ON inquiries(buyer_id);
            CREATE INDEX idx_inquiries_status ON inquiries(status, created_at);

            CREATE TABLE messages (
                id           TEXT PRIMARY KEY,
                inquiry_id   TEXT NOT NULL REFERENCES inquiries(id),
                sender_id    TEXT NOT NULL REFERENCES users(id),
                sender_type  TEXT NOT NULL,
                receiver_id  TEXT NOT NULL REFERENCES users(id),
                content      TEXT NOT NULL,
                status       TEXT NOT NULL,
                sent_at      TEXT NOT NULL,
                approved_at  TEXT
            );

            CREATE INDEX idx_messages_inquiry ON messages(inquiry_id, sent_at);
            CREATE INDEX idx_messages_status ON messages(status, sent_at);

            CREATE TABLE inquiry_moderations (
                id                 TEXT PRIMARY KEY,
                inquiry_id         TEXT NOT NULL REFERENCES inquiries(id),
                admin_id           TEXT NOT NULL REFERENCES users(id),
                decision           TEXT NOT NULL,
                notes              TEXT,
                rejection_reason   TEXT,
                requested_changes  TEXT NOT NULL DEFAULT '[]',
                reviewed_at        TEXT NOT NULL
            );

            CREATE INDEX idx_inquiry_moderations_inquiry ON inquiry_moderations(inquiry_id, reviewed_at);

            CREATE TABLE message_moderations (
                id                TEXT PRIMARY KEY,
                message_id        TEXT NOT NULL REFERENCES messages(id),
                admin_id          TEXT NOT NULL REFERENCES users(id),
                decision          TEXT NOT NULL,
                notes             TEXT,
                rejection_reason  TEXT,
                original_content  TEXT,
                reviewed_at       TEXT NOT NULL
            );

            CREATE INDEX idx_message_moderations_message ON message_moderations(message_id);

            -- Audit trail is append-only
            CREATE TRIGGER inquiry_moderations_no_update BEFORE UPDATE ON inquiry_moderations
            BEGIN SELECT RAISE(ABORT, 'inquiry_moderations is append-only'); END;
            CREATE TRIGGER inquiry_moderations_no_delete BEFORE DELETE ON inquiry_moderations
            BEGIN SELECT RAISE(ABORT, 'inquiry_moderations is append-only'); END;
            CREATE TRIGGER message_moderations_no_update BEFORE UPDATE ON message_moderations
            BEGIN SELECT RAISE(ABORT, 'message_moderations is append-only'); END;
            CREATE TRIGGER message_moderations_no_delete BEFORE DELETE ON message_moderations
            BEGIN SELECT RAISE(ABORT, 'message_moderations is append-only'); END;

            CREATE TABLE deals (
                id                  TEXT PRIMARY KEY,
                inquiry_id          TEXT NOT NULL UNIQUE REFERENCES inquiries(id),
                domain_id           TEXT NOT NULL REFERENCES domains(id),
                buyer_id            TEXT REFERENCES users(id),
                seller_id           TEXT NOT NULL REFERENCES users(id),
                agreed_price_cents  INTEGER NOT NULL,
                created_by          TEXT NOT NULL REFERENCES users(id),
                created_at          TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
