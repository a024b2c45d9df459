use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Default participation fee in minor units (NGN 5,000.00).
pub const DEFAULT_PAYMENT_AMOUNT: i64 = 500_000;

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
                full_name   TEXT NOT NULL,
                password    TEXT NOT NULL,
                is_admin    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE participate_submissions (
                id                   TEXT PRIMARY KEY,
                user_id              TEXT REFERENCES users(id) ON DELETE SET NULL,
                full_name            TEXT NOT NULL,
                email                TEXT NOT NULL,
                phone                TEXT NOT NULL,
                bank_name            TEXT NOT NULL,
                account_number       TEXT NOT NULL,
                account_name         TEXT NOT NULL,
                state                TEXT,
                city                 TEXT,
                address              TEXT,
                interests            TEXT NOT NULL DEFAULT '[]',
                message              TEXT,
                status               TEXT NOT NULL DEFAULT 'pending',
                payment_status       TEXT NOT NULL DEFAULT 'unpaid',
                payment_reference    TEXT UNIQUE,
                provider_customer_id TEXT,
                amount_paid          INTEGER,
                admin_notes          TEXT,
                created_at           TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at           TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_participate_user ON participate_submissions(user_id);

            CREATE TABLE contact_submissions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT REFERENCES users(id) ON DELETE SET NULL,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL,
                phone       TEXT,
                subject     TEXT,
                message     TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'pending',
                admin_notes TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE content (
                section     TEXT PRIMARY KEY,
                data        TEXT NOT NULL,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE blog_posts (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                slug        TEXT NOT NULL UNIQUE,
                excerpt     TEXT,
                body        TEXT NOT NULL,
                image_url   TEXT,
                author      TEXT,
                published   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE social_media (
                id          TEXT PRIMARY KEY,
                platform    TEXT NOT NULL UNIQUE,
                url         TEXT NOT NULL,
                icon        TEXT,
                sort_order  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (payment settings)");
        conn.execute_batch(&format!(
            "
            CREATE TABLE payment_settings (
                id          INTEGER PRIMARY KEY CHECK (id = 1),
                amount      INTEGER NOT NULL,
                currency    TEXT NOT NULL,
                enabled     INTEGER NOT NULL DEFAULT 1,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO payment_settings (id, amount, currency, enabled)
                VALUES (1, {DEFAULT_PAYMENT_AMOUNT}, 'NGN', 1);

            INSERT INTO schema_version (version) VALUES (2);
            "
        ))?;
    }

    if version < 3 {
        info!("Running migration v3 (payment attempts)");
        conn.execute_batch(
            "
            CREATE TABLE payment_attempts (
                reference     TEXT PRIMARY KEY,
                submission_id TEXT NOT NULL
                              REFERENCES participate_submissions(id) ON DELETE CASCADE,
                amount        INTEGER NOT NULL,
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_payment_attempts_submission ON payment_attempts(submission_id);

            INSERT INTO payment_attempts (reference, submission_id, amount)
                SELECT payment_reference, id,
                       COALESCE(amount_paid, (SELECT amount FROM payment_settings WHERE id = 1))
                FROM participate_submissions
                WHERE payment_reference IS NOT NULL;

            INSERT INTO schema_version (version) VALUES (3);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 3);

        let settings: i64 = conn
            .query_row("SELECT COUNT(*) FROM payment_settings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(settings, 1);
    }
}
