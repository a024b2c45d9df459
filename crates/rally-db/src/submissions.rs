use anyhow::Result;
use rusqlite::{Connection, Row};

use rally_types::models::{PaymentStatus, SubmissionStatus};

use crate::models::{
    AttemptAdded, ContactRow, NewContact, NewParticipate, ParticipateRow, PaymentAttemptRow,
    PaymentUpdate,
};
use crate::{Database, OptionalExt};

const PARTICIPATE_COLUMNS: &str = "id, user_id, full_name, email, phone, bank_name, account_number, \
     account_name, state, city, address, interests, message, status, payment_status, \
     payment_reference, provider_customer_id, amount_paid, admin_notes, created_at, updated_at";

const CONTACT_COLUMNS: &str =
    "id, user_id, name, email, phone, subject, message, status, admin_notes, created_at, updated_at";

impl Database {
    // -- Participate --

    /// New rows always start `pending` / `unpaid` (column defaults).
    pub fn insert_participate(&self, new: &NewParticipate) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO participate_submissions
                    (id, user_id, full_name, email, phone, bank_name, account_number, account_name,
                     state, city, address, interests, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    new.id,
                    new.user_id,
                    new.full_name,
                    new.email,
                    new.phone,
                    new.bank_name,
                    new.account_number,
                    new.account_name,
                    new.state,
                    new.city,
                    new.address,
                    new.interests,
                    new.message
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_participate(&self, id: &str) -> Result<Option<ParticipateRow>> {
        self.with_conn(|conn| query_participate_one(conn, "id = ?1", id))
    }

    /// Resolve any reference the submission was ever issued, not just the current one.
    pub fn get_participate_by_reference(&self, reference: &str) -> Result<Option<ParticipateRow>> {
        self.with_conn(|conn| {
            query_participate_one(
                conn,
                "id = (SELECT submission_id FROM payment_attempts WHERE reference = ?1)",
                reference,
            )
        })
    }

    pub fn list_participate(&self) -> Result<Vec<ParticipateRow>> {
        self.with_conn(|conn| query_participate_many(conn, "1 = 1", None))
    }

    pub fn list_participate_by_user(&self, user_id: &str) -> Result<Vec<ParticipateRow>> {
        self.with_conn(|conn| query_participate_many(conn, "user_id = ?1", Some(user_id)))
    }

    /// Submissions that have started a payment.
    pub fn list_payments(&self) -> Result<Vec<ParticipateRow>> {
        self.with_conn(|conn| query_participate_many(conn, "payment_reference IS NOT NULL", None))
    }

    pub fn list_payments_by_user(&self, user_id: &str) -> Result<Vec<ParticipateRow>> {
        self.with_conn(|conn| {
            query_participate_many(
                conn,
                "payment_reference IS NOT NULL AND user_id = ?1",
                Some(user_id),
            )
        })
    }

    /// Flat assignment: any status may replace any other. `None` notes keep the old notes.
    pub fn update_participate_status(
        &self,
        id: &str,
        status: SubmissionStatus,
        admin_notes: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| update_status(conn, "participate_submissions", id, status, admin_notes))
    }

    pub fn delete_participate(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM participate_submissions WHERE id = ?1", [id])? > 0)
        })
    }

    /// Open a new checkout for an unpaid submission. The reference becomes the
    /// submission's current one; earlier references stay resolvable through
    /// `payment_attempts` so a late verification still lands.
    pub fn add_payment_attempt(
        &self,
        submission_id: &str,
        reference: &str,
        amount: i64,
    ) -> Result<AttemptAdded> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE participate_submissions
                 SET payment_reference = ?2, updated_at = datetime('now')
                 WHERE id = ?1 AND payment_status != 'paid'",
                (submission_id, reference),
            )?;
            if changed == 0 {
                let exists: Option<String> = tx
                    .query_row(
                        "SELECT payment_status FROM participate_submissions WHERE id = ?1",
                        [submission_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                return Ok(match exists {
                    Some(_) => AttemptAdded::AlreadyPaid,
                    None => AttemptAdded::NoSuchSubmission,
                });
            }

            tx.execute(
                "INSERT INTO payment_attempts (reference, submission_id, amount) VALUES (?1, ?2, ?3)",
                rusqlite::params![reference, submission_id, amount],
            )?;
            tx.commit()?;
            Ok(AttemptAdded::Added)
        })
    }

    pub fn get_payment_attempt(&self, reference: &str) -> Result<Option<PaymentAttemptRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT reference, submission_id, amount, created_at
                 FROM payment_attempts WHERE reference = ?1",
                [reference],
                |row| {
                    Ok(PaymentAttemptRow {
                        reference: row.get(0)?,
                        submission_id: row.get(1)?,
                        amount: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Write a provider verification result for any reference the submission
    /// was issued. A row already `paid` is never overwritten, so concurrent
    /// verifications cannot downgrade a payment. A successful reference
    /// becomes the submission's current one.
    pub fn record_payment_result(
        &self,
        reference: &str,
        status: PaymentStatus,
        amount: Option<i64>,
        customer_id: Option<&str>,
    ) -> Result<PaymentUpdate> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE participate_submissions
                 SET payment_status = ?2,
                     payment_reference = CASE WHEN ?2 = 'paid' THEN ?1 ELSE payment_reference END,
                     amount_paid = COALESCE(?3, amount_paid),
                     provider_customer_id = COALESCE(?4, provider_customer_id),
                     updated_at = datetime('now')
                 WHERE id = (SELECT submission_id FROM payment_attempts WHERE reference = ?1)
                   AND payment_status != 'paid'",
                rusqlite::params![reference, status.as_str(), amount, customer_id],
            )?;
            if changed > 0 {
                return Ok(PaymentUpdate::Recorded);
            }

            let exists: Option<String> = conn
                .query_row(
                    "SELECT submission_id FROM payment_attempts WHERE reference = ?1",
                    [reference],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(match exists {
                Some(_) => PaymentUpdate::AlreadyPaid,
                None => PaymentUpdate::NoSuchReference,
            })
        })
    }

    // -- Contact --

    pub fn insert_contact(&self, new: &NewContact) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contact_submissions (id, user_id, name, email, phone, subject, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    new.id,
                    new.user_id,
                    new.name,
                    new.email,
                    new.phone,
                    new.subject,
                    new.message
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_contact(&self, id: &str) -> Result<Option<ContactRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contact_submissions WHERE id = ?1"),
                [id],
                map_contact,
            )
            .optional()
        })
    }

    pub fn list_contact(&self) -> Result<Vec<ContactRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contact_submissions ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([], map_contact)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_contact_status(
        &self,
        id: &str,
        status: SubmissionStatus,
        admin_notes: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| update_status(conn, "contact_submissions", id, status, admin_notes))
    }

    pub fn delete_contact(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM contact_submissions WHERE id = ?1", [id])? > 0)
        })
    }
}

fn update_status(
    conn: &Connection,
    table: &str,
    id: &str,
    status: SubmissionStatus,
    admin_notes: Option<&str>,
) -> Result<bool> {
    let changed = conn.execute(
        &format!(
            "UPDATE {table}
             SET status = ?2, admin_notes = COALESCE(?3, admin_notes), updated_at = datetime('now')
             WHERE id = ?1"
        ),
        rusqlite::params![id, status.as_str(), admin_notes],
    )?;
    Ok(changed > 0)
}

fn query_participate_one(
    conn: &Connection,
    filter: &str,
    value: &str,
) -> Result<Option<ParticipateRow>> {
    conn.query_row(
        &format!("SELECT {PARTICIPATE_COLUMNS} FROM participate_submissions WHERE {filter}"),
        [value],
        map_participate,
    )
    .optional()
}

fn query_participate_many(
    conn: &Connection,
    filter: &str,
    param: Option<&str>,
) -> Result<Vec<ParticipateRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARTICIPATE_COLUMNS} FROM participate_submissions
         WHERE {filter}
         ORDER BY created_at DESC, rowid DESC"
    ))?;

    let rows = match param {
        Some(p) => stmt.query_map([p], map_participate)?,
        None => stmt.query_map([], map_participate)?,
    }
    .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_participate(row: &Row<'_>) -> rusqlite::Result<ParticipateRow> {
    Ok(ParticipateRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        bank_name: row.get(5)?,
        account_number: row.get(6)?,
        account_name: row.get(7)?,
        state: row.get(8)?,
        city: row.get(9)?,
        address: row.get(10)?,
        interests: row.get(11)?,
        message: row.get(12)?,
        status: row.get(13)?,
        payment_status: row.get(14)?,
        payment_reference: row.get(15)?,
        provider_customer_id: row.get(16)?,
        amount_paid: row.get(17)?,
        admin_notes: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

fn map_contact(row: &Row<'_>) -> rusqlite::Result<ContactRow> {
    Ok(ContactRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        subject: row.get(5)?,
        message: row.get(6)?,
        status: row.get(7)?,
        admin_notes: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
