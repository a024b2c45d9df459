use crate::models::{
    BlogFields, BlogRow, ContentRow, NewSocial, PaymentSettingsRow, SocialRow, UserRow,
};
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, email, full_name, password, is_admin, created_at";
const BLOG_COLUMNS: &str =
    "id, title, slug, excerpt, body, image_url, author, published, created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        full_name: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, full_name, password) VALUES (?1, ?2, ?3, ?4)",
                (id, email, full_name, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, email"
            ))?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_admins(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE is_admin = 1 ORDER BY email"
            ))?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Set the admin flag by id. Returns the updated row, or `None` if the user does not exist.
    pub fn set_admin(&self, id: &str, is_admin: bool) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET is_admin = ?1 WHERE id = ?2", (is_admin, id))?;
            query_user(conn, "id", id)
        })
    }

    /// Set the admin flag by email. Setting the value a user already has is a no-op.
    pub fn set_admin_by_email(&self, email: &str, is_admin: bool) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET is_admin = ?1 WHERE email = ?2 AND is_admin != ?1",
                (is_admin, email),
            )?;
            query_user(conn, "email", email)
        })
    }

    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])? > 0))
    }

    // -- Content --

    pub fn list_content(&self) -> Result<Vec<ContentRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT section, data, updated_at FROM content ORDER BY section")?;
            let rows = stmt
                .query_map([], map_content)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_content(&self, section: &str) -> Result<Option<ContentRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT section, data, updated_at FROM content WHERE section = ?1",
                [section],
                map_content,
            )
            .optional()
        })
    }

    /// Replace a section wholesale. There is no versioning.
    pub fn upsert_content(&self, section: &str, data: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO content (section, data) VALUES (?1, ?2)
                 ON CONFLICT(section) DO UPDATE SET data = excluded.data, updated_at = datetime('now')",
                (section, data),
            )?;
            Ok(())
        })
    }

    // -- Blog --

    pub fn insert_blog_post(&self, id: &str, post: &BlogFields) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO blog_posts (id, title, slug, excerpt, body, image_url, author, published)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    post.title,
                    post.slug,
                    post.excerpt,
                    post.body,
                    post.image_url,
                    post.author,
                    post.published
                ],
            )?;
            Ok(())
        })
    }

    pub fn update_blog_post(&self, id: &str, post: &BlogFields) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE blog_posts
                 SET title = ?2, slug = ?3, excerpt = ?4, body = ?5, image_url = ?6,
                     author = ?7, published = ?8, updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    post.title,
                    post.slug,
                    post.excerpt,
                    post.body,
                    post.image_url,
                    post.author,
                    post.published
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_blog_post(&self, id: &str) -> Result<Option<BlogRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {BLOG_COLUMNS} FROM blog_posts WHERE id = ?1"),
                [id],
                map_blog,
            )
            .optional()
        })
    }

    pub fn list_blog_posts(&self, published_only: bool) -> Result<Vec<BlogRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BLOG_COLUMNS} FROM blog_posts
                 WHERE published = 1 OR ?1 = 0
                 ORDER BY created_at DESC, title"
            ))?;
            let rows = stmt
                .query_map([published_only], map_blog)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_blog_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM blog_posts WHERE id = ?1", [id])? > 0)
        })
    }

    // -- Social media --

    pub fn list_social_media(&self) -> Result<Vec<SocialRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, platform, url, icon, sort_order FROM social_media
                 ORDER BY sort_order, platform",
            )?;
            let rows = stmt
                .query_map([], map_social)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_social_media(&self, link: &NewSocial) -> Result<()> {
        self.with_conn(|conn| insert_social(conn, link))
    }

    /// Replace every link in one transaction; a failure leaves the old list intact.
    pub fn replace_social_media(&self, links: &[NewSocial]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM social_media", [])?;
            for link in links {
                insert_social(&tx, link)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn delete_social_media(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM social_media WHERE id = ?1", [id])? > 0)
        })
    }

    // -- Payment settings --

    pub fn get_payment_settings(&self) -> Result<PaymentSettingsRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "SELECT amount, currency, enabled, updated_at FROM payment_settings WHERE id = 1",
                [],
                |row| {
                    Ok(PaymentSettingsRow {
                        amount: row.get(0)?,
                        currency: row.get(1)?,
                        enabled: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )?;
            Ok(row)
        })
    }

    pub fn update_payment_settings(&self, amount: i64, currency: &str, enabled: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE payment_settings
                 SET amount = ?1, currency = ?2, enabled = ?3, updated_at = datetime('now')
                 WHERE id = 1",
                (amount, currency, enabled),
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;
    stmt.query_row([value], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        password: row.get(3)?,
        is_admin: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_content(row: &Row<'_>) -> rusqlite::Result<ContentRow> {
    Ok(ContentRow {
        section: row.get(0)?,
        data: row.get(1)?,
        updated_at: row.get(2)?,
    })
}

fn map_blog(row: &Row<'_>) -> rusqlite::Result<BlogRow> {
    Ok(BlogRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt: row.get(3)?,
        body: row.get(4)?,
        image_url: row.get(5)?,
        author: row.get(6)?,
        published: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn map_social(row: &Row<'_>) -> rusqlite::Result<SocialRow> {
    Ok(SocialRow {
        id: row.get(0)?,
        platform: row.get(1)?,
        url: row.get(2)?,
        icon: row.get(3)?,
        sort_order: row.get(4)?,
    })
}

fn insert_social(conn: &Connection, link: &NewSocial) -> Result<()> {
    conn.execute(
        "INSERT INTO social_media (id, platform, url, icon, sort_order) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![link.id, link.platform, link.url, link.icon, link.sort_order],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let db = db();
        db.create_user("u1", "a@x.com", "A", "hash").unwrap();
        let err = db.create_user("u2", "a@x.com", "B", "hash").unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn set_admin_by_email_is_idempotent() {
        let db = db();
        db.create_user("u1", "a@x.com", "A", "hash").unwrap();

        let user = db.set_admin_by_email("a@x.com", true).unwrap().unwrap();
        assert!(user.is_admin);
        let again = db.set_admin_by_email("a@x.com", true).unwrap().unwrap();
        assert!(again.is_admin);
        assert_eq!(db.list_admins().unwrap().len(), 1);

        assert!(db.set_admin_by_email("nobody@x.com", true).unwrap().is_none());
    }

    #[test]
    fn content_upsert_overwrites_section() {
        let db = db();
        db.upsert_content("hero", r#"{"title":"one"}"#).unwrap();
        db.upsert_content("hero", r#"{"title":"two"}"#).unwrap();

        let rows = db.list_content().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data_json()["title"], "two");
        assert!(db.get_content("footer").unwrap().is_none());
    }

    #[test]
    fn unpublished_posts_are_hidden_from_public_listing() {
        let db = db();
        let post = |slug: &str, published| BlogFields {
            title: slug.to_string(),
            slug: slug.to_string(),
            excerpt: None,
            body: "body".into(),
            image_url: None,
            author: None,
            published,
        };
        db.insert_blog_post("p1", &post("live", true)).unwrap();
        db.insert_blog_post("p2", &post("draft", false)).unwrap();

        assert_eq!(db.list_blog_posts(true).unwrap().len(), 1);
        assert_eq!(db.list_blog_posts(false).unwrap().len(), 2);

        let err = db.insert_blog_post("p3", &post("live", true)).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn failed_social_replace_keeps_old_links() {
        let db = db();
        let link = |id: &str, platform: &str| NewSocial {
            id: id.to_string(),
            platform: platform.to_string(),
            url: format!("https://{platform}.com/rally"),
            icon: None,
            sort_order: 0,
        };
        db.insert_social_media(&link("s1", "x")).unwrap();

        // Duplicate platform inside the new list aborts the whole replacement.
        let res = db.replace_social_media(&[link("s2", "instagram"), link("s3", "instagram")]);
        assert!(res.is_err());
        let rows = db.list_social_media().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].platform, "x");

        db.replace_social_media(&[link("s4", "facebook")]).unwrap();
        let rows = db.list_social_media().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].platform, "facebook");
    }

    #[test]
    fn payment_settings_round_trip() {
        let db = db();
        let seeded = db.get_payment_settings().unwrap();
        assert_eq!(seeded.amount, crate::migrations::DEFAULT_PAYMENT_AMOUNT);

        db.update_payment_settings(250_000, "NGN", false).unwrap();
        let updated = db.get_payment_settings().unwrap();
        assert_eq!(updated.amount, 250_000);
        assert!(!updated.enabled);
    }
}
