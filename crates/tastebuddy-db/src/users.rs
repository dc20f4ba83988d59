use crate::models::{ProfileCounts, UserRow};
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::Connection;
use tastebuddy_types::models::EmailVisibility;

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, email) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, username, password_hash, email],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Partial profile update: `None` fields keep their current value.
    /// Returns false when no such user exists.
    pub fn update_user_profile(
        &self,
        id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
        email: Option<&str>,
        email_visibility: Option<EmailVisibility>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    display_name     = COALESCE(?2, display_name),
                    bio              = COALESCE(?3, bio),
                    email            = COALESCE(?4, email),
                    email_visibility = COALESCE(?5, email_visibility)
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    display_name,
                    bio,
                    email,
                    email_visibility.map(|v| v.as_str()),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Follower/following/recipe counts shown on every profile.
    pub fn profile_counts(&self, id: &str) -> Result<ProfileCounts> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM follows WHERE following_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
                    (SELECT COUNT(*) FROM recipes WHERE author_id = ?1)",
                [id],
                |row| {
                    Ok(ProfileCounts {
                        followers: row.get(0)?,
                        following: row.get(1)?,
                        recipes: row.get(2)?,
                    })
                },
            )
            .map_err(Into::into)
        })
    }
}

fn query_user(conn: &Connection, filter: &str, param: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password, display_name, bio, email,
                email_visibility, is_admin, created_at
         FROM users WHERE {filter}"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([param], |row| {
            let visibility: String = row.get(6)?;
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                display_name: row.get(3)?,
                bio: row.get(4)?,
                email: row.get(5)?,
                // the CHECK constraint keeps this parseable
                email_visibility: EmailVisibility::parse(&visibility).unwrap_or_default(),
                is_admin: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn create_and_fetch_user() {
        let db = test_db();
        db.create_user("u1", "alice", "hash", Some("alice@example.com"))
            .unwrap();

        let user = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.email_visibility, EmailVisibility::Hidden);
        assert!(!user.is_admin);

        assert!(db.get_user_by_id("u1").unwrap().is_some());
        assert!(db.get_user_by_id("nope").unwrap().is_none());
        assert!(db.user_exists("u1").unwrap());
        assert!(!db.user_exists("nope").unwrap());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = test_db();
        db.create_user("u1", "alice", "hash", None).unwrap();
        assert!(db.create_user("u2", "alice", "hash", None).is_err());
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let db = test_db();
        db.create_user("u1", "alice", "hash", Some("alice@example.com"))
            .unwrap();

        let updated = db
            .update_user_profile("u1", Some("Alice"), None, None, Some(EmailVisibility::Public))
            .unwrap();
        assert!(updated);

        let user = db.get_user_by_id("u1").unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Alice"));
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.email_visibility, EmailVisibility::Public);

        assert!(!db.update_user_profile("nope", None, None, None, None).unwrap());
    }

    #[test]
    fn profile_counts_reflect_rows() {
        let db = test_db();
        db.create_user("u1", "alice", "hash", None).unwrap();
        db.create_user("u2", "bob", "hash", None).unwrap();
        db.follow("u2", "u1").unwrap();
        db.insert_recipe("r1", "u1", "Toast", None, "bread", "toast it")
            .unwrap();

        let counts = db.profile_counts("u1").unwrap();
        assert_eq!(counts.followers, 1);
        assert_eq!(counts.following, 0);
        assert_eq!(counts.recipes, 1);
    }
}
