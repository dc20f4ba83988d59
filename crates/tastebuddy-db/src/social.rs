use crate::models::UserSummaryRow;
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::Connection;
use tastebuddy_types::models::EmailVisibility;

impl Database {
    /// Create the directed follow edge. Returns true when the edge is new;
    /// re-following is absorbed by the pair constraint and returns false.
    pub fn follow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO follows (follower_id, following_id) VALUES (?1, ?2)",
                [follower_id, following_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Remove the edge. Returns false when there was nothing to remove.
    pub fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                [follower_id, following_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn follow_exists(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                    [follower_id, following_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn follower_count(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
    }

    pub fn list_followers(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                "SELECT u.id, u.username, u.display_name
                 FROM follows f JOIN users u ON f.follower_id = u.id
                 WHERE f.following_id = ?1
                 ORDER BY f.created_at DESC",
                user_id,
            )
        })
    }

    pub fn list_following(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                "SELECT u.id, u.username, u.display_name
                 FROM follows f JOIN users u ON f.following_id = u.id
                 WHERE f.follower_id = ?1
                 ORDER BY f.created_at DESC",
                user_id,
            )
        })
    }

    /// Decide whether `owner_id`'s email is exposed to the viewer.
    ///
    /// Anonymous viewers only see public emails; self-view always sees the
    /// email. For `following_only` the edge consulted is owner → viewer:
    /// the profile owner chooses to expose their email to people *they*
    /// follow, not to anyone who follows them.
    pub fn resolve_email_visibility(
        &self,
        owner_id: &str,
        viewer_id: Option<&str>,
        setting: EmailVisibility,
    ) -> Result<bool> {
        let Some(viewer_id) = viewer_id else {
            return Ok(setting == EmailVisibility::Public);
        };

        if viewer_id == owner_id {
            return Ok(true);
        }

        match setting {
            EmailVisibility::Hidden => Ok(false),
            EmailVisibility::Public => Ok(true),
            EmailVisibility::FollowingOnly => self.follow_exists(owner_id, viewer_id),
        }
    }
}

fn query_summaries(conn: &Connection, sql: &str, param: &str) -> Result<Vec<UserSummaryRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([param], |row| {
            Ok(UserSummaryRow {
                id: row.get(0)?,
                username: row.get(1)?,
                display_name: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("a", "alice", "hash", Some("alice@example.com"))
            .unwrap();
        db.create_user("b", "bob", "hash", None).unwrap();
        db
    }

    #[test]
    fn follow_unfollow_round_trip() {
        let db = db_with_users();

        assert!(db.follow("a", "b").unwrap());
        assert!(db.follow_exists("a", "b").unwrap());
        assert!(!db.follow_exists("b", "a").unwrap());

        // duplicate follow is absorbed
        assert!(!db.follow("a", "b").unwrap());
        assert_eq!(db.follower_count("b").unwrap(), 1);

        assert!(db.unfollow("a", "b").unwrap());
        assert!(!db.unfollow("a", "b").unwrap());
        assert!(!db.follow_exists("a", "b").unwrap());
    }

    #[test]
    fn follower_listings_join_users() {
        let db = db_with_users();
        db.follow("b", "a").unwrap();

        let followers = db.list_followers("a").unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username, "bob");

        let following = db.list_following("b").unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].username, "alice");

        assert!(db.list_followers("b").unwrap().is_empty());
    }

    #[test]
    fn self_view_always_sees_email() {
        let db = db_with_users();
        for setting in [
            EmailVisibility::Hidden,
            EmailVisibility::FollowingOnly,
            EmailVisibility::Public,
        ] {
            assert!(db.resolve_email_visibility("a", Some("a"), setting).unwrap());
        }
    }

    #[test]
    fn anonymous_viewer_needs_public() {
        let db = db_with_users();
        assert!(!db
            .resolve_email_visibility("a", None, EmailVisibility::Hidden)
            .unwrap());
        assert!(!db
            .resolve_email_visibility("a", None, EmailVisibility::FollowingOnly)
            .unwrap());
        assert!(db
            .resolve_email_visibility("a", None, EmailVisibility::Public)
            .unwrap());
    }

    #[test]
    fn hidden_and_public_ignore_the_graph() {
        let db = db_with_users();
        db.follow("a", "b").unwrap();

        assert!(!db
            .resolve_email_visibility("a", Some("b"), EmailVisibility::Hidden)
            .unwrap());
        assert!(db
            .resolve_email_visibility("a", Some("b"), EmailVisibility::Public)
            .unwrap());
    }

    #[test]
    fn following_only_tracks_the_owner_to_viewer_edge() {
        let db = db_with_users();

        // bob following alice is not enough
        db.follow("b", "a").unwrap();
        assert!(!db
            .resolve_email_visibility("a", Some("b"), EmailVisibility::FollowingOnly)
            .unwrap());

        // alice following bob exposes it, unfollowing hides it again
        db.follow("a", "b").unwrap();
        assert!(db
            .resolve_email_visibility("a", Some("b"), EmailVisibility::FollowingOnly)
            .unwrap());

        db.unfollow("a", "b").unwrap();
        assert!(!db
            .resolve_email_visibility("a", Some("b"), EmailVisibility::FollowingOnly)
            .unwrap());
    }
}
