use crate::models::{AchievementRow, AchievementSpec, Award, EarnedRow, UserAchievementRow};
use crate::{Database, OptionalExt};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use uuid::Uuid;

impl Database {
    /// Grant an achievement to a user, defining it first if no definition
    /// matches the spec's `(name, kind)`.
    ///
    /// Idempotent: a second call for the same pair returns the stored row
    /// untouched with `already_held = true`. A concurrent duplicate insert
    /// that trips the pair constraint is folded into the same outcome. The
    /// definition insert and the award insert are separate idempotent steps,
    /// so a failure in between leaves a defined but unawarded achievement,
    /// which the next call completes.
    pub fn award_achievement(
        &self,
        user_id: &str,
        spec: &AchievementSpec<'_>,
        progress: Option<i64>,
    ) -> Result<Award> {
        self.with_conn_mut(|conn| {
            let user_found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [user_id], |row| {
                    row.get(0)
                })
                .optional()?;
            if user_found.is_none() {
                return Err(anyhow!("User not found: {}", user_id));
            }

            let achievement = match query_by_name_kind(conn, spec.name, spec.kind)? {
                Some(existing) => existing,
                None => {
                    let id = Uuid::new_v4().to_string();
                    conn.execute(
                        "INSERT INTO achievements
                            (id, kind, name, description, icon, color, threshold, is_active)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                        rusqlite::params![
                            id,
                            spec.kind,
                            spec.name,
                            spec.description,
                            spec.icon,
                            spec.color,
                            spec.threshold,
                            spec.is_active,
                        ],
                    )?;
                    AchievementRow {
                        id,
                        kind: spec.kind.to_string(),
                        name: spec.name.to_string(),
                        description: spec.description.to_string(),
                        icon: spec.icon.to_string(),
                        color: spec.color.to_string(),
                        threshold: spec.threshold,
                        is_active: spec.is_active,
                    }
                }
            };

            if let Some(held) = query_user_achievement(conn, user_id, &achievement.id)? {
                return Ok(Award {
                    already_held: true,
                    earned_at: held.earned_at,
                    progress: held.progress,
                    achievement,
                });
            }

            let inserted = conn.execute(
                "INSERT INTO user_achievements (user_id, achievement_id, progress)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, achievement.id, progress],
            );

            match inserted {
                Ok(_) => {
                    let earned_at: String = conn.query_row(
                        "SELECT earned_at FROM user_achievements
                         WHERE user_id = ?1 AND achievement_id = ?2",
                        [user_id, achievement.id.as_str()],
                        |row| row.get(0),
                    )?;
                    Ok(Award {
                        already_held: false,
                        earned_at,
                        progress,
                        achievement,
                    })
                }
                // Lost a race against another award of the same pair: the
                // row exists now, report it as held rather than failing.
                Err(err) if is_constraint_violation(&err) => {
                    match query_user_achievement(conn, user_id, &achievement.id)? {
                        Some(held) => Ok(Award {
                            already_held: true,
                            earned_at: held.earned_at,
                            progress: held.progress,
                            achievement,
                        }),
                        None => Err(err.into()),
                    }
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    pub fn find_achievement(&self, name: &str, kind: &str) -> Result<Option<AchievementRow>> {
        self.with_conn(|conn| query_by_name_kind(conn, name, kind))
    }

    pub fn get_achievement(&self, id: &str) -> Result<Option<AchievementRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ACHIEVEMENT_COLUMNS} WHERE id = ?1"))?;
            stmt.query_row([id], map_achievement).optional()
        })
    }

    pub fn insert_achievement(&self, id: &str, spec: &AchievementSpec<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO achievements
                    (id, kind, name, description, icon, color, threshold, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    spec.kind,
                    spec.name,
                    spec.description,
                    spec.icon,
                    spec.color,
                    spec.threshold,
                    spec.is_active,
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_achievements(&self, active_only: bool) -> Result<Vec<AchievementRow>> {
        self.with_conn(|conn| {
            let sql = if active_only {
                format!("{ACHIEVEMENT_COLUMNS} WHERE is_active = 1 ORDER BY kind, name")
            } else {
                format!("{ACHIEVEMENT_COLUMNS} ORDER BY kind, name")
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_achievement)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Partial definition update: `None` fields keep their current value.
    pub fn update_achievement(
        &self,
        id: &str,
        description: Option<&str>,
        icon: Option<&str>,
        color: Option<&str>,
        threshold: Option<i64>,
        is_active: Option<bool>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE achievements SET
                    description = COALESCE(?2, description),
                    icon        = COALESCE(?3, icon),
                    color       = COALESCE(?4, color),
                    threshold   = COALESCE(?5, threshold),
                    is_active   = COALESCE(?6, is_active)
                 WHERE id = ?1",
                rusqlite::params![id, description, icon, color, threshold, is_active],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> Result<Option<UserAchievementRow>> {
        self.with_conn(|conn| query_user_achievement(conn, user_id, achievement_id))
    }

    /// Everything a user has earned, newest first, joined with definitions.
    pub fn list_user_achievements(&self, user_id: &str) -> Result<Vec<EarnedRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.kind, a.name, a.description, a.icon, a.color,
                        a.threshold, a.is_active, ua.earned_at, ua.progress
                 FROM user_achievements ua
                 JOIN achievements a ON ua.achievement_id = a.id
                 WHERE ua.user_id = ?1
                 ORDER BY ua.earned_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(EarnedRow {
                        achievement: map_achievement(row)?,
                        earned_at: row.get(8)?,
                        progress: row.get(9)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

const ACHIEVEMENT_COLUMNS: &str =
    "SELECT id, kind, name, description, icon, color, threshold, is_active FROM achievements";

fn map_achievement(row: &rusqlite::Row<'_>) -> rusqlite::Result<AchievementRow> {
    Ok(AchievementRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        icon: row.get(4)?,
        color: row.get(5)?,
        threshold: row.get(6)?,
        is_active: row.get(7)?,
    })
}

fn query_by_name_kind(conn: &Connection, name: &str, kind: &str) -> Result<Option<AchievementRow>> {
    let mut stmt = conn.prepare(&format!("{ACHIEVEMENT_COLUMNS} WHERE name = ?1 AND kind = ?2"))?;
    stmt.query_row([name, kind], map_achievement).optional()
}

fn query_user_achievement(
    conn: &Connection,
    user_id: &str,
    achievement_id: &str,
) -> Result<Option<UserAchievementRow>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, achievement_id, earned_at, progress
         FROM user_achievements WHERE user_id = ?1 AND achievement_id = ?2",
    )?;
    let row = stmt
        .query_row([user_id, achievement_id], |row| {
            Ok(UserAchievementRow {
                user_id: row.get(0)?,
                achievement_id: row.get(1)?,
                earned_at: row.get(2)?,
                progress: row.get(3)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SPEC: AchievementSpec<'static> = AchievementSpec {
        kind: "recipes",
        name: "First Recipe",
        description: "Posted a first recipe",
        icon: "chef-hat",
        color: "#f59e0b",
        threshold: Some(1),
        is_active: true,
    };

    const OTHER_SPEC: AchievementSpec<'static> = AchievementSpec {
        kind: "social",
        name: "First Follower",
        description: "Someone followed you",
        icon: "sparkles",
        color: "#8b5cf6",
        threshold: Some(1),
        is_active: true,
    };

    fn db_with_user() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "hash", None).unwrap();
        db
    }

    #[test]
    fn first_award_defines_the_achievement() {
        let db = db_with_user();
        assert!(db.find_achievement("First Recipe", "recipes").unwrap().is_none());

        let award = db.award_achievement("u1", &TEST_SPEC, None).unwrap();
        assert!(!award.already_held);
        assert_eq!(award.achievement.name, "First Recipe");

        let definition = db.find_achievement("First Recipe", "recipes").unwrap().unwrap();
        assert_eq!(definition.id, award.achievement.id);
        assert_eq!(definition.threshold, Some(1));
    }

    #[test]
    fn double_award_is_idempotent() {
        let db = db_with_user();

        let first = db.award_achievement("u1", &TEST_SPEC, None).unwrap();
        let second = db.award_achievement("u1", &TEST_SPEC, None).unwrap();

        assert!(!first.already_held);
        assert!(second.already_held);
        assert_eq!(first.earned_at, second.earned_at);
        assert_eq!(first.achievement.id, second.achievement.id);

        assert_eq!(db.list_user_achievements("u1").unwrap().len(), 1);
    }

    #[test]
    fn awards_are_independent_per_achievement() {
        let db = db_with_user();

        db.award_achievement("u1", &TEST_SPEC, None).unwrap();
        let other = db.award_achievement("u1", &OTHER_SPEC, Some(1)).unwrap();
        assert!(!other.already_held);

        let earned = db.list_user_achievements("u1").unwrap();
        assert_eq!(earned.len(), 2);

        // dropping one row leaves the other untouched
        db.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM user_achievements WHERE achievement_id = ?1",
                [other.achievement.id.as_str()],
            )?;
            Ok(())
        })
        .unwrap();

        let earned = db.list_user_achievements("u1").unwrap();
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].achievement.name, "First Recipe");
    }

    #[test]
    fn unknown_user_is_an_error() {
        let db = db_with_user();
        let err = db.award_achievement("ghost", &TEST_SPEC, None).unwrap_err();
        assert!(err.to_string().contains("User not found"));
    }

    #[test]
    fn concurrent_duplicate_awards_converge() {
        let db = db_with_user();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| db.award_achievement("u1", &TEST_SPEC, None).unwrap()))
                .collect();

            let newly_granted = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|award| !award.already_held)
                .count();
            assert_eq!(newly_granted, 1);
        });

        assert_eq!(db.list_user_achievements("u1").unwrap().len(), 1);
    }

    #[test]
    fn progress_is_recorded_on_grant_only() {
        let db = db_with_user();

        let first = db.award_achievement("u1", &TEST_SPEC, Some(3)).unwrap();
        assert_eq!(first.progress, Some(3));

        // a later call with different progress does not rewrite the row
        let second = db.award_achievement("u1", &TEST_SPEC, Some(9)).unwrap();
        assert!(second.already_held);
        assert_eq!(second.progress, Some(3));
    }

    #[test]
    fn definition_updates_and_listing() {
        let db = db_with_user();
        db.insert_achievement("a1", &TEST_SPEC).unwrap();
        db.insert_achievement("a2", &OTHER_SPEC).unwrap();

        assert!(db.update_achievement("a2", None, None, None, None, Some(false)).unwrap());
        assert!(!db.update_achievement("missing", None, None, None, None, None).unwrap());

        assert_eq!(db.list_achievements(false).unwrap().len(), 2);
        let active = db.list_achievements(true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "First Recipe");

        let fetched = db.get_achievement("a2").unwrap().unwrap();
        assert!(!fetched.is_active);
    }
}
