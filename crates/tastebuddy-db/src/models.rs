/// Database row types — these map directly to SQLite rows.
/// Distinct from tastebuddy-types API models to keep the DB layer independent.
use tastebuddy_types::models::EmailVisibility;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub email_visibility: EmailVisibility,
    pub is_admin: bool,
    pub created_at: String,
}

/// Compact shape for follower/following listings.
pub struct UserSummaryRow {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
}

pub struct ProfileCounts {
    pub followers: i64,
    pub following: i64,
    pub recipes: i64,
}

pub struct RecipeRow {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub ingredients: String,
    pub instructions: String,
    pub created_at: String,
}

pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

pub struct ComplimentRow {
    pub id: String,
    pub recipe_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug)]
pub struct AchievementRow {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub threshold: Option<i64>,
    pub is_active: bool,
}

pub struct UserAchievementRow {
    pub user_id: String,
    pub achievement_id: String,
    pub earned_at: String,
    pub progress: Option<i64>,
}

/// Static descriptor for an achievement definition. The awarder creates the
/// definition from this on first award when no row matches `(name, kind)`.
#[derive(Debug, Clone, Copy)]
pub struct AchievementSpec<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub icon: &'a str,
    pub color: &'a str,
    pub threshold: Option<i64>,
    pub is_active: bool,
}

/// Outcome of `Database::award_achievement`. When `already_held` is true the
/// row is returned unchanged — `earned_at` is the original grant time.
#[derive(Debug)]
pub struct Award {
    pub already_held: bool,
    pub achievement: AchievementRow,
    pub earned_at: String,
    pub progress: Option<i64>,
}

/// A held achievement joined with its definition.
pub struct EarnedRow {
    pub achievement: AchievementRow,
    pub earned_at: String,
    pub progress: Option<i64>,
}
