use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use tracing::error;
use uuid::Uuid;

use tastebuddy_db::Database;
use tastebuddy_db::models::{AchievementRow, AchievementSpec, Award, EarnedRow};
use tastebuddy_types::api::{
    AchievementResponse, CreateAchievementRequest, EarnedAchievement, UpdateAchievementRequest,
};

use crate::AppState;
use crate::auth::{Claims, extract_claims};
use crate::error::{ApiError, success};
use crate::extract::Json;

// ── Built-in catalog ────────────────────────────────────────────────────
//
// Milestone definitions are created lazily by the awarder the first time
// anyone reaches them, so a fresh database needs no seeding.

pub const FIRST_RECIPE: AchievementSpec<'static> = AchievementSpec {
    kind: "recipes",
    name: "First Recipe",
    description: "Posted your first recipe",
    icon: "chef-hat",
    color: "#f59e0b",
    threshold: Some(1),
    is_active: true,
};

pub const SEASONED_CHEF: AchievementSpec<'static> = AchievementSpec {
    kind: "recipes",
    name: "Seasoned Chef",
    description: "Posted ten recipes",
    icon: "flame",
    color: "#ea580c",
    threshold: Some(10),
    is_active: true,
};

pub const FIRST_FOLLOWER: AchievementSpec<'static> = AchievementSpec {
    kind: "social",
    name: "First Follower",
    description: "Someone started following you",
    icon: "sparkles",
    color: "#8b5cf6",
    threshold: Some(1),
    is_active: true,
};

pub const RISING_STAR: AchievementSpec<'static> = AchievementSpec {
    kind: "social",
    name: "Rising Star",
    description: "Reached ten followers",
    icon: "star",
    color: "#eab308",
    threshold: Some(10),
    is_active: true,
};

pub const KIND_WORDS: AchievementSpec<'static> = AchievementSpec {
    kind: "social",
    name: "Kind Words",
    description: "Left your first compliment",
    icon: "heart",
    color: "#ef4444",
    threshold: Some(1),
    is_active: true,
};

// ── Milestone triggers ──────────────────────────────────────────────────

/// Award any recipe-count milestones the author has reached. Only newly
/// granted achievements are returned; held ones are skipped silently.
pub fn recipe_milestones(db: &Database, author_id: &str) -> anyhow::Result<Vec<EarnedAchievement>> {
    let count = db.count_recipes_by_author(author_id)?;
    award_reached(db, author_id, count, &[FIRST_RECIPE, SEASONED_CHEF])
}

/// Follower-count milestones, awarded to the user being followed.
pub fn follower_milestones(db: &Database, user_id: &str) -> anyhow::Result<Vec<EarnedAchievement>> {
    let count = db.follower_count(user_id)?;
    award_reached(db, user_id, count, &[FIRST_FOLLOWER, RISING_STAR])
}

pub fn compliment_milestones(
    db: &Database,
    author_id: &str,
) -> anyhow::Result<Vec<EarnedAchievement>> {
    award_reached(db, author_id, 1, &[KIND_WORDS])
}

fn award_reached(
    db: &Database,
    user_id: &str,
    count: i64,
    specs: &[AchievementSpec<'static>],
) -> anyhow::Result<Vec<EarnedAchievement>> {
    let mut earned = Vec::new();
    for spec in specs {
        let reached = spec.threshold.is_none_or(|threshold| count >= threshold);
        if !reached {
            continue;
        }
        let award = db.award_achievement(user_id, spec, Some(count))?;
        if !award.already_held {
            earned.push(earned_from_award(award));
        }
    }
    Ok(earned)
}

// ── Response conversions ────────────────────────────────────────────────

pub(crate) fn achievement_response(row: AchievementRow) -> AchievementResponse {
    AchievementResponse {
        id: row.id,
        kind: row.kind,
        name: row.name,
        description: row.description,
        icon: row.icon,
        color: row.color,
        threshold: row.threshold,
        is_active: row.is_active,
    }
}

pub(crate) fn earned_from_award(award: Award) -> EarnedAchievement {
    EarnedAchievement {
        achievement: achievement_response(award.achievement),
        earned_at: award.earned_at,
        progress: award.progress,
    }
}

fn earned_from_row(row: EarnedRow) -> EarnedAchievement {
    EarnedAchievement {
        achievement: achievement_response(row.achievement),
        earned_at: row.earned_at,
        progress: row.progress,
    }
}

// ── Handlers ────────────────────────────────────────────────────────────

/// GET /achievements — active definitions.
pub async fn list_achievements(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_achievements(true)?;
    let definitions: Vec<_> = rows.into_iter().map(achievement_response).collect();
    Ok(success(definitions))
}

/// GET /users/{id}/achievements — everything the user has earned.
pub async fn user_achievements(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let earned = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        if !db.db.user_exists(&user_id)? {
            return Ok(None);
        }
        Ok(Some(db.db.list_user_achievements(&user_id)?))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::internal(anyhow!("task join failed"))
    })??
    .ok_or_else(|| ApiError::not_found("No such user"))?;

    let earned: Vec<_> = earned.into_iter().map(earned_from_row).collect();
    Ok(success(earned))
}

/// POST /achievements — admin-only definition create.
pub async fn create_achievement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateAchievementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers)?;

    if req.name.trim().is_empty() || req.kind.trim().is_empty() {
        return Err(ApiError::bad_request("Name and kind must not be blank"));
    }
    if req.threshold.is_some_and(|t| t < 1) {
        return Err(ApiError::bad_request("Threshold must be at least 1"));
    }

    if state.db.find_achievement(&req.name, &req.kind)?.is_some() {
        return Err(ApiError::with_code(
            "achievement_exists",
            "An achievement with that name and kind already exists",
        ));
    }

    let id = Uuid::new_v4().to_string();
    let spec = AchievementSpec {
        kind: &req.kind,
        name: &req.name,
        description: &req.description,
        icon: &req.icon,
        color: &req.color,
        threshold: req.threshold,
        is_active: req.is_active.unwrap_or(true),
    };
    state.db.insert_achievement(&id, &spec)?;

    let row = state
        .db
        .get_achievement(&id)?
        .ok_or_else(|| ApiError::internal(anyhow!("achievement vanished after insert")))?;

    Ok((StatusCode::CREATED, success(achievement_response(row))))
}

/// PUT /achievements/{id} — admin-only definition update.
pub async fn update_achievement(
    State(state): State<AppState>,
    Path(achievement_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateAchievementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers)?;

    if req.threshold.is_some_and(|t| t < 1) {
        return Err(ApiError::bad_request("Threshold must be at least 1"));
    }

    let updated = state.db.update_achievement(
        &achievement_id,
        req.description.as_deref(),
        req.icon.as_deref(),
        req.color.as_deref(),
        req.threshold,
        req.is_active,
    )?;
    if !updated {
        return Err(ApiError::not_found("No such achievement"));
    }

    let row = state
        .db
        .get_achievement(&achievement_id)?
        .ok_or_else(|| ApiError::internal(anyhow!("achievement vanished after update")))?;

    Ok(success(achievement_response(row)))
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let claims = extract_claims(headers, &state.jwt_secret)?;
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or_else(ApiError::unauthorized)?;
    if !user.is_admin {
        return Err(ApiError::forbidden());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "hash", None).unwrap();
        db
    }

    #[test]
    fn recipe_milestones_follow_the_count() {
        let db = db_with_user();

        assert!(recipe_milestones(&db, "u1").unwrap().is_empty());

        db.insert_recipe("r1", "u1", "Toast", None, "bread", "toast it")
            .unwrap();
        let earned = recipe_milestones(&db, "u1").unwrap();
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].achievement.name, "First Recipe");
        assert_eq!(earned[0].progress, Some(1));

        // held milestones are not re-reported
        assert!(recipe_milestones(&db, "u1").unwrap().is_empty());
    }

    #[test]
    fn ten_recipes_unlock_the_second_milestone() {
        let db = db_with_user();
        for i in 0..10 {
            db.insert_recipe(&format!("r{i}"), "u1", "Dish", None, "x", "y")
                .unwrap();
        }

        let earned = recipe_milestones(&db, "u1").unwrap();
        let names: Vec<_> = earned.iter().map(|e| e.achievement.name.as_str()).collect();
        assert!(names.contains(&"First Recipe"));
        assert!(names.contains(&"Seasoned Chef"));
    }

    #[test]
    fn follower_milestones_award_the_target() {
        let db = db_with_user();
        db.create_user("u2", "bob", "hash", None).unwrap();
        db.follow("u2", "u1").unwrap();

        let earned = follower_milestones(&db, "u1").unwrap();
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].achievement.name, "First Follower");

        // the follower themselves earned nothing
        assert!(db.list_user_achievements("u2").unwrap().is_empty());
    }

    #[test]
    fn first_compliment_awards_once() {
        let db = db_with_user();

        let earned = compliment_milestones(&db, "u1").unwrap();
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].achievement.name, "Kind Words");
        assert!(compliment_milestones(&db, "u1").unwrap().is_empty());
    }
}
