use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::EmailVisibility;

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Profiles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub email_visibility: Option<EmailVisibility>,
}

/// Full profile as returned by `GET /users/{id}`. The `email` field is
/// present only when the visibility resolver allows the viewer to see it.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub email_visibility: EmailVisibility,
    pub created_at: String,
    pub followers: i64,
    pub following: i64,
    pub recipes: i64,
}

/// Compact user shape used in follower/following listings.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
}

// -- Recipes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub summary: Option<String>,
    pub ingredients: String,
    pub instructions: String,
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub ingredients: String,
    pub instructions: String,
    pub created_at: String,
    pub rating_average: Option<f64>,
    pub rating_count: i64,
    pub favorite_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateRecipeRequest {
    pub value: i64,
}

// -- Compliments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateComplimentRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateComplimentRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct ComplimentResponse {
    pub id: String,
    pub recipe_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

// -- Achievements --

#[derive(Debug, Serialize)]
pub struct AchievementResponse {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub threshold: Option<i64>,
    pub is_active: bool,
}

/// An achievement a user holds, with when it was earned.
#[derive(Debug, Serialize)]
pub struct EarnedAchievement {
    pub achievement: AchievementResponse,
    pub earned_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAchievementRequest {
    pub kind: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub threshold: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAchievementRequest {
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub threshold: Option<i64>,
    pub is_active: Option<bool>,
}
