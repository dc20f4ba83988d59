pub mod achievements;
pub mod auth;
pub mod compliments;
pub mod error;
pub mod extract;
pub mod follows;
pub mod recipes;
pub mod users;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};

use tastebuddy_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// All API routes. CORS/trace layers are applied by the server binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route(
            "/users/{id}",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/users/{id}/followers", get(users::list_followers))
        .route("/users/{id}/following", get(users::list_following))
        .route(
            "/users/{id}/follow",
            post(follows::follow_user).delete(follows::unfollow_user),
        )
        .route("/users/{id}/recipes", get(recipes::list_user_recipes))
        .route(
            "/users/{id}/achievements",
            get(achievements::user_achievements),
        )
        .route("/recipes", post(recipes::create_recipe))
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe).delete(recipes::delete_recipe),
        )
        .route("/recipes/{id}/rating", put(recipes::rate_recipe))
        .route(
            "/recipes/{id}/favorite",
            put(recipes::favorite_recipe).delete(recipes::unfavorite_recipe),
        )
        .route(
            "/recipes/{id}/compliments",
            get(compliments::list_for_recipe).post(compliments::create_compliment),
        )
        .route(
            "/compliments/{id}",
            get(compliments::get_compliment)
                .put(compliments::update_compliment)
                .delete(compliments::delete_compliment),
        )
        .route(
            "/achievements",
            get(achievements::list_achievements).post(achievements::create_achievement),
        )
        .route("/achievements/{id}", put(achievements::update_achievement))
        .fallback(error::not_found_route)
        .method_not_allowed_fallback(error::method_not_allowed_route)
        .with_state(state)
}
