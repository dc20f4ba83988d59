use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tastebuddy_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{ApiError, success};
use crate::extract::Json;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// ── Handlers ────────────────────────────────────────────────────────────

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::bad_request("Username must be 3-32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    if let Some(email) = req.email.as_deref() {
        if !email.contains('@') {
            return Err(ApiError::bad_request("Email address is not valid"));
        }
    }

    if state.db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::with_code(
            "username_taken",
            "That username is already taken",
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::internal(anyhow!("password hashing failed: {e}")))?
        .to_string();

    let user_id = Uuid::new_v4();

    state.db.create_user(
        &user_id.to_string(),
        &req.username,
        &password_hash,
        req.email.as_deref(),
    )?;

    let token = create_token(&state.jwt_secret, user_id, &req.username)?;

    Ok((
        StatusCode::CREATED,
        success(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or_else(ApiError::unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::internal(anyhow!("stored hash is unreadable: {e}")))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::unauthorized())?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::internal(anyhow!("stored user id is not a uuid: {e}")))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(success(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

// ── Token helpers ───────────────────────────────────────────────────────

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate the bearer token on a protected endpoint; missing or bad
/// tokens are a 401 envelope.
pub fn extract_claims(headers: &HeaderMap, jwt_secret: &str) -> Result<Claims, ApiError> {
    maybe_claims(headers, jwt_secret).ok_or_else(ApiError::unauthorized)
}

/// Same decode for endpoints that also serve anonymous viewers: absence or
/// an invalid token just means "not signed in".
pub fn maybe_claims(headers: &HeaderMap, jwt_secret: &str) -> Option<Claims> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_token(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_token("test-secret", user_id, "alice").unwrap();

        let claims = extract_claims(&headers_with_token(&token), "test-secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = create_token("test-secret", Uuid::new_v4(), "alice").unwrap();

        assert!(maybe_claims(&headers_with_token(&token), "other-secret").is_none());
        let err = extract_claims(&headers_with_token(&token), "other-secret").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert!(maybe_claims(&HeaderMap::new(), "test-secret").is_none());
        assert!(extract_claims(&HeaderMap::new(), "test-secret").is_err());
    }
}
