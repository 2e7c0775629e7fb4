use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser},
    error::{AppError, AppResult},
    models::{NewProfile, Profile},
    schema::profiles::dsl,
    state::AppState,
};

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("Podaj prawidłowy adres e-mail."));
    }
    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(
            "Hasło musi mieć co najmniej 8 znaków.",
        ));
    }

    let mut conn = state.db()?;

    let exists: i64 = dsl::profiles
        .filter(dsl::email.eq(&email))
        .count()
        .get_result(&mut conn)?;
    if exists > 0 {
        return Err(AppError::validation("Konto z tym adresem już istnieje."));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let profile = NewProfile {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash,
    };

    diesel::insert_into(dsl::profiles)
        .values(&profile)
        .execute(&mut conn)?;

    let access_token = state.jwt.generate_token(profile.id, &email)?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: state.config.jwt_expiry_minutes * 60,
            user: UserResponse {
                id: profile.id,
                email,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = payload.email.trim().to_lowercase();
    let mut conn = state.db()?;

    let profile: Profile = dsl::profiles
        .filter(dsl::email.eq(&email))
        .first(&mut conn)
        .map_err(|_| AppError::unauthorized())?;

    let valid = password::verify_password(&payload.password, &profile.password_hash)
        .map_err(|_| AppError::unauthorized())?;
    if !valid {
        return Err(AppError::unauthorized());
    }

    let access_token = state.jwt.generate_token(profile.id, &profile.email)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.jwt_expiry_minutes * 60,
        user: UserResponse {
            id: profile.id,
            email: profile.email,
        },
    }))
}

pub async fn me(user: AuthenticatedUser) -> AppResult<Json<UserResponse>> {
    Ok(Json(UserResponse {
        id: user.user_id,
        email: user.email,
    }))
}
