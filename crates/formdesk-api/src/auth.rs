use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use formdesk_db::Database;
use formdesk_types::api::{
    Claims, FieldErrors, LoginRequest, LoginResponse, LoginUser, MessageResponse, RegisterRequest,
    UserEnvelope, UserResponse,
};

use crate::blocking;
use crate::error::{ApiError, push_error};
use crate::rules::{is_email, required};
use crate::submission::Principal;

const MIN_PASSWORD_LEN: usize = 5;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

/// Required and shaped like an address.
fn email_field(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let email = required(errors, "email", value)?;
    if !is_email(email) {
        push_error(errors, "email", "The email field must be a valid email address.");
        return None;
    }
    Some(email.to_string())
}

/// Required and at least `MIN_PASSWORD_LEN` characters. Not trimmed.
fn password_field(errors: &mut FieldErrors, value: Option<String>) -> Option<String> {
    let password = value.unwrap_or_default();
    if password.is_empty() {
        push_error(errors, "password", "The password field is required.");
        return None;
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        push_error(
            errors,
            "password",
            format!("The password field must be at least {MIN_PASSWORD_LEN} characters."),
        );
        return None;
    }
    Some(password)
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;

    // Validate input
    let mut errors = FieldErrors::new();
    let name = required(&mut errors, "name", req.name.as_deref()).map(str::to_string);
    let email = email_field(&mut errors, req.email.as_deref());
    let password = password_field(&mut errors, req.password);
    let (Some(name), Some(email), Some(password)) = (name, email, password) else {
        return Err(ApiError::invalid_fields(errors));
    };

    let user = blocking(&state, move |s| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let Some(id) = s.db.create_user(&name, &email, &password_hash)? else {
            let mut errors = FieldErrors::new();
            push_error(&mut errors, "email", "The email has already been taken.");
            return Err(ApiError::invalid_fields(errors));
        };

        Ok(UserResponse { id, name, email })
    })
    .await?;

    info!("Registered user {} ({})", user.id, user.email);

    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            message: "Register success".into(),
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;

    let mut errors = FieldErrors::new();
    let email = email_field(&mut errors, req.email.as_deref());
    let password = password_field(&mut errors, req.password);
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::invalid_fields(errors));
    };

    let user = blocking(&state, move |s| {
        let user = s
            .db
            .get_user_by_email(&email)?
            .ok_or(ApiError::InvalidCredentials)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {}", e))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::InvalidCredentials)?;

        Ok(user)
    })
    .await?;

    let token = create_token(
        &state.jwt_secret,
        state.token_ttl,
        user.id,
        &user.email,
        user.token_version,
    )?;

    Ok(Json(LoginResponse {
        message: "Login success".into(),
        user: LoginUser {
            name: user.name,
            email: user.email,
            access_token: token,
        },
    }))
}

/// Revokes every token the caller holds, not just the one presented.
pub async fn logout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = principal.id;
    blocking(&state, move |s| Ok(s.db.bump_token_version(user_id)?)).await?;

    Ok(Json(MessageResponse::new("Logout success")))
}

pub async fn me(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(UserEnvelope {
        message: "Get user success".into(),
        user: UserResponse {
            id: principal.id,
            name: principal.name,
            email: principal.email,
        },
    })
}

/// Signs a token for the user at its current `token_version`.
pub fn create_token(
    secret: &str,
    ttl: chrono::Duration,
    user_id: i64,
    email: &str,
    version: i64,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        ver: version,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
