use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use formdesk_types::api::Claims;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::submission::Principal;

/// Extract and validate the JWT from the Authorization header, then resolve
/// it to a `Principal` that handlers receive as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated)?
    .claims;

    let user_id = claims.sub;
    let user = blocking(&state, move |s| Ok(s.db.get_user_by_id(user_id)?))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    // Tokens issued before the last logout are stale
    if user.token_version != claims.ver {
        return Err(ApiError::Unauthenticated);
    }

    req.extensions_mut().insert(Principal {
        id: user.id,
        name: user.name,
        email: user.email,
    });
    Ok(next.run(req).await)
}
