pub mod auth;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod questions;
pub mod responses;
pub mod rules;
pub mod submission;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;

/// All `/v1` routes. CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/forms", post(forms::create_form).get(forms::list_forms))
        .route("/forms/{slug}", get(forms::get_form).delete(forms::delete_form))
        .route("/forms/{slug}/questions", post(questions::create_question))
        .route(
            "/forms/{slug}/questions/{question_id}",
            delete(questions::delete_question),
        )
        .route(
            "/forms/{slug}/responses",
            post(responses::submit_response).get(responses::get_responses),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/v1", public_routes.merge(protected_routes))
        .with_state(state)
}

/// Runs blocking DB (and hashing) work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(state.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
}
