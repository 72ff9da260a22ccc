use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use formdesk_types::api::{ErrorResponse, FieldErrors};

/// Every failure a handler can report. Messages are the ones clients
/// already match on, so keep them stable.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("email or password incorrect")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("forbidden access")]
    Forbidden,

    #[error("response already submitted")]
    AlreadySubmitted,

    #[error("{message}")]
    Validation {
        message: &'static str,
        errors: FieldErrors,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid_field(errors: FieldErrors) -> Self {
        Self::Validation {
            message: "Invalid field",
            errors,
        }
    }

    /// Auth endpoints use the plural wording.
    pub fn invalid_fields(errors: FieldErrors) -> Self {
        Self::Validation {
            message: "Invalid fields",
            errors,
        }
    }

    pub fn form_not_found() -> Self {
        Self::NotFound("Form not found")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert("body".into(), vec![rejection.body_text()]);
        Self::invalid_field(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthenticated.", None),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Email or password incorrect",
                None,
            ),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Forbidden access", None),
            Self::AlreadySubmitted => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "You can not submit form twice",
                None,
            ),
            Self::Validation { message, errors } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, Some(errors))
            }
            Self::Internal(e) => {
                // Details stay in the logs
                error!("Internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error", None)
            }
        };

        (
            status,
            Json(ErrorResponse {
                message: message.to_string(),
                errors,
            }),
        )
            .into_response()
    }
}

/// Appends `message` to the list kept for `field`.
pub(crate) fn push_error(errors: &mut FieldErrors, field: impl Into<String>, message: impl Into<String>) {
    errors.entry(field.into()).or_default().push(message.into());
}
