use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use formdesk_types::api::{
    AnswerResponse, ResponseReportEnvelope, SubmitResponseEnvelope, SubmitResponseRequest,
    SubmittedResponse,
};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::submission::report::{self, ReportError};
use crate::submission::{self, Principal};

/// POST /forms/{slug}/responses
///
/// An unreadable body counts as a submission without answers; it is
/// rejected by validation, after the eligibility checks.
pub async fn submit_response(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<SubmitResponseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let answers = match body {
        Ok(Json(req)) => req.answers,
        Err(rejection) => {
            debug!("Unreadable submission body: {}", rejection.body_text());
            None
        }
    };

    let response = blocking(&state, move |s| {
        let snapshot = s
            .db
            .load_snapshot(&slug)?
            .ok_or_else(ApiError::form_not_found)?;

        Ok(submission::submit(&s.db, &snapshot, &principal, answers.as_ref())?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponseEnvelope {
            message: "Submit response success".into(),
            response: SubmittedResponse {
                id: response.id,
                date: response.date,
                answers: response
                    .answers
                    .into_iter()
                    .map(|a| AnswerResponse {
                        question_id: a.question_id,
                        value: a.value,
                    })
                    .collect(),
            },
        }),
    ))
}

/// GET /forms/{slug}/responses: creator only.
pub async fn get_responses(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let responses = blocking(&state, move |s| {
        let snapshot = s
            .db
            .load_snapshot(&slug)?
            .ok_or_else(ApiError::form_not_found)?;

        report::report(&s.db, &snapshot, &principal).map_err(|e| match e {
            ReportError::Forbidden => ApiError::Forbidden,
            ReportError::Storage(e) => ApiError::Internal(e),
        })
    })
    .await?;

    Ok(Json(ResponseReportEnvelope {
        message: "Get responses success".into(),
        responses,
    }))
}
