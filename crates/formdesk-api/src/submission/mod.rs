//! Response submission pipeline.
//!
//! A submission moves through three phases, each of which can end it:
//! eligibility (no writes), structural validation of the answers, and the
//! transactional write. The acting user is always passed in explicitly.

pub mod eligibility;
pub mod report;
pub mod validate;

use serde_json::Value;
use tracing::{info, warn};

use formdesk_db::Database;
use formdesk_db::models::{FormRow, FormSnapshot, NewAnswer, ResponseRow, WriteOutcome};
use formdesk_types::api::FieldErrors;

use crate::error::ApiError;
use eligibility::{DenyReason, Eligibility};

/// The authenticated actor of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl Principal {
    pub fn owns(&self, form: &FormRow) -> bool {
        form.creator_id == self.id
    }
}

/// Terminal states of a submission other than success.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission denied: {0}")]
    Denied(DenyReason),

    #[error("submission failed validation on {} field(s)", .0.len())]
    Invalid(FieldErrors),

    /// Storage fault; nothing was written.
    #[error("response write failed")]
    Persistence(#[source] anyhow::Error),
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Denied(DenyReason::AlreadySubmitted) => ApiError::AlreadySubmitted,
            SubmissionError::Denied(DenyReason::DomainForbidden) => ApiError::Forbidden,
            SubmissionError::Invalid(errors) => ApiError::invalid_field(errors),
            SubmissionError::Persistence(e) => ApiError::Internal(e),
        }
    }
}

/// Runs the whole pipeline for one submission against `snapshot`.
pub fn submit(
    db: &Database,
    snapshot: &FormSnapshot,
    principal: &Principal,
    answers: Option<&Value>,
) -> Result<ResponseRow, SubmissionError> {
    let form = &snapshot.form;

    match eligibility::evaluate(snapshot, principal, db).map_err(SubmissionError::Persistence)? {
        Eligibility::Allow => {}
        Eligibility::Deny(reason) => {
            warn!(
                "User {} denied on form '{}': {}",
                principal.id, form.slug, reason
            );
            return Err(SubmissionError::Denied(reason));
        }
    }

    let answers: Vec<NewAnswer> = validate::validate(&snapshot.questions, answers)
        .map_err(SubmissionError::Invalid)?
        .into_iter()
        .map(|a| NewAnswer {
            question_id: a.question_id,
            value: a.value,
        })
        .collect();

    match db
        .insert_response(form.id, principal.id, form.limit_one_response, &answers)
        .map_err(SubmissionError::Persistence)?
    {
        WriteOutcome::Created(response) => {
            info!(
                "Stored response {} on form '{}' by user {} ({} answers)",
                response.id,
                form.slug,
                principal.id,
                response.answers.len()
            );
            Ok(response)
        }
        // Lost the race against a concurrent submission by the same user
        WriteOutcome::AlreadySubmitted => {
            warn!(
                "User {} raced a duplicate submission on form '{}'",
                principal.id, form.slug
            );
            Err(SubmissionError::Denied(DenyReason::AlreadySubmitted))
        }
    }
}
