use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use formdesk_db::models::{NewQuestion, QuestionRow};
use formdesk_types::api::{
    CreateQuestionRequest, FieldErrors, MessageResponse, QuestionEnvelope, QuestionResponse,
};
use formdesk_types::models::ChoiceType;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, push_error};
use crate::forms::ensure_owner;
use crate::rules::required;
use crate::submission::Principal;

pub(crate) fn question_response(q: QuestionRow) -> QuestionResponse {
    QuestionResponse {
        id: q.id,
        form_id: q.form_id,
        name: q.name,
        choice_type: q.choice_type,
        choices: q.choices,
        is_required: q.is_required,
    }
}

/// A validated question definition. Choices are dropped for free-text types.
#[derive(Debug, PartialEq, Eq)]
struct QuestionInput {
    name: String,
    choice_type: ChoiceType,
    choices: Option<Vec<String>>,
    is_required: bool,
}

fn check_question(req: CreateQuestionRequest) -> Result<QuestionInput, FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = required(&mut errors, "name", req.name.as_deref()).map(str::to_string);

    let choice_type = required(&mut errors, "choice_type", req.choice_type.as_deref()).and_then(|raw| {
        let parsed = raw.parse::<ChoiceType>().ok();
        if parsed.is_none() {
            push_error(&mut errors, "choice_type", "The selected choice type is invalid.");
        }
        parsed
    });

    let choices = match choice_type {
        Some(t) if t.requires_choices() => {
            let choices: Vec<String> = req
                .choices
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.trim().to_string())
                .collect();
            if choices.is_empty() {
                push_error(
                    &mut errors,
                    "choices",
                    format!("The choices field is required when choice type is {t}."),
                );
            }
            for (i, choice) in choices.iter().enumerate() {
                if choice.is_empty() {
                    push_error(
                        &mut errors,
                        format!("choices.{i}"),
                        format!("The choices.{i} field is required."),
                    );
                }
            }
            Some(choices)
        }
        _ => None,
    };

    match (name, choice_type) {
        (Some(name), Some(choice_type)) if errors.is_empty() => Ok(QuestionInput {
            name,
            choice_type,
            choices,
            is_required: req.is_required.unwrap_or(false),
        }),
        _ => Err(errors),
    }
}

/// POST /forms/{slug}/questions: creator only.
pub async fn create_question(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let question = blocking(&state, move |s| {
        let form = s
            .db
            .get_form_by_slug(&slug)?
            .ok_or_else(ApiError::form_not_found)?;
        ensure_owner(&form, &principal)?;

        let Json(req) = body?;
        let input = check_question(req).map_err(ApiError::invalid_field)?;

        let question = s.db.insert_question(
            form.id,
            &NewQuestion {
                name: &input.name,
                choice_type: input.choice_type,
                choices: input.choices.as_deref(),
                is_required: input.is_required,
            },
        )?;

        info!("Added question {} to form '{}'", question.id, form.slug);
        Ok(question)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(QuestionEnvelope {
            message: "Add question success".into(),
            question: question_response(question),
        }),
    ))
}

/// DELETE /forms/{slug}/questions/{question_id}: creator only. Answers to
/// the question are removed with it.
pub async fn delete_question(
    State(state): State<AppState>,
    Path((slug, question_id)): Path<(String, i64)>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| {
        let form = s
            .db
            .get_form_by_slug(&slug)?
            .ok_or_else(ApiError::form_not_found)?;
        ensure_owner(&form, &principal)?;

        if !s.db.delete_question(form.id, question_id)? {
            return Err(ApiError::NotFound("Question not found"));
        }
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse::new("Remove question success")))
}
