use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use formdesk_db::models::{FormRow, NewForm, QuestionRow};
use formdesk_types::api::{
    CreateFormRequest, FieldErrors, FormEnvelope, FormListResponse, FormResponse, MessageResponse,
};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, push_error};
use crate::questions::question_response;
use crate::rules::{is_alpha_dash, required};
use crate::submission::Principal;

const SLUG_TAKEN: &str = "The slug has already been taken.";

pub(crate) fn form_response(
    form: FormRow,
    allowed_domains: Vec<String>,
    questions: Option<Vec<QuestionRow>>,
) -> FormResponse {
    FormResponse {
        id: form.id,
        name: form.name,
        slug: form.slug,
        description: form.description,
        limit_one_response: form.limit_one_response,
        creator_id: form.creator_id,
        allowed_domains,
        questions: questions.map(|qs| qs.into_iter().map(question_response).collect()),
    }
}

/// Creator-only guard shared by every mutating form route.
pub(crate) fn ensure_owner(form: &FormRow, principal: &Principal) -> Result<(), ApiError> {
    if principal.owns(form) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// POST /forms
pub async fn create_form(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<CreateFormRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;

    let mut errors = FieldErrors::new();
    let name = required(&mut errors, "name", req.name.as_deref()).map(str::to_string);
    let slug = required(&mut errors, "slug", req.slug.as_deref()).map(str::to_string);
    if let Some(slug) = &slug {
        if !is_alpha_dash(slug) {
            push_error(
                &mut errors,
                "slug",
                "The slug field must only contain letters, numbers, dashes, and underscores.",
            );
        }
    }
    let description =
        required(&mut errors, "description", req.description.as_deref()).map(str::to_string);

    let allowed_domains: Vec<String> = req
        .allowed_domains
        .unwrap_or_default()
        .into_iter()
        .map(|d| d.trim().to_string())
        .collect();
    for (i, domain) in allowed_domains.iter().enumerate() {
        if domain.is_empty() {
            push_error(
                &mut errors,
                format!("allowed_domains.{i}"),
                format!("The allowed_domains.{i} field is required."),
            );
        }
    }

    let (Some(name), Some(slug), Some(description)) = (name, slug, description) else {
        return Err(ApiError::invalid_field(errors));
    };
    if !errors.is_empty() {
        return Err(ApiError::invalid_field(errors));
    }

    let limit_one_response = req.limit_one_response.unwrap_or(false);
    let creator_id = principal.id;

    let form = blocking(&state, move |s| {
        let created = s.db.create_form(&NewForm {
            name: &name,
            slug: &slug,
            description: &description,
            limit_one_response,
            creator_id,
            allowed_domains: &allowed_domains,
        })?;

        let Some(form) = created else {
            let mut errors = FieldErrors::new();
            push_error(&mut errors, "slug", SLUG_TAKEN);
            return Err(ApiError::invalid_field(errors));
        };

        info!("User {} created form '{}'", creator_id, form.slug);
        Ok(form_response(form, allowed_domains, None))
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(FormEnvelope {
            message: "Create form success".into(),
            form,
        }),
    ))
}

/// GET /forms: the caller's own forms.
pub async fn list_forms(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let creator_id = principal.id;
    let forms = blocking(&state, move |s| Ok(s.db.list_forms_by_creator(creator_id)?)).await?;

    Ok(Json(FormListResponse {
        message: "Get all forms success".into(),
        forms: forms
            .into_iter()
            .map(|(form, domains)| form_response(form, domains, None))
            .collect(),
    }))
}

/// GET /forms/{slug}: open to any authenticated user so respondents can
/// read the questions.
pub async fn get_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = blocking(&state, move |s| {
        s.db.load_snapshot(&slug)?
            .ok_or_else(ApiError::form_not_found)
    })
    .await?;

    Ok(Json(FormEnvelope {
        message: "Get form success".into(),
        form: form_response(
            snapshot.form,
            snapshot.allowed_domains,
            Some(snapshot.questions),
        ),
    }))
}

/// DELETE /forms/{slug}: cascades to questions, domains and responses.
pub async fn delete_form(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| {
        let form = s
            .db
            .get_form_by_slug(&slug)?
            .ok_or_else(ApiError::form_not_found)?;
        ensure_owner(&form, &principal)?;

        s.db.delete_form(form.id)?;
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse::new("Remove form success")))
}
