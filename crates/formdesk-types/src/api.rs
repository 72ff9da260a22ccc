use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::ChoiceType;

/// Field name -> validation messages, ordered by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

// -- JWT Claims --

/// `ver` must match the user's current token version; logout bumps it,
/// which revokes every token issued before.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub ver: i64,
    pub exp: usize,
}

// -- Envelopes --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUser {
    pub name: String,
    pub email: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: LoginUser,
}

// -- Forms --

#[derive(Debug, Default, Deserialize)]
pub struct CreateFormRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_domains: Option<Vec<String>>,
    #[serde(default)]
    pub limit_one_response: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub limit_one_response: bool,
    pub creator_id: i64,
    pub allowed_domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuestionResponse>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormEnvelope {
    pub message: String,
    pub form: FormResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormListResponse {
    pub message: String,
    pub forms: Vec<FormResponse>,
}

// -- Questions --

#[derive(Debug, Default, Deserialize)]
pub struct CreateQuestionRequest {
    pub name: Option<String>,
    /// Kept as a raw string so an unknown type becomes a field error rather
    /// than a body rejection.
    pub choice_type: Option<String>,
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub is_required: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub id: i64,
    pub form_id: i64,
    pub name: String,
    pub choice_type: ChoiceType,
    pub choices: Option<Vec<String>>,
    pub is_required: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionEnvelope {
    pub message: String,
    pub question: QuestionResponse,
}

// -- Responses --

/// The answers payload is kept untyped; the submission validator reports
/// shape problems per field.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitResponseRequest {
    #[serde(default)]
    pub answers: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub question_id: i64,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedResponse {
    pub id: i64,
    pub date: chrono::DateTime<chrono::Utc>,
    pub answers: Vec<AnswerResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponseEnvelope {
    pub message: String,
    pub response: SubmittedResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedAnswer {
    pub question_id: i64,
    pub question: String,
    pub value: Option<String>,
}

/// One response as seen by the form owner. `answers` is keyed by question
/// name for display and sorted by name; same-named questions collide there,
/// so `answers_by_question` carries the id-keyed list in question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseReportEntry {
    pub date: chrono::DateTime<chrono::Utc>,
    pub user: UserResponse,
    pub answers: BTreeMap<String, Option<String>>,
    pub answers_by_question: Vec<ReportedAnswer>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseReportEnvelope {
    pub message: String,
    pub responses: Vec<ResponseReportEntry>,
}
