//! Database row types: these map directly to SQLite rows.
//! Distinct from formdesk-types API models to keep the DB layer independent.

use chrono::{DateTime, Utc};
use formdesk_types::models::ChoiceType;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub token_version: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub limit_one_response: bool,
    pub creator_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRow {
    pub id: i64,
    pub form_id: i64,
    pub name: String,
    pub choice_type: ChoiceType,
    pub choices: Option<Vec<String>>,
    pub is_required: bool,
}

/// A form with its questions (in position order) and allowed domains, read
/// under one lock so later phases of a submission see the same definitions.
#[derive(Debug, Clone)]
pub struct FormSnapshot {
    pub form: FormRow,
    pub questions: Vec<QuestionRow>,
    pub allowed_domains: Vec<String>,
}

pub struct NewForm<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: &'a str,
    pub limit_one_response: bool,
    pub creator_id: i64,
    pub allowed_domains: &'a [String],
}

pub struct NewQuestion<'a> {
    pub name: &'a str,
    pub choice_type: ChoiceType,
    pub choices: Option<&'a [String]>,
    pub is_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswer {
    pub question_id: i64,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRow {
    pub id: i64,
    pub response_id: i64,
    pub question_id: i64,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRow {
    pub id: i64,
    pub form_id: i64,
    pub user_id: i64,
    pub date: DateTime<Utc>,
    pub answers: Vec<AnswerRow>,
}

/// A stored response joined with its respondent, as the report needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespondentResponse {
    pub response: ResponseRow,
    pub user_name: String,
    pub user_email: String,
}

/// Result of the transactional response write.
#[derive(Debug)]
pub enum WriteOutcome {
    Created(ResponseRow),
    /// The one-response-per-user index rejected the row.
    AlreadySubmitted,
}
