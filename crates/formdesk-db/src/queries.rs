use std::collections::HashMap;

use crate::Database;
use crate::models::{
    AnswerRow, FormRow, FormSnapshot, NewAnswer, NewForm, NewQuestion, QuestionRow,
    RespondentResponse, ResponseRow, UserRow, WriteOutcome,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use formdesk_types::models::ChoiceType;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use tracing::info;

const FORM_COLUMNS: &str = "id, name, slug, description, limit_one_response, creator_id";
const QUESTION_COLUMNS: &str = "id, form_id, name, choice_type, choices, is_required";

impl Database {
    // -- Users --

    /// Returns `None` when the email is already registered.
    pub fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (name, email, password) VALUES (?1, ?2, ?3)",
                (name, email, password_hash),
            );
            match inserted {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(e) if is_unique_violation(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// Invalidates every token issued to the user so far.
    pub fn bump_token_version(&self, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET token_version = token_version + 1 WHERE id = ?1",
                [user_id],
            )?;
            Ok(())
        })
    }

    // -- Forms --

    /// Inserts the form and its allowed domains together. Returns `None` when
    /// the slug is taken.
    pub fn create_form(&self, new: &NewForm<'_>) -> Result<Option<FormRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT INTO forms (name, slug, description, limit_one_response, creator_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    new.name,
                    new.slug,
                    new.description,
                    new.limit_one_response,
                    new.creator_id
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
            let form_id = tx.last_insert_rowid();

            {
                let mut stmt =
                    tx.prepare("INSERT INTO allowed_domains (form_id, domain) VALUES (?1, ?2)")?;
                for domain in new.allowed_domains {
                    stmt.execute(rusqlite::params![form_id, domain])?;
                }
            }

            tx.commit()?;

            Ok(Some(FormRow {
                id: form_id,
                name: new.name.to_string(),
                slug: new.slug.to_string(),
                description: new.description.to_string(),
                limit_one_response: new.limit_one_response,
                creator_id: new.creator_id,
            }))
        })
    }

    pub fn get_form_by_slug(&self, slug: &str) -> Result<Option<FormRow>> {
        self.with_conn(|conn| query_form_by_slug(conn, slug))
    }

    /// Form, ordered questions and allowed domains in one locked read.
    pub fn load_snapshot(&self, slug: &str) -> Result<Option<FormSnapshot>> {
        self.with_conn(|conn| {
            let Some(form) = query_form_by_slug(conn, slug)? else {
                return Ok(None);
            };
            let questions = query_questions(conn, form.id)?;
            let allowed_domains = query_allowed_domains(conn, form.id)?;

            Ok(Some(FormSnapshot {
                form,
                questions,
                allowed_domains,
            }))
        })
    }

    /// Forms created by `creator_id`, each with its allowed domains.
    pub fn list_forms_by_creator(&self, creator_id: i64) -> Result<Vec<(FormRow, Vec<String>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FORM_COLUMNS} FROM forms WHERE creator_id = ?1 ORDER BY id"
            ))?;
            let forms = stmt
                .query_map([creator_id], form_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // One pass over the domains instead of a query per form
            let mut stmt = conn.prepare(
                "SELECT d.form_id, d.domain
                 FROM allowed_domains d
                 JOIN forms f ON f.id = d.form_id
                 WHERE f.creator_id = ?1
                 ORDER BY d.id",
            )?;
            let mut domains: HashMap<i64, Vec<String>> = HashMap::new();
            let rows = stmt.query_map([creator_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (form_id, domain) = row?;
                domains.entry(form_id).or_default().push(domain);
            }

            Ok(forms
                .into_iter()
                .map(|form| {
                    let form_domains = domains.remove(&form.id).unwrap_or_default();
                    (form, form_domains)
                })
                .collect())
        })
    }

    /// Deletes the form; questions, domains, responses and answers cascade.
    pub fn delete_form(&self, form_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM forms WHERE id = ?1", [form_id])?;
            if removed > 0 {
                info!("Deleted form {}", form_id);
            }
            Ok(removed > 0)
        })
    }

    // -- Questions --

    pub fn insert_question(&self, form_id: i64, new: &NewQuestion<'_>) -> Result<QuestionRow> {
        let choices_json = new.choices.map(serde_json::to_string).transpose()?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO questions (form_id, name, choice_type, choices, is_required)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    form_id,
                    new.name,
                    new.choice_type.as_str(),
                    choices_json,
                    new.is_required
                ],
            )?;

            Ok(QuestionRow {
                id: conn.last_insert_rowid(),
                form_id,
                name: new.name.to_string(),
                choice_type: new.choice_type,
                choices: new.choices.map(<[String]>::to_vec),
                is_required: new.is_required,
            })
        })
    }

    /// Only removes the question if it belongs to `form_id`. Answers given to
    /// it cascade.
    pub fn delete_question(&self, form_id: i64, question_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM questions WHERE id = ?1 AND form_id = ?2",
                [question_id, form_id],
            )?;
            Ok(removed > 0)
        })
    }

    // -- Responses --

    pub fn has_response(&self, form_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM responses WHERE form_id = ?1 AND user_id = ?2",
                [form_id, user_id],
                |r| r.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Writes a response and all of its answers in one transaction. Any
    /// failure rolls back every row. With `exclusive` set, a second response
    /// by the same user for the same form is rejected by the storage layer
    /// and reported as `WriteOutcome::AlreadySubmitted`.
    pub fn insert_response(
        &self,
        form_id: i64,
        user_id: i64,
        exclusive: bool,
        answers: &[NewAnswer],
    ) -> Result<WriteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let date = Utc::now();

            let inserted = tx.execute(
                "INSERT INTO responses (form_id, user_id, exclusive, date) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![form_id, user_id, exclusive, date.to_rfc3339()],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(WriteOutcome::AlreadySubmitted),
                Err(e) => return Err(e.into()),
            }
            let response_id = tx.last_insert_rowid();

            let mut rows = Vec::with_capacity(answers.len());
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO answers (response_id, question_id, value) VALUES (?1, ?2, ?3)",
                )?;
                for answer in answers {
                    stmt.execute(rusqlite::params![
                        response_id,
                        answer.question_id,
                        answer.value
                    ])?;
                    rows.push(AnswerRow {
                        id: tx.last_insert_rowid(),
                        response_id,
                        question_id: answer.question_id,
                        value: answer.value.clone(),
                    });
                }
            }

            tx.commit()?;

            Ok(WriteOutcome::Created(ResponseRow {
                id: response_id,
                form_id,
                user_id,
                date,
                answers: rows,
            }))
        })
    }

    /// Every response of the form with its respondent and answers, ordered
    /// by submission date.
    pub fn get_responses_for_form(&self, form_id: i64) -> Result<Vec<RespondentResponse>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the respondent in the same query
            let mut stmt = conn.prepare(
                "SELECT r.id, r.form_id, r.user_id, r.date, u.name, u.email
                 FROM responses r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.form_id = ?1
                 ORDER BY r.date, r.id",
            )?;
            let mut responses = stmt
                .query_map([form_id], |row| {
                    Ok(RespondentResponse {
                        response: ResponseRow {
                            id: row.get(0)?,
                            form_id: row.get(1)?,
                            user_id: row.get(2)?,
                            date: parse_timestamp(row, 3)?,
                            answers: Vec::new(),
                        },
                        user_name: row.get(4)?,
                        user_email: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(
                "SELECT a.id, a.response_id, a.question_id, a.value
                 FROM answers a
                 JOIN responses r ON r.id = a.response_id
                 WHERE r.form_id = ?1
                 ORDER BY a.id",
            )?;
            let mut answers: HashMap<i64, Vec<AnswerRow>> = HashMap::new();
            let rows = stmt.query_map([form_id], |row| {
                Ok(AnswerRow {
                    id: row.get(0)?,
                    response_id: row.get(1)?,
                    question_id: row.get(2)?,
                    value: row.get(3)?,
                })
            })?;
            for row in rows {
                let row = row?;
                answers.entry(row.response_id).or_default().push(row);
            }

            for r in &mut responses {
                r.response.answers = answers.remove(&r.response.id).unwrap_or_default();
            }

            Ok(responses)
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, filter: &str, value: P) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, email, password, token_version, created_at FROM users WHERE {filter}"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                token_version: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_form_by_slug(conn: &Connection, slug: &str) -> Result<Option<FormRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {FORM_COLUMNS} FROM forms WHERE slug = ?1"))?;
    stmt.query_row([slug], form_from_row).optional()
}

fn query_questions(conn: &Connection, form_id: i64) -> Result<Vec<QuestionRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE form_id = ?1 ORDER BY id"
    ))?;

    let rows = stmt
        .query_map([form_id], question_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_allowed_domains(conn: &Connection, form_id: i64) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT domain FROM allowed_domains WHERE form_id = ?1 ORDER BY id")?;

    let rows = stmt
        .query_map([form_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn form_from_row(row: &Row<'_>) -> rusqlite::Result<FormRow> {
    Ok(FormRow {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        limit_one_response: row.get(4)?,
        creator_id: row.get(5)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<QuestionRow> {
    let choice_type: String = row.get(3)?;
    let choice_type = choice_type
        .parse::<ChoiceType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let choices: Option<String> = row.get(4)?;
    let choices = choices
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(QuestionRow {
        id: row.get(0)?,
        form_id: row.get(1)?,
        name: row.get(2)?,
        choice_type,
        choices,
        is_required: row.get(5)?,
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
