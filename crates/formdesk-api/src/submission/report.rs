use std::collections::{BTreeMap, HashMap};

use formdesk_db::Database;
use formdesk_db::models::{FormSnapshot, QuestionRow, RespondentResponse};
use formdesk_types::api::{ReportedAnswer, ResponseReportEntry, UserResponse};

use super::Principal;

/// Read access to stored responses.
pub trait ResponseStore {
    fn responses_for_form(&self, form_id: i64) -> anyhow::Result<Vec<RespondentResponse>>;
}

impl ResponseStore for Database {
    fn responses_for_form(&self, form_id: i64) -> anyhow::Result<Vec<RespondentResponse>> {
        self.get_responses_for_form(form_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("only the form's creator may read its responses")]
    Forbidden,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// All responses of the form, for its creator only.
pub fn report<S>(
    store: &S,
    snapshot: &FormSnapshot,
    principal: &Principal,
) -> Result<Vec<ResponseReportEntry>, ReportError>
where
    S: ResponseStore + ?Sized,
{
    if !principal.owns(&snapshot.form) {
        return Err(ReportError::Forbidden);
    }

    let rows = store.responses_for_form(snapshot.form.id)?;
    Ok(reshape(&snapshot.questions, rows))
}

/// `answers_by_question` follows question position. The name-keyed map is
/// filled in that order, so when two questions share a name the later one
/// wins; it serializes sorted by name.
pub fn reshape(questions: &[QuestionRow], rows: Vec<RespondentResponse>) -> Vec<ResponseReportEntry> {
    let position: HashMap<i64, (usize, &str)> = questions
        .iter()
        .enumerate()
        .map(|(pos, q)| (q.id, (pos, q.name.as_str())))
        .collect();

    rows.into_iter()
        .map(|row| {
            let mut reported: Vec<(usize, ReportedAnswer)> = row
                .response
                .answers
                .into_iter()
                .filter_map(|a| {
                    let &(pos, name) = position.get(&a.question_id)?;
                    Some((
                        pos,
                        ReportedAnswer {
                            question_id: a.question_id,
                            question: name.to_string(),
                            value: a.value,
                        },
                    ))
                })
                .collect();
            reported.sort_by_key(|(pos, _)| *pos);

            let answers_by_question: Vec<ReportedAnswer> =
                reported.into_iter().map(|(_, a)| a).collect();

            let mut answers = BTreeMap::new();
            for a in &answers_by_question {
                answers.insert(a.question.clone(), a.value.clone());
            }

            ResponseReportEntry {
                date: row.response.date,
                user: UserResponse {
                    id: row.response.user_id,
                    name: row.user_name,
                    email: row.user_email,
                },
                answers,
                answers_by_question,
            }
        })
        .collect()
}
