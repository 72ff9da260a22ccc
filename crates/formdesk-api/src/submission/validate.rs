use std::collections::{HashMap, HashSet};

use serde_json::Value;

use formdesk_db::models::QuestionRow;
use formdesk_types::api::FieldErrors;

use crate::error::push_error;

/// An answer that passed every structural check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAnswer {
    pub question_id: i64,
    pub value: Option<String>,
}

/// Checks a raw `answers` payload against the form's questions.
///
/// Answers are matched to questions by `question_id` only; their order in
/// the payload carries no meaning. Every problem is collected, keyed by the
/// offending field (`answers.N.question_id`, `answers.N.value`, ...), so a
/// client can fix everything in one round trip. A required question that
/// is not referenced at all is reported under `questions.<id>`.
pub fn validate(
    questions: &[QuestionRow],
    answers: Option<&Value>,
) -> Result<Vec<ValidAnswer>, FieldErrors> {
    let mut errors = FieldErrors::new();

    let entries = match answers {
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        Some(Value::Array(_)) | Some(Value::Null) | None => {
            push_error(&mut errors, "answers", "The answers field is required.");
            return Err(errors);
        }
        Some(_) => {
            push_error(&mut errors, "answers", "The answers field must be an array.");
            return Err(errors);
        }
    };

    let by_id: HashMap<i64, &QuestionRow> = questions.iter().map(|q| (q.id, q)).collect();
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            push_error(
                &mut errors,
                format!("answers.{i}"),
                format!("The answers.{i} field must be an object."),
            );
            continue;
        };

        let id_field = format!("answers.{i}.question_id");
        let question = match entry.get("question_id") {
            None | Some(Value::Null) => {
                push_error(&mut errors, &id_field, format!("The {id_field} field is required."));
                None
            }
            Some(raw) => match raw.as_i64() {
                None => {
                    push_error(&mut errors, &id_field, format!("The {id_field} field must be an integer."));
                    None
                }
                Some(id) => match by_id.get(&id) {
                    None => {
                        push_error(&mut errors, &id_field, format!("The selected {id_field} is invalid."));
                        None
                    }
                    Some(_) if !seen.insert(id) => {
                        push_error(
                            &mut errors,
                            &id_field,
                            format!("The {id_field} field has a duplicate value."),
                        );
                        None
                    }
                    Some(q) => Some(*q),
                },
            },
        };

        let value_field = format!("answers.{i}.value");
        let value = match entry.get("value") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                push_error(&mut errors, &value_field, format!("The {value_field} field must be a string."));
                continue;
            }
        };

        let Some(question) = question else {
            continue;
        };

        let blank = value.as_deref().is_none_or(|v| v.trim().is_empty());
        if question.is_required && blank {
            push_error(&mut errors, &value_field, format!("The {value_field} field is required."));
            continue;
        }

        valid.push(ValidAnswer {
            question_id: question.id,
            value,
        });
    }

    for question in questions {
        if question.is_required && !seen.contains(&question.id) {
            push_error(
                &mut errors,
                format!("questions.{}", question.id),
                format!("The {} question is required.", question.name),
            );
        }
    }

    if errors.is_empty() {
        Ok(valid)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use formdesk_types::models::ChoiceType;

    use super::*;

    fn question(id: i64, name: &str, is_required: bool) -> QuestionRow {
        QuestionRow {
            id,
            form_id: 1,
            name: name.into(),
            choice_type: ChoiceType::ShortAnswer,
            choices: None,
            is_required,
        }
    }

    fn form_questions() -> Vec<QuestionRow> {
        vec![question(10, "Name", true), question(11, "Notes", false)]
    }

    #[test]
    fn accepts_complete_payload_in_any_order() {
        let payload = json!([
            { "question_id": 11, "value": null },
            { "question_id": 10, "value": "Ada" }
        ]);

        let valid = validate(&form_questions(), Some(&payload)).unwrap();
        assert_eq!(
            valid,
            vec![
                ValidAnswer { question_id: 11, value: None },
                ValidAnswer { question_id: 10, value: Some("Ada".into()) },
            ]
        );
    }

    #[test]
    fn missing_or_empty_answers_is_a_top_level_error() {
        for payload in [None, Some(json!(null)), Some(json!([]))] {
            let errors = validate(&form_questions(), payload.as_ref()).unwrap_err();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors["answers"], vec!["The answers field is required."]);
        }

        let errors = validate(&form_questions(), Some(&json!({ "question_id": 10 }))).unwrap_err();
        assert_eq!(errors["answers"], vec!["The answers field must be an array."]);
    }

    #[test]
    fn required_question_needs_non_blank_value() {
        for value in [json!(null), json!(""), json!("   ")] {
            let payload = json!([{ "question_id": 10, "value": value }]);
            let errors = validate(&form_questions(), Some(&payload)).unwrap_err();
            assert_eq!(errors["answers.0.value"], vec!["The answers.0.value field is required."]);
            // Referenced, so not also reported as omitted
            assert!(!errors.contains_key("questions.10"));
        }
    }

    #[test]
    fn omitted_required_question_is_rejected() {
        let payload = json!([{ "question_id": 11, "value": "a" }]);
        let errors = validate(&form_questions(), Some(&payload)).unwrap_err();
        assert_eq!(errors["questions.10"], vec!["The Name question is required."]);
    }

    #[test]
    fn optional_question_may_be_omitted_or_null() {
        let payload = json!([{ "question_id": 10, "value": "x" }]);
        assert_eq!(validate(&form_questions(), Some(&payload)).unwrap().len(), 1);

        let payload = json!([{ "question_id": 10, "value": "x" }, { "question_id": 11 }]);
        let valid = validate(&form_questions(), Some(&payload)).unwrap();
        assert_eq!(valid[1], ValidAnswer { question_id: 11, value: None });
    }

    #[test]
    fn requiredness_follows_id_not_position() {
        // The required question is listed second in the form
        let questions = vec![question(20, "Optional", false), question(21, "Required", true)];
        let payload = json!([
            { "question_id": 21, "value": "yes" },
            { "question_id": 20, "value": null }
        ]);
        assert!(validate(&questions, Some(&payload)).is_ok());

        let payload = json!([
            { "question_id": 20, "value": "filled" },
            { "question_id": 21, "value": null }
        ]);
        let errors = validate(&questions, Some(&payload)).unwrap_err();
        assert!(errors.contains_key("answers.1.value"));
        assert!(!errors.contains_key("answers.0.value"));
    }

    #[test]
    fn collects_every_violation() {
        let payload = json!([
            { "value": "no id" },
            { "question_id": "ten", "value": "x" },
            { "question_id": 99, "value": "x" },
            { "question_id": 11, "value": 5 },
            { "question_id": 11, "value": "again" },
            "not an object"
        ]);

        let errors = validate(&form_questions(), Some(&payload)).unwrap_err();
        assert_eq!(errors["answers.0.question_id"], vec!["The answers.0.question_id field is required."]);
        assert_eq!(errors["answers.1.question_id"], vec!["The answers.1.question_id field must be an integer."]);
        assert_eq!(errors["answers.2.question_id"], vec!["The selected answers.2.question_id is invalid."]);
        assert_eq!(errors["answers.3.value"], vec!["The answers.3.value field must be a string."]);
        assert_eq!(errors["answers.4.question_id"], vec!["The answers.4.question_id field has a duplicate value."]);
        assert_eq!(errors["answers.5"], vec!["The answers.5 field must be an object."]);
        assert_eq!(errors["questions.10"], vec!["The Name question is required."]);
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn question_from_another_form_is_invalid() {
        // Only this form's questions are passed in, so id 500 is unknown here
        let payload = json!([{ "question_id": 10, "value": "x" }, { "question_id": 500, "value": "y" }]);
        let errors = validate(&form_questions(), Some(&payload)).unwrap_err();
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["answers.1.question_id"]);
    }
}
