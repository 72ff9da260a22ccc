use std::fmt;

use formdesk_db::Database;
use formdesk_db::models::FormSnapshot;

use super::Principal;

/// Read access to past submissions.
pub trait SubmissionHistory {
    fn has_submitted(&self, form_id: i64, user_id: i64) -> anyhow::Result<bool>;
}

impl SubmissionHistory for Database {
    fn has_submitted(&self, form_id: i64, user_id: i64) -> anyhow::Result<bool> {
        self.has_response(form_id, user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AlreadySubmitted,
    DomainForbidden,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySubmitted => f.write_str("already submitted"),
            Self::DomainForbidden => f.write_str("email domain not allowed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Allow,
    Deny(DenyReason),
}

/// Decides whether `principal` may submit a new response to the form.
/// The duplicate check runs first and only for one-response forms; the
/// domain check only runs when the form has an allow-list.
pub fn evaluate<H>(
    snapshot: &FormSnapshot,
    principal: &Principal,
    history: &H,
) -> anyhow::Result<Eligibility>
where
    H: SubmissionHistory + ?Sized,
{
    let form = &snapshot.form;

    if form.limit_one_response && history.has_submitted(form.id, principal.id)? {
        return Ok(Eligibility::Deny(DenyReason::AlreadySubmitted));
    }

    if !snapshot.allowed_domains.is_empty() {
        let domain = email_domain(&principal.email);
        if !snapshot.allowed_domains.iter().any(|d| d == domain) {
            return Ok(Eligibility::Deny(DenyReason::DomainForbidden));
        }
    }

    Ok(Eligibility::Allow)
}

/// Everything after the last `@`; the whole string when there is none.
pub fn email_domain(email: &str) -> &str {
    match email.rfind('@') {
        Some(at) => &email[at + 1..],
        None => email,
    }
}
