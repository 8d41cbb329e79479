//! Who may start an assessment

use serde::{Deserialize, Serialize};

use crate::error::{InterviewError, Result};

/// Outcome of an eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    /// The email already submitted a response
    AlreadyResponded,
    /// An allowlist exists and the email is not on it
    NotInvited,
    /// An allowlist exists but is empty
    ClosedAssessment,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        self == Eligibility::Eligible
    }
}

/// Allowlist-based access rule
///
/// Rules apply in order: an email that already responded is refused; with no
/// allowlist everyone else is admitted; an empty allowlist admits nobody;
/// otherwise the email must be listed. Emails compare trimmed and
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowlist: Option<Vec<String>>,
}

impl EligibilityPolicy {
    /// Anyone who has not responded yet
    pub fn open() -> Self {
        Self { allowlist: None }
    }

    /// Nobody
    pub fn closed() -> Self {
        Self {
            allowlist: Some(Vec::new()),
        }
    }

    pub fn invite_only<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowlist: Some(emails.into_iter().map(Into::into).collect()),
        }
    }

    /// Decide for `email` given the emails that already responded
    pub fn check<'a, R>(&self, email: &str, responded: R) -> Eligibility
    where
        R: IntoIterator<Item = &'a str>,
    {
        let email = normalize(email);
        if responded.into_iter().any(|r| normalize(r) == email) {
            return Eligibility::AlreadyResponded;
        }
        match &self.allowlist {
            None => Eligibility::Eligible,
            Some(list) if list.is_empty() => Eligibility::ClosedAssessment,
            Some(list) if list.iter().any(|allowed| normalize(allowed) == email) => {
                Eligibility::Eligible
            }
            Some(_) => Eligibility::NotInvited,
        }
    }

    /// Like [`check`](Self::check) but as a `Result`
    pub fn ensure_eligible<'a, R>(&self, email: &str, responded: R) -> Result<()>
    where
        R: IntoIterator<Item = &'a str>,
    {
        match self.check(email, responded) {
            Eligibility::Eligible => Ok(()),
            reason => Err(InterviewError::NotEligible {
                email: email.trim().to_string(),
                reason,
            }),
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_open_policy() {
        let policy = EligibilityPolicy::open();
        assert_eq!(policy.check("a@example.com", NONE), Eligibility::Eligible);
        assert_eq!(
            policy.check(" A@Example.com ", ["a@example.com"]),
            Eligibility::AlreadyResponded
        );
    }

    #[test]
    fn test_closed_policy() {
        let policy = EligibilityPolicy::closed();
        assert_eq!(policy.check("a@example.com", NONE), Eligibility::ClosedAssessment);
    }

    #[test]
    fn test_allowlist() {
        let policy = EligibilityPolicy::invite_only(["Lead@Example.com"]);
        assert_eq!(policy.check("  lead@example.COM", NONE), Eligibility::Eligible);
        assert_eq!(policy.check("other@example.com", NONE), Eligibility::NotInvited);
    }

    #[test]
    fn test_responded_takes_precedence() {
        let policy = EligibilityPolicy::invite_only(["lead@example.com"]);
        let responded = vec!["lead@example.com".to_string()];
        assert_eq!(
            policy.check("lead@example.com", responded.iter().map(String::as_str)),
            Eligibility::AlreadyResponded
        );
        assert!(matches!(
            policy.ensure_eligible("lead@example.com", responded.iter().map(String::as_str)),
            Err(InterviewError::NotEligible {
                reason: Eligibility::AlreadyResponded,
                ..
            })
        ));
    }
}
