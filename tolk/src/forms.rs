//! Form validation for the account screens
//!
//! Validation collects every problem before returning so the user sees all
//! missing fields at once. Nothing here talks to a provider.

use crate::locale::Catalog;
use crate::user::ProfileChanges;
use serde::{Deserialize, Serialize};

/// A form input that can be reported as missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Email,
    Password,
    ConfirmPassword,
    CurrentPassword,
    NewPassword,
}

impl FormField {
    fn missing_key(self) -> &'static str {
        match self {
            FormField::Email => "tolk-error-email-missing",
            FormField::Password => "tolk-error-password-missing",
            FormField::ConfirmPassword => "tolk-error-confirm-password-missing",
            FormField::CurrentPassword => "tolk-error-current-password-missing",
            FormField::NewPassword => "tolk-error-new-password-missing",
        }
    }
}

/// One validation problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "field")]
pub enum FormProblem {
    Missing(FormField),
    PasswordMismatch,
    NothingToUpdate,
}

impl FormProblem {
    pub fn message_key(self) -> &'static str {
        match self {
            FormProblem::Missing(field) => field.missing_key(),
            FormProblem::PasswordMismatch => "tolk-error-password-mismatch",
            FormProblem::NothingToUpdate => "tolk-error-nothing-to-update",
        }
    }
}

/// All problems found in a submitted form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid form: {problems:?}")]
pub struct FormErrors {
    pub problems: Vec<FormProblem>,
}

impl FormErrors {
    pub fn missing_fields(&self) -> Vec<FormField> {
        self.problems
            .iter()
            .filter_map(|p| match p {
                FormProblem::Missing(field) => Some(*field),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self, catalog: &Catalog, locale: &str) -> Vec<String> {
        self.problems
            .iter()
            .map(|p| catalog.localize(locale, p.message_key(), &[]))
            .collect()
    }
}

#[derive(Default)]
struct Problems(Vec<FormProblem>);

impl Problems {
    fn require(&mut self, field: FormField, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.0.push(FormProblem::Missing(field));
        }
        self
    }

    fn push(&mut self, problem: FormProblem) -> &mut Self {
        self.0.push(problem);
        self
    }

    fn finish(self) -> Result<(), FormErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(FormErrors { problems: self.0 })
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut problems = Problems::default();
        problems
            .require(FormField::Email, &self.email)
            .require(FormField::Password, &self.password);
        problems.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut problems = Problems::default();
        problems
            .require(FormField::Email, &self.email)
            .require(FormField::Password, &self.password)
            .require(FormField::ConfirmPassword, &self.confirm_password);
        if !self.password.is_empty()
            && !self.confirm_password.is_empty()
            && self.password != self.confirm_password
        {
            problems.push(FormProblem::PasswordMismatch);
        }
        problems.finish()
    }

    /// Display name with surrounding whitespace removed, if any remains
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl PasswordChangeForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut problems = Problems::default();
        problems
            .require(FormField::CurrentPassword, &self.current_password)
            .require(FormField::NewPassword, &self.new_password)
            .require(FormField::ConfirmPassword, &self.confirm_password);
        if !self.new_password.is_empty()
            && !self.confirm_password.is_empty()
            && self.new_password != self.confirm_password
        {
            problems.push(FormProblem::PasswordMismatch);
        }
        problems.finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Required when the email changes
    #[serde(default)]
    pub password: Option<String>,
}

impl ProfileForm {
    /// Validate and turn into the changes to apply
    ///
    /// Blank fields count as unchanged.
    pub fn changes(&self) -> Result<ProfileChanges, FormErrors> {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let changes = ProfileChanges {
            email: non_blank(&self.email),
            display_name: non_blank(&self.display_name),
        };

        let mut problems = Problems::default();
        if changes.is_empty() {
            problems.push(FormProblem::NothingToUpdate);
        }
        if changes.email.is_some() {
            problems.require(FormField::Password, self.password.as_deref().unwrap_or(""));
        }
        problems.finish().map(|()| changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_lists_all_missing_fields() {
        let err = LoginForm::default().validate().unwrap_err();
        assert_eq!(
            err.missing_fields(),
            vec![FormField::Email, FormField::Password]
        );

        let err = LoginForm {
            email: "a@b.c".into(),
            password: "  ".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.missing_fields(), vec![FormField::Password]);
    }

    #[test]
    fn test_login_valid() {
        let form = LoginForm {
            email: "a@b.c".into(),
            password: "secret".into(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_login_messages_are_localized() {
        let catalog = Catalog::builtin();
        let err = LoginForm::default().validate().unwrap_err();
        assert_eq!(
            err.messages(&catalog, "en"),
            vec!["Please enter your email.", "Please enter your password."]
        );
        assert_eq!(err.messages(&catalog, "he")[0], "נא להזין אימייל.");
    }

    #[test]
    fn test_signup_password_mismatch() {
        let form = SignupForm {
            email: "a@b.c".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
            display_name: None,
        };
        assert_eq!(
            form.validate().unwrap_err().problems,
            vec![FormProblem::PasswordMismatch]
        );
    }

    #[test]
    fn test_signup_display_name_is_trimmed() {
        let form = SignupForm {
            display_name: Some("  Dana ".into()),
            ..Default::default()
        };
        assert_eq!(form.display_name(), Some("Dana"));
        let blank = SignupForm {
            display_name: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(blank.display_name(), None);
    }

    #[test]
    fn test_password_change_requires_all_fields() {
        let err = PasswordChangeForm::default().validate().unwrap_err();
        assert_eq!(err.problems.len(), 3);
    }

    #[test]
    fn test_profile_email_change_requires_password() {
        let form = ProfileForm {
            email: Some("new@b.c".into()),
            ..Default::default()
        };
        assert_eq!(
            form.changes().unwrap_err().missing_fields(),
            vec![FormField::Password]
        );

        let form = ProfileForm {
            email: Some("new@b.c".into()),
            password: Some("secret".into()),
            ..Default::default()
        };
        assert_eq!(form.changes().unwrap().email.as_deref(), Some("new@b.c"));
    }

    #[test]
    fn test_profile_nothing_to_update() {
        let form = ProfileForm {
            display_name: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(
            form.changes().unwrap_err().problems,
            vec![FormProblem::NothingToUpdate]
        );
    }
}
