//! Form binding and validation for posts and accounts.
//!
//! Inputs deserialize straight from `application/x-www-form-urlencoded`
//! bodies. Validation never fails the request: it returns the cleaned value
//! or a [`FieldErrors`] set that the page re-renders inline.

use std::collections::BTreeMap;

use email_address::EmailAddress;
use serde::Deserialize;

use crate::application::repos::{GroupsRepo, RepoError};
use crate::domain::{
    entities::PostRecord,
    posts::has_text,
    users::{PASSWORD_MIN_CHARS, USERNAME_MAX_CHARS, is_valid_username},
};

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const USERNAME_TAKEN_MESSAGE: &str = "A user with that username already exists.";
pub const INVALID_LOGIN_MESSAGE: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Field-keyed error messages plus errors that belong to the form as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
    non_field: Vec<String>,
}

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        self.fields.iter().map(|(name, messages)| (*name, messages.as_slice()))
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Raw post submission. A missing or blank `group` means "no group".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostFormInput {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: Option<String>,
}

impl PostFormInput {
    /// Pre-fill from a stored post, as the edit page does.
    pub fn from_post(post: &PostRecord) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group.as_ref().map(|group| group.id.to_string()),
        }
    }

    pub fn selected_group(&self) -> Option<&str> {
        self.group
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Validate the submission; the group must resolve to a stored group.
    pub async fn validate(&self, groups: &dyn GroupsRepo) -> Result<PostDraft, PostFormRejection> {
        let mut errors = FieldErrors::default();

        if !has_text(&self.text) {
            errors.add("text", REQUIRED_MESSAGE);
        }

        let group_id = match self.selected_group() {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => match groups.find_by_id(id).await? {
                    Some(group) => Some(group.id),
                    None => {
                        errors.add("group", INVALID_CHOICE_MESSAGE);
                        None
                    }
                },
                Err(_) => {
                    errors.add("group", INVALID_CHOICE_MESSAGE);
                    None
                }
            },
        };

        errors
            .into_result(PostDraft {
                text: self.text.trim().to_string(),
                group_id,
            })
            .map_err(PostFormRejection::Invalid)
    }
}

/// A post body and group reference that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<i64>,
}

/// Errors from post validation: either the user's input or the store.
#[derive(Debug)]
pub enum PostFormRejection {
    Invalid(FieldErrors),
    Repo(RepoError),
}

impl From<RepoError> for PostFormRejection {
    fn from(err: RepoError) -> Self {
        Self::Repo(err)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupFormInput {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupDraft {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupFormInput {
    /// Shape checks only; username availability is checked by the account service.
    pub fn validate(&self) -> Result<SignupDraft, FieldErrors> {
        let mut errors = FieldErrors::default();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", REQUIRED_MESSAGE);
        } else if !is_valid_username(username) {
            errors.add(
                "username",
                format!(
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters, at most {USERNAME_MAX_CHARS} of them."
                ),
            );
        }

        let email = self.email.trim();
        if !email.is_empty() && !EmailAddress::is_valid(email) {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED_MESSAGE);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED_MESSAGE);
        }
        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", "The two password fields didn’t match.");
            } else if self.password1.chars().count() < PASSWORD_MIN_CHARS {
                errors.add(
                    "password2",
                    format!(
                        "This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."
                    ),
                );
            }
        }

        errors.into_result(SignupDraft {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: self.password1.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginFormInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginFormInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED_MESSAGE);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED_MESSAGE);
        }
        errors.into_result(())
    }
}
