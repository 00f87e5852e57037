//! Group invariants: bounded titles and once-only slug assignment.

use crate::domain::{
    error::DomainError,
    slug::{SlugError, derive_truncated_slug, validate_slug},
};

pub const GROUP_TITLE_MAX_CHARS: usize = 200;
pub const GROUP_SLUG_MAX_CHARS: usize = 100;

/// A validated group ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl NewGroup {
    /// Validate the fields and assign the slug.
    ///
    /// A supplied non-blank slug is kept verbatim (trimmed) once it passes
    /// [`validate_slug`]; otherwise the slug is derived from the title and cut
    /// to [`GROUP_SLUG_MAX_CHARS`].
    pub fn new(title: &str, slug: Option<&str>, description: &str) -> Result<Self, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("group title must not be empty"));
        }
        if title.chars().count() > GROUP_TITLE_MAX_CHARS {
            return Err(DomainError::validation(format!(
                "group title must be at most {GROUP_TITLE_MAX_CHARS} characters"
            )));
        }

        let description = description.trim();
        if description.is_empty() {
            return Err(DomainError::validation("group description must not be empty"));
        }

        let slug =
            assign_slug(title, slug).map_err(|err| DomainError::validation(err.to_string()))?;

        Ok(Self {
            title: title.to_string(),
            slug,
            description: description.to_string(),
        })
    }
}

/// Keep an explicit slug or derive one from the title.
pub fn assign_slug(title: &str, supplied: Option<&str>) -> Result<String, SlugError> {
    match supplied.map(str::trim).filter(|value| !value.is_empty()) {
        Some(slug) => {
            validate_slug(slug, GROUP_SLUG_MAX_CHARS)?;
            Ok(slug.to_string())
        }
        None => derive_truncated_slug(title, GROUP_SLUG_MAX_CHARS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_slug_is_left_untouched() {
        let group = NewGroup::new("Тестовая группа", Some("test-slug"), "Описание").expect("group");
        assert_eq!(group.slug, "test-slug");
    }

    #[test]
    fn explicit_slug_must_be_url_safe() {
        for slug in ["Мой слаг", "with space", "a/b", "what?x"] {
            let err = NewGroup::new("Title", Some(slug), "d").expect_err("unsafe slug rejected");
            assert!(matches!(err, DomainError::Validation { .. }), "{slug}");
        }

        let group = NewGroup::new("Title", Some("Cats_and-Dogs2"), "d").expect("group");
        assert_eq!(group.slug, "Cats_and-Dogs2");
    }

    #[test]
    fn explicit_slug_is_capped_at_one_hundred_characters() {
        let longest = "s".repeat(GROUP_SLUG_MAX_CHARS);
        assert!(NewGroup::new("Title", Some(&longest), "d").is_ok());

        let too_long = "s".repeat(GROUP_SLUG_MAX_CHARS + 1);
        let err = NewGroup::new("Title", Some(&too_long), "d").expect_err("long slug rejected");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn missing_or_blank_slug_is_derived_from_title() {
        let derived = NewGroup::new("Тестовая группа", None, "Описание").expect("group");
        let blank = NewGroup::new("Тестовая группа", Some("  "), "Описание").expect("group");

        assert_eq!(derived.slug, "testovaya-gruppa");
        assert_eq!(blank.slug, derived.slug);
    }

    #[test]
    fn derived_slug_is_capped_at_one_hundred_characters() {
        let title = "а".repeat(150);
        let group = NewGroup::new(&title, None, "Описание").expect("group");
        assert_eq!(group.slug, "a".repeat(GROUP_SLUG_MAX_CHARS));
    }

    #[test]
    fn title_length_is_bounded() {
        let title = "x".repeat(GROUP_TITLE_MAX_CHARS + 1);
        assert!(NewGroup::new(&title, None, "Описание").is_err());
        assert!(NewGroup::new(&title[..GROUP_TITLE_MAX_CHARS], None, "Описание").is_ok());
    }

    #[test]
    fn empty_title_or_description_is_rejected() {
        assert!(NewGroup::new(" ", Some("slug"), "Описание").is_err());
        assert!(NewGroup::new("Title", Some("slug"), "").is_err());
    }
}
