//! Username and password rules for self-registration.

pub const USERNAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// Letters, digits and `@ . + - _` only, 1..=150 characters.
pub fn is_valid_username(username: &str) -> bool {
    let count = username.chars().count();
    count > 0
        && count <= USERNAME_MAX_CHARS
        && username
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_allow_word_characters_and_punctuation_subset() {
        assert!(is_valid_username("auth"));
        assert!(is_valid_username("HasNoName"));
        assert!(is_valid_username("лев.толстой+1@mail_ru-x"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("with space"));
        assert!(!is_valid_username("slash/name"));
        assert!(!is_valid_username(&"a".repeat(USERNAME_MAX_CHARS + 1)));
    }
}
