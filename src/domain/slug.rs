//! Utilities for generating deterministic, human-friendly slugs.
//!
//! The helpers bridge ASCII slugification (`slug` crate) with Cyrillic
//! transliteration and Chinese pinyin (`pinyin` crate), so inputs like
//! "Тестовая группа" become `testovaya-gruppa` and "基线对齐" becomes
//! `ji-xian-dui-qi`. Uniqueness is left to persistence: a colliding slug is
//! rejected by the store, never rewritten here.

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may only contain letters, digits, hyphens and underscores")]
    InvalidCharacters { slug: String },
    #[error("slug must be at most {max_chars} characters")]
    TooLong { max_chars: usize },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Derive a slug and cut it to at most `max_chars` characters.
///
/// The cut is a plain prefix: a trailing separator left by the cut is kept.
pub fn derive_truncated_slug(input: &str, max_chars: usize) -> Result<String, SlugError> {
    let slug = derive_slug(input)?;
    Ok(slug.chars().take(max_chars).collect())
}

/// Check a caller-supplied slug: ASCII letters, digits, `-` and `_` only.
pub fn validate_slug(slug: &str, max_chars: usize) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if !slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(SlugError::InvalidCharacters {
            slug: slug.to_string(),
        });
    }
    if slug.len() > max_chars {
        return Err(SlugError::TooLong { max_chars });
    }
    Ok(())
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch == '&' {
            output.push_str(" and ");
            continue;
        }

        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        if let Some(latin) = cyrillic_to_latin(ch) {
            output.push_str(latin);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            None => {
                // Leave anything else to slugify's own transliteration.
                output.push(ch);
            }
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}

fn cyrillic_to_latin(ch: char) -> Option<&'static str> {
    let lower = ch.to_lowercase().next().unwrap_or(ch);
    let mapped = match lower {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'і' => "i",
        'ї' => "yi",
        'є' => "ye",
        'ґ' => "g",
        _ => return None,
    };
    Some(mapped)
}
