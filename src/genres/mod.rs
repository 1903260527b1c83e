//! Canonical genre vocabulary and the genre list codec
//!
//! Genre lists are stored as a single text column. Tokens are separated by
//! `,`; a `"` escapes the character that follows it so tokens may contain
//! either character.

pub mod mapping;

pub use mapping::GenreNormalizer;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

const DELIMITER: char = ',';
const ESCAPE: char = '"';

/// The fixed canonical genre vocabulary
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    FamilyKids,
    Sports,
    Shopping,
    Movies,
    Comedy,
    Travel,
    Drama,
    Education,
    AnimalWildlife,
    News,
    Gaming,
    Arts,
    Entertainment,
    LifeStyle,
    Music,
    Premier,
    TechScience,
}

impl Genre {
    /// Whether `token` is exactly one of the vocabulary names (case-sensitive).
    pub fn is_canonical(token: &str) -> bool {
        token.parse::<Genre>().is_ok()
    }

    pub fn all() -> impl Iterator<Item = Genre> {
        Genre::iter()
    }
}

/// Encode genre tokens into the stored list representation.
pub fn encode<I, S>(genres: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut encoded = String::new();
    for (index, genre) in genres.into_iter().enumerate() {
        if index > 0 {
            encoded.push(DELIMITER);
        }
        for ch in genre.as_ref().chars() {
            if ch == DELIMITER || ch == ESCAPE {
                encoded.push(ESCAPE);
            }
            encoded.push(ch);
        }
    }
    encoded
}

/// Decode a stored genre list. Tokens are trimmed and empty tokens dropped.
pub fn decode(encoded: &str) -> Vec<String> {
    let mut genres = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for ch in encoded.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
        } else if ch == ESCAPE {
            escaped = true;
        } else if ch == DELIMITER {
            push_token(&mut genres, &current);
            current.clear();
        } else {
            current.push(ch);
        }
    }
    push_token(&mut genres, &current);
    genres
}

fn push_token(genres: &mut Vec<String>, token: &str) {
    let trimmed = token.trim();
    if !trimmed.is_empty() {
        genres.push(trimmed.to_string());
    }
}
