//! Broadcast genre to canonical genre lookup
//!
//! The lookup table is built once from the bundled mapping tables and never
//! changes afterwards. Components that need it hold an `Arc<GenreNormalizer>`.

use super::{decode, encode, Genre};
use crate::assets::GenreMappingAssets;
use crate::contract::columns::{COLUMN_BROADCAST_GENRE, COLUMN_CANONICAL_GENRE};
use crate::errors::GenreMappingError;
use crate::values::ContentValues;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

const MAPPING_SEPARATOR: char = '|';

#[derive(Debug, Clone, Default)]
pub struct GenreNormalizer {
    /// Upper-cased broadcast token -> canonical token
    map: HashMap<String, String>,
}

impl GenreNormalizer {
    /// Build from `(table name, contents)` pairs, later tables overriding
    /// earlier ones. Blank lines and `#` comments are skipped; every other row
    /// must split into exactly two tokens.
    pub fn from_tables<'a, I>(tables: I) -> Result<Self, GenreMappingError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map = HashMap::new();
        for (table, contents) in tables {
            for (index, line) in contents.lines().enumerate() {
                let row = line.trim();
                if row.is_empty() || row.starts_with('#') {
                    continue;
                }
                let parts: Vec<&str> = row.split(MAPPING_SEPARATOR).collect();
                if parts.len() != 2 {
                    return Err(GenreMappingError::InvalidMapping {
                        table: table.to_string(),
                        line: index + 1,
                        content: row.to_string(),
                    });
                }
                map.insert(parts[0].trim().to_uppercase(), parts[1].trim().to_string());
            }
        }
        debug!("Built genre map with {} broadcast tokens", map.len());
        Ok(Self { map })
    }

    /// Build from the tables embedded in the binary.
    pub fn bundled() -> Result<Self, GenreMappingError> {
        let mut contents = Vec::new();
        for table in GenreMappingAssets::TABLES {
            let file = GenreMappingAssets::get_table(table).ok_or_else(|| {
                GenreMappingError::MissingTable {
                    table: table.to_string(),
                }
            })?;
            let text = String::from_utf8(file.data.into_owned()).map_err(|_| {
                GenreMappingError::InvalidEncoding {
                    table: table.to_string(),
                }
            })?;
            contents.push((table, text));
        }
        Self::from_tables(contents.iter().map(|(t, c)| (*t, c.as_str())))
    }

    /// Process-wide instance built from the bundled tables on first use.
    pub fn shared() -> Result<Arc<Self>, GenreMappingError> {
        static SHARED: OnceLock<Arc<GenreNormalizer>> = OnceLock::new();

        if let Some(normalizer) = SHARED.get() {
            return Ok(Arc::clone(normalizer));
        }
        let built = Arc::new(Self::bundled()?);
        Ok(Arc::clone(SHARED.get_or_init(|| built)))
    }

    /// Canonical token mapped from a broadcast token, case-insensitively.
    pub fn canonical_for(&self, broadcast: &str) -> Option<&str> {
        self.map
            .get(&broadcast.trim().to_uppercase())
            .map(String::as_str)
    }

    pub fn is_canonical(&self, genre: &str) -> bool {
        Genre::is_canonical(genre)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Canonical genres derived from an encoded broadcast genre list,
    /// deduplicated in first-seen order.
    pub fn derive_canonical(&self, broadcast_genres: &str) -> Vec<String> {
        let mut derived: Vec<String> = Vec::new();
        for token in decode(broadcast_genres) {
            if let Some(canonical) = self.canonical_for(&token) {
                if Genre::is_canonical(canonical) && !derived.iter().any(|g| g == canonical) {
                    derived.push(canonical.to_string());
                }
            }
        }
        derived
    }

    /// Enrich program values before a write.
    ///
    /// A canonical list containing any non-vocabulary token is cleared to NULL.
    /// When no canonical list remains, one is derived from the broadcast list.
    /// Never fails; unmappable input leaves the canonical column as it was.
    pub fn normalize_program_values(&self, values: &mut ContentValues) {
        let mut canonical = values
            .get_str(COLUMN_CANONICAL_GENRE)
            .filter(|g| !g.is_empty())
            .map(str::to_string);

        if let Some(genres) = &canonical {
            if decode(genres).iter().any(|g| !Genre::is_canonical(g)) {
                debug!("Clearing invalid canonical genres: {}", genres);
                values.put_null(COLUMN_CANONICAL_GENRE);
                canonical = None;
            }
        }

        if canonical.is_some() {
            return;
        }

        let Some(broadcast) = values
            .get_str(COLUMN_BROADCAST_GENRE)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
        else {
            return;
        };

        let derived = self.derive_canonical(&broadcast);
        if !derived.is_empty() {
            values.put(COLUMN_CANONICAL_GENRE, encode(&derived));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::SqlValue;

    fn normalizer() -> GenreNormalizer {
        GenreNormalizer::from_tables([
            (
                "a.txt",
                "# comment\nNews|NEWS\nComedy|COMEDY\n\nCartoon|FAMILY_KIDS\nOdd|NOT_A_GENRE",
            ),
            ("b.txt", "Football/Soccer|SPORTS\nSoccer|SPORTS"),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let genres = normalizer();
        assert_eq!(genres.canonical_for("news"), Some("NEWS"));
        assert_eq!(genres.canonical_for("FOOTBALL/SOCCER"), Some("SPORTS"));
        assert_eq!(genres.canonical_for("Weather"), None);
    }

    #[test]
    fn test_malformed_row_fails_build() {
        let err = GenreNormalizer::from_tables([("bad.txt", "News|NEWS\nA|B|C")]).unwrap_err();
        assert_eq!(
            err,
            GenreMappingError::InvalidMapping {
                table: "bad.txt".to_string(),
                line: 2,
                content: "A|B|C".to_string(),
            }
        );
        assert!(GenreNormalizer::from_tables([("bad.txt", "NoSeparator")]).is_err());
    }

    #[test]
    fn test_bundled_tables_load() {
        let genres = GenreNormalizer::bundled().unwrap();
        assert!(!genres.is_empty());
        assert_eq!(genres.canonical_for("sitcom"), Some("COMEDY"));
        assert_eq!(genres.canonical_for("Tourism/Travel"), Some("TRAVEL"));
    }

    #[test]
    fn test_shared_instance_is_reused() {
        let first = GenreNormalizer::shared().unwrap();
        let second = GenreNormalizer::shared().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_derives_from_broadcast_when_canonical_missing() {
        let mut values = ContentValues::new()
            .with(COLUMN_BROADCAST_GENRE, "Soccer,News,Football/Soccer,Unknown,Odd");
        normalizer().normalize_program_values(&mut values);
        assert_eq!(values.get_str(COLUMN_CANONICAL_GENRE), Some("SPORTS,NEWS"));
    }

    #[test]
    fn test_invalid_canonical_is_cleared_then_derived() {
        let mut values = ContentValues::new()
            .with(COLUMN_CANONICAL_GENRE, "NEWS,CARTOONS")
            .with(COLUMN_BROADCAST_GENRE, "Comedy");
        normalizer().normalize_program_values(&mut values);
        assert_eq!(values.get_str(COLUMN_CANONICAL_GENRE), Some("COMEDY"));
    }

    #[test]
    fn test_invalid_canonical_without_fallback_becomes_null() {
        let mut values = ContentValues::new().with(COLUMN_CANONICAL_GENRE, "news");
        normalizer().normalize_program_values(&mut values);
        assert_eq!(values.get(COLUMN_CANONICAL_GENRE), Some(&SqlValue::Null));
    }

    #[test]
    fn test_valid_canonical_is_kept() {
        let mut values = ContentValues::new()
            .with(COLUMN_CANONICAL_GENRE, "DRAMA")
            .with(COLUMN_BROADCAST_GENRE, "News");
        normalizer().normalize_program_values(&mut values);
        assert_eq!(values.get_str(COLUMN_CANONICAL_GENRE), Some("DRAMA"));
    }

    #[test]
    fn test_nothing_mappable_leaves_field_absent() {
        let mut values = ContentValues::new().with(COLUMN_BROADCAST_GENRE, "Weather");
        normalizer().normalize_program_values(&mut values);
        assert!(!values.contains_key(COLUMN_CANONICAL_GENRE));
    }
}
