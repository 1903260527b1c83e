//! Serde helpers for human-readable durations in configuration files.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let duration_str = humantime::format_duration(*duration).to_string();
    serializer.serialize_str(&duration_str)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str(
                "a duration as seconds (number) or human-readable string (e.g., '7d', '12h')",
            )
        }

        fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(seconds))
        }

        fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(seconds)
                .map(Duration::from_secs)
                .map_err(|_| de::Error::custom(format!("Negative duration: {seconds}")))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(value)
                .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "crate::config::duration_serde")]
        max_age: Duration,
    }

    #[test]
    fn test_parses_human_readable_and_seconds() {
        let parsed: Wrapper = toml::from_str("max_age = \"1d 2h\"").unwrap();
        assert_eq!(parsed.max_age, Duration::from_secs(26 * 3600));

        let parsed: Wrapper = toml::from_str("max_age = 90").unwrap();
        assert_eq!(parsed.max_age, Duration::from_secs(90));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(toml::from_str::<Wrapper>("max_age = \"soon\"").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let text = toml::to_string(&Wrapper {
            max_age: Duration::from_secs(7 * 86_400),
        })
        .unwrap();
        assert!(text.contains("7days"));
    }
}
