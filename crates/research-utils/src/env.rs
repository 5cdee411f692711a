//! Environment-variable configuration helpers

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// A variable was set but could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value for {key}: {value:?}")]
pub struct EnvError {
    pub key: String,
    pub value: String,
}

/// Read `key` and parse it, falling back to `default` when unset or blank
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, EnvError> {
    match env_string(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

/// Read a (possibly fractional) number of seconds, `default` when unset or blank
pub fn env_duration_secs(key: &str, default: Duration) -> Result<Duration, EnvError> {
    match env_string(key) {
        Some(raw) => {
            let secs: f64 = parse(key, &raw)?;
            Duration::try_from_secs_f64(secs).map_err(|_| EnvError {
                key: key.to_string(),
                value: raw,
            })
        }
        None => Ok(default),
    }
}

/// Read a non-empty string
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, EnvError> {
    raw.trim().parse().map_err(|_| EnvError {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; the process environment is shared.

    #[test]
    fn test_env_or_default_when_unset() {
        assert_eq!(env_or("RESEARCH_UTILS_TEST_UNSET", 8_usize), Ok(8));
    }

    #[test]
    fn test_parse_helper() {
        assert_eq!(parse::<u32>("K", " 12 "), Ok(12));
        assert_eq!(
            parse::<u32>("K", "twelve"),
            Err(EnvError {
                key: "K".to_string(),
                value: "twelve".to_string()
            })
        );
    }

    #[test]
    fn test_duration_default_when_unset() {
        assert_eq!(
            env_duration_secs("RESEARCH_UTILS_TEST_DURATION_UNSET", Duration::from_secs(3)),
            Ok(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        // SAFETY: the variable names are unique to this test
        unsafe {
            std::env::set_var("RESEARCH_UTILS_TEST_BLANK_COUNT", "");
            std::env::set_var("RESEARCH_UTILS_TEST_BLANK_SECS", "   ");
        }
        assert_eq!(env_or("RESEARCH_UTILS_TEST_BLANK_COUNT", 8_usize), Ok(8));
        assert_eq!(
            env_duration_secs("RESEARCH_UTILS_TEST_BLANK_SECS", Duration::from_secs(20)),
            Ok(Duration::from_secs(20))
        );
        assert_eq!(env_string("RESEARCH_UTILS_TEST_BLANK_SECS"), None);
    }

    #[test]
    fn test_set_values_are_parsed() {
        // SAFETY: the variable names are unique to this test
        unsafe {
            std::env::set_var("RESEARCH_UTILS_TEST_SET_COUNT", " 4 ");
            std::env::set_var("RESEARCH_UTILS_TEST_SET_SECS", "1.5");
            std::env::set_var("RESEARCH_UTILS_TEST_BAD_SECS", "-2");
        }
        assert_eq!(env_or("RESEARCH_UTILS_TEST_SET_COUNT", 8_usize), Ok(4));
        assert_eq!(
            env_duration_secs("RESEARCH_UTILS_TEST_SET_SECS", Duration::ZERO),
            Ok(Duration::from_millis(1500))
        );
        assert!(env_duration_secs("RESEARCH_UTILS_TEST_BAD_SECS", Duration::ZERO).is_err());
    }

    #[test]
    fn test_env_string_unset() {
        assert_eq!(env_string("RESEARCH_UTILS_TEST_STRING_UNSET"), None);
    }
}
