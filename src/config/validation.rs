//! Configuration errors and value helpers.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while loading or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file or receiver directory could not be read.
    #[error("cannot read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The YAML did not match the configuration schema.
    #[error("malformed configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Parse a human-readable duration such as `30s`, `1m30s` or `250ms`.
///
/// Used as the clap value parser for duration flags.
///
/// # Examples
///
/// ```
/// use telescrape::config::parse_duration;
///
/// assert_eq!(parse_duration("45s").unwrap().as_secs(), 45);
/// assert_eq!(parse_duration("2m").unwrap().as_secs(), 120);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    match s.trim() {
        "" => Err("empty duration".to_string()),
        trimmed => humantime::parse_duration(trimmed).map_err(|e| format!("'{trimmed}': {e}")),
    }
}

/// Expand environment references in a credential.
///
/// Accepts `${VAR}`, `${VAR:-default}` and the collector-style `${env:VAR}`
/// and `${env:VAR:-default}`. A `$` outside a reference is kept as-is. An
/// unset variable without a default expands to the empty string with a warning.
pub fn expand_env_vars(input: &str) -> String {
    static REFERENCE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let reference = REFERENCE.get_or_init(|| {
        regex::Regex::new(
            r"\$\{(?:env:)?(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?::-(?P<default>[^}]*))?\}",
        )
        .expect("env reference pattern is valid")
    });

    reference
        .replace_all(input, |caps: &regex::Captures| {
            let name = &caps["name"];
            match (std::env::var(name), caps.name("default")) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.as_str().to_string(),
                (Err(_), None) => {
                    tracing::warn!(variable = %name, "Environment variable not set, expanding to empty");
                    String::new()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("20s").unwrap(), Duration::from_secs(20));
        assert_eq!(parse_duration(" 1m ").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("  ").unwrap_err(), "empty duration");
        assert!(parse_duration("20").unwrap_err().starts_with("'20'"));
    }

    #[test]
    fn test_expand_plain_credentials() {
        assert_eq!(expand_env_vars("admin"), "admin");
        assert_eq!(expand_env_vars("pa$$word"), "pa$$word");
    }

    #[test]
    fn test_expand_default() {
        assert_eq!(
            expand_env_vars("${TELESCRAPE_TEST_UNSET_USER:-monitor}"),
            "monitor"
        );
        assert_eq!(expand_env_vars("${TELESCRAPE_TEST_UNSET_USER}"), "");
    }

    #[test]
    fn test_expand_collector_style() {
        assert_eq!(
            expand_env_vars("${env:TELESCRAPE_TEST_UNSET_USER:-monitor}"),
            "monitor"
        );
        assert_eq!(expand_env_vars("user-${env:TELESCRAPE_TEST_UNSET_USER}"), "user-");
        // not a reference: the prefix must be exactly `env:`
        assert_eq!(expand_env_vars("${file:/etc/secret}"), "${file:/etc/secret}");
    }

    #[test]
    fn test_expand_from_env() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("TELESCRAPE_TEST_PASSWORD", "s3cret");
        }
        assert_eq!(
            expand_env_vars("${TELESCRAPE_TEST_PASSWORD:-fallback}"),
            "s3cret"
        );
        assert_eq!(expand_env_vars("${env:TELESCRAPE_TEST_PASSWORD}"), "s3cret");
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::remove_var("TELESCRAPE_TEST_PASSWORD");
        }
    }
}
