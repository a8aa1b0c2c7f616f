use std::env;
use std::net::SocketAddr;

use super::types::{ConfigError, Environment, SessionBackend};

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(super) fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_limit(field: &'static str, value: String) -> Result<i64, ConfigError> {
    match value.parse::<i64>() {
        Ok(parsed) if (1..=100).contains(&parsed) => Ok(parsed),
        _ => Err(ConfigError::InvalidValue { field, value }),
    }
}

pub(super) fn parse_socket_addr(
    field: &'static str,
    value: String,
) -> Result<SocketAddr, ConfigError> {
    value.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidValue { field, value })
}

/// Comma-separated Telegram ids. Blank items are skipped; anything else that
/// is not an integer rejects the whole list.
pub(super) fn parse_id_list(
    field: &'static str,
    value: Option<String>,
) -> Result<Vec<i64>, ConfigError> {
    let Some(raw) = value else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>()
                .map_err(|_| ConfigError::InvalidValue { field, value: item.to_string() })
        })
        .collect()
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

pub(super) fn parse_session_backend(value: Option<String>) -> Result<SessionBackend, ConfigError> {
    match value.as_deref().map(|item| item.to_ascii_lowercase()) {
        None => Ok(SessionBackend::Memory),
        Some(ref val) if val == "memory" => Ok(SessionBackend::Memory),
        Some(ref val) if val == "redis" => Ok(SessionBackend::Redis),
        Some(val) => Err(ConfigError::InvalidValue { field: "SESSION_BACKEND", value: val }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_list_accepts_csv() {
        let parsed = parse_id_list("TEACHER_IDS", Some("1, 22 ,,333".to_string())).expect("ids");
        assert_eq!(parsed, vec![1, 22, 333]);
    }

    #[test]
    fn parse_id_list_defaults_to_empty() {
        assert!(parse_id_list("TEACHER_IDS", None).expect("ids").is_empty());
    }

    #[test]
    fn parse_id_list_rejects_garbage() {
        let err = parse_id_list("TEACHER_IDS", Some("1,abc".to_string())).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field: "TEACHER_IDS", ref value } if value == "abc"
        ));
    }

    #[test]
    fn parse_limit_bounds() {
        assert_eq!(parse_limit("RECENT_RESULTS_LIMIT", "5".to_string()).expect("limit"), 5);
        assert!(parse_limit("RECENT_RESULTS_LIMIT", "0".to_string()).is_err());
        assert!(parse_limit("RECENT_RESULTS_LIMIT", "101".to_string()).is_err());
    }

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn parse_environment_variants() {
        assert_eq!(parse_environment(Some("prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }

    #[test]
    fn parse_session_backend_variants() {
        assert_eq!(parse_session_backend(None).expect("backend"), SessionBackend::Memory);
        assert_eq!(
            parse_session_backend(Some("Redis".to_string())).expect("backend"),
            SessionBackend::Redis
        );
        assert!(parse_session_backend(Some("disk".to_string())).is_err());
    }
}
