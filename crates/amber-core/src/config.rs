use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<i64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("AMBER_ENV", "development"));

    let bind_addr = parse_addr("AMBER_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("AMBER_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("AMBER_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("AMBER_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("AMBER_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    // Daily at 06:00 UTC by default.
    let overdue_scan_cron = or_default("AMBER_OVERDUE_SCAN_CRON", "0 0 6 * * *");
    let rate_limit_max_requests = parse_u32("AMBER_RATE_LIMIT_MAX_REQUESTS", "120")?;
    let rate_limit_window_secs = parse_u64("AMBER_RATE_LIMIT_WINDOW_SECS", "60")?;
    let dashboard_trailing_months = parse_u32("AMBER_DASHBOARD_TRAILING_MONTHS", "6")?;
    let active_ambassador_window_days = parse_i64("AMBER_ACTIVE_AMBASSADOR_WINDOW_DAYS", "60")?;
    let top_ambassadors_limit = parse_i64("AMBER_TOP_AMBASSADORS_LIMIT", "5")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        overdue_scan_cron,
        rate_limit_max_requests,
        rate_limit_window_secs,
        dashboard_trailing_months,
        active_ambassador_window_days,
        top_ambassadors_limit,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn builds_config_with_defaults_when_only_database_url_set() {
        let map = HashMap::from([("DATABASE_URL", "postgres://localhost/amber")]);

        let config = build_app_config(lookup_from_map(&map)).expect("config should build");

        assert_eq!(config.database_url, "postgres://localhost/amber");
        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.overdue_scan_cron, "0 0 6 * * *");
        assert_eq!(config.rate_limit_max_requests, 120);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert_eq!(config.dashboard_trailing_months, 6);
        assert_eq!(config.active_ambassador_window_days, 60);
        assert_eq!(config.top_ambassadors_limit, 5);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let map = HashMap::new();

        let err = build_app_config(lookup_from_map(&map)).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingEnvVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn invalid_bind_addr_is_reported_with_var_name() {
        let map = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/amber"),
            ("AMBER_BIND_ADDR", "not-an-addr"),
        ]);

        let err = build_app_config(lookup_from_map(&map)).expect_err("should fail");
        assert!(matches!(err, ConfigError::InvalidEnvVar { var, .. } if var == "AMBER_BIND_ADDR"));
    }

    #[test]
    fn environment_parsing_defaults_to_development() {
        assert_eq!(parse_environment("production"), Environment::Production);
        assert_eq!(parse_environment("test"), Environment::Test);
        assert_eq!(parse_environment("staging"), Environment::Development);
    }

    #[test]
    fn overrides_are_honored() {
        let map = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/amber"),
            ("AMBER_ENV", "production"),
            ("AMBER_DASHBOARD_TRAILING_MONTHS", "12"),
            ("AMBER_ACTIVE_AMBASSADOR_WINDOW_DAYS", "30"),
            ("AMBER_RATE_LIMIT_MAX_REQUESTS", "30"),
        ]);

        let config = build_app_config(lookup_from_map(&map)).expect("config should build");
        assert_eq!(config.env, Environment::Production);
        assert_eq!(config.dashboard_trailing_months, 12);
        assert_eq!(config.active_ambassador_window_days, 30);
        assert_eq!(config.rate_limit_max_requests, 30);
    }
}
