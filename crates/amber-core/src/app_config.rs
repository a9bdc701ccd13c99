use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Cron expression for the background overdue-installment scan.
    pub overdue_scan_cron: String,
    /// Requests allowed per client within one rate-limit window.
    pub rate_limit_max_requests: u32,
    /// Length of the rate-limit window, in seconds.
    pub rate_limit_window_secs: u64,
    /// Number of trailing calendar months in the dashboard series.
    pub dashboard_trailing_months: u32,
    /// Window, in days, within which an ambassador counts as active.
    pub active_ambassador_window_days: i64,
    /// How many ambassadors the dashboard leaderboard returns.
    pub top_ambassadors_limit: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("overdue_scan_cron", &self.overdue_scan_cron)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("dashboard_trailing_months", &self.dashboard_trailing_months)
            .field(
                "active_ambassador_window_days",
                &self.active_ambassador_window_days,
            )
            .field("top_ambassadors_limit", &self.top_ambassadors_limit)
            .finish()
    }
}
