use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SESSION_COOKIE_NAME: &str = "sessionId";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    /// Cadence of the per-connection snapshot refresh.
    pub refresh_interval: Duration,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub ttl: time::Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Timetrack".to_string(),
            db_path: "timetrack.db".into(),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            session: SessionConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE_NAME.to_string(),
            cookie_secure: false,
            ttl: time::Duration::days(14),
        }
    }
}
