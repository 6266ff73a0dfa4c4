use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::assessment::WorkflowRules;
use crate::evidence::{RetryPolicy, UploadLimits};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the platform core.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub evidence: EvidenceConfig,
    pub workflow: WorkflowRules,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env("APP_PORT", 3000u16)?;
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let evidence = EvidenceConfig {
            max_file_mib: parse_env("APP_EVIDENCE_MAX_FILE_MIB", 10u64)?,
            max_files_per_item: parse_env("APP_EVIDENCE_MAX_FILES_PER_ITEM", 5usize)?,
            retry_base_ms: parse_env("APP_EVIDENCE_RETRY_BASE_MS", 500u64)?,
            retry_max_ms: parse_env("APP_EVIDENCE_RETRY_MAX_MS", 8_000u64)?,
            retry_attempts: parse_env("APP_EVIDENCE_RETRY_ATTEMPTS", 5u32)?,
            retry_jitter_ms: parse_env("APP_EVIDENCE_RETRY_JITTER_MS", 250u64)?,
        };

        let workflow = WorkflowRules {
            regional_approval_completes: env::var("APP_WORKFLOW_SINGLE_TIER")
                .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            evidence,
            workflow,
        })
    }
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, found: raw }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Evidence-sync tunables: upload ceilings and the retry envelope.
#[derive(Debug, Clone)]
pub struct EvidenceConfig {
    pub max_file_mib: u64,
    pub max_files_per_item: usize,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub retry_attempts: u32,
    pub retry_jitter_ms: u64,
}

impl EvidenceConfig {
    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_file_bytes: self.max_file_mib * 1024 * 1024,
            max_files_per_item: self.max_files_per_item,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.retry_base_ms),
            max_delay: Duration::from_millis(self.retry_max_ms),
            max_attempts: self.retry_attempts,
            max_jitter: Duration::from_millis(self.retry_jitter_ms),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, found: String },
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, found } => {
                write!(f, "{key} has unparsable value '{found}'")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_EVIDENCE_MAX_FILE_MIB",
            "APP_EVIDENCE_MAX_FILES_PER_ITEM",
            "APP_EVIDENCE_RETRY_BASE_MS",
            "APP_EVIDENCE_RETRY_MAX_MS",
            "APP_EVIDENCE_RETRY_ATTEMPTS",
            "APP_EVIDENCE_RETRY_JITTER_MS",
            "APP_WORKFLOW_SINGLE_TIER",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(!config.workflow.regional_approval_completes);

        let limits = config.evidence.upload_limits();
        assert_eq!(limits.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(limits.max_files_per_item, 5);
    }

    #[test]
    fn evidence_envelope_reads_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_EVIDENCE_RETRY_ATTEMPTS", "3");
        env::set_var("APP_EVIDENCE_RETRY_BASE_MS", "100");
        env::set_var("APP_WORKFLOW_SINGLE_TIER", "true");

        let config = AppConfig::load().expect("config loads");
        let policy = config.evidence.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert!(config.workflow.regional_approval_completes);
    }

    #[test]
    fn unparsable_values_are_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PORT", "not-a-port");
        let result = AppConfig::load();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "APP_PORT", .. })
        ));
        env::remove_var("APP_PORT");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        env::remove_var("APP_HOST");
    }
}
