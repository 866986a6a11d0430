//! Configuration management for Libris server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which key/value backend holds the persisted state
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub redis_url: String,
    pub key_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Base URL of the upstream SMS provider REST API
    pub api_base: String,
    /// Relay endpoint tried first by the dispatcher
    pub relay_url: String,
    pub default_country_code: String,
    /// Substituted when a recipient fails E.164 validation
    pub demo_number: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub queue_capacity: usize,
    /// Seconds to replenish one request of the relay endpoint's per-IP quota
    pub relay_replenish_secs: u64,
    pub relay_burst: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoansConfig {
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    Synthetic,
    None,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    Simulated,
    Fixture,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScannerConfig {
    pub camera: CameraKind,
    pub decoder: DecoderKind,
    /// Per-frame detection chance of the simulated decoder
    pub detection_probability: f64,
    pub frame_interval_ms: u64,
    pub scan_timeout_secs: u64,
    pub sample_codes: Vec<String>,
    pub fixture_codes: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub loans: LoansConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Environment variables with prefix LIBRIS_
            .add_source(
                Environment::with_prefix("LIBRIS")
                    .separator("_")
                    .try_parsing(true),
            )
            .set_override_option("storage.redis_url", env::var("REDIS_URL").ok())?
            .set_override_option("sms.account_sid", env::var("TWILIO_ACCOUNT_SID").ok())?
            .set_override_option("sms.auth_token", env::var("TWILIO_AUTH_TOKEN").ok())?
            .set_override_option("sms.from_number", env::var("TWILIO_FROM_NUMBER").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "libris".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: "your_account_sid".to_string(),
            auth_token: "your_auth_token".to_string(),
            from_number: "your_twilio_from_number".to_string(),
            api_base: "https://api.twilio.com".to_string(),
            relay_url: "http://127.0.0.1:8080/api/v1/sms/send".to_string(),
            default_country_code: "+91".to_string(),
            demo_number: "+15551234567".to_string(),
            timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 500,
            queue_capacity: 256,
            relay_replenish_secs: 2,
            relay_burst: 10,
        }
    }
}

impl Default for LoansConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60 * 60,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            camera: CameraKind::Synthetic,
            decoder: DecoderKind::Simulated,
            detection_probability: 0.008,
            frame_interval_ms: 33,
            scan_timeout_secs: 30,
            sample_codes: vec![
                "9780743273565".to_string(),
                "9780061120084".to_string(),
                "9780452284234".to_string(),
                "9780141439518".to_string(),
                "9780316769480".to_string(),
                "9780452284241".to_string(),
                "9780060850524".to_string(),
                "9780571056862".to_string(),
            ],
            fixture_codes: vec!["9780452284234".to_string()],
        }
    }
}
