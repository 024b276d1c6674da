use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inventory::InventoryCacheConfig;
use crate::negotiation::DEFAULT_MAX_ATTEMPTS;
use crate::workflow::WorkflowConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub inventory: InventoryConfig,
    pub gateway: GatewayConfig,
    pub negotiation: NegotiationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct InventoryConfig {
    pub staleness_secs: u64,
    pub refresh_timeout_secs: u64,
    pub reserve_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Base URL of the verification service bundle; `None` selects the
    /// pass-everything stub.
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NegotiationConfig {
    pub max_attempts: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub ledger_url: Option<String>,
    pub log_level: Option<String>,
    pub gateway_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig {
                url: "sqlite://rentline.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            inventory: InventoryConfig {
                staleness_secs: 30,
                refresh_timeout_secs: 3,
                reserve_timeout_secs: 5,
            },
            gateway: GatewayConfig { base_url: None, api_key: None, timeout_secs: 4 },
            negotiation: NegotiationConfig { max_attempts: DEFAULT_MAX_ATTEMPTS },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("rentline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Inventory cache settings as the durations the cache consumes.
    pub fn inventory_cache_config(&self) -> InventoryCacheConfig {
        InventoryCacheConfig {
            staleness: Duration::from_secs(self.inventory.staleness_secs),
            refresh_timeout: Duration::from_secs(self.inventory.refresh_timeout_secs),
            reserve_timeout: Duration::from_secs(self.inventory.reserve_timeout_secs),
        }
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig { verify_timeout: Duration::from_secs(self.gateway.timeout_secs) }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(ledger) = patch.ledger {
            if let Some(url) = ledger.url {
                self.ledger.url = url;
            }
            if let Some(max_connections) = ledger.max_connections {
                self.ledger.max_connections = max_connections;
            }
            if let Some(timeout_secs) = ledger.timeout_secs {
                self.ledger.timeout_secs = timeout_secs;
            }
        }

        if let Some(inventory) = patch.inventory {
            if let Some(staleness_secs) = inventory.staleness_secs {
                self.inventory.staleness_secs = staleness_secs;
            }
            if let Some(refresh_timeout_secs) = inventory.refresh_timeout_secs {
                self.inventory.refresh_timeout_secs = refresh_timeout_secs;
            }
            if let Some(reserve_timeout_secs) = inventory.reserve_timeout_secs {
                self.inventory.reserve_timeout_secs = reserve_timeout_secs;
            }
        }

        if let Some(gateway) = patch.gateway {
            if let Some(base_url) = gateway.base_url {
                self.gateway.base_url = Some(base_url);
            }
            if let Some(gateway_api_key_value) = gateway.api_key {
                self.gateway.api_key = Some(gateway_api_key_value.into());
            }
            if let Some(timeout_secs) = gateway.timeout_secs {
                self.gateway.timeout_secs = timeout_secs;
            }
        }

        if let Some(negotiation) = patch.negotiation {
            if let Some(max_attempts) = negotiation.max_attempts {
                self.negotiation.max_attempts = max_attempts;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RENTLINE_LEDGER_URL") {
            self.ledger.url = value;
        }
        if let Some(value) = read_env("RENTLINE_LEDGER_MAX_CONNECTIONS") {
            self.ledger.max_connections = parse_u32("RENTLINE_LEDGER_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("RENTLINE_LEDGER_TIMEOUT_SECS") {
            self.ledger.timeout_secs = parse_u64("RENTLINE_LEDGER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RENTLINE_INVENTORY_STALENESS_SECS") {
            self.inventory.staleness_secs = parse_u64("RENTLINE_INVENTORY_STALENESS_SECS", &value)?;
        }
        if let Some(value) = read_env("RENTLINE_INVENTORY_REFRESH_TIMEOUT_SECS") {
            self.inventory.refresh_timeout_secs =
                parse_u64("RENTLINE_INVENTORY_REFRESH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("RENTLINE_INVENTORY_RESERVE_TIMEOUT_SECS") {
            self.inventory.reserve_timeout_secs =
                parse_u64("RENTLINE_INVENTORY_RESERVE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RENTLINE_GATEWAY_BASE_URL") {
            self.gateway.base_url = Some(value);
        }
        if let Some(value) = read_env("RENTLINE_GATEWAY_API_KEY") {
            self.gateway.api_key = Some(value.into());
        }
        if let Some(value) = read_env("RENTLINE_GATEWAY_TIMEOUT_SECS") {
            self.gateway.timeout_secs = parse_u64("RENTLINE_GATEWAY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RENTLINE_NEGOTIATION_MAX_ATTEMPTS") {
            self.negotiation.max_attempts = parse_u32("RENTLINE_NEGOTIATION_MAX_ATTEMPTS", &value)?;
        }

        let log_level =
            read_env("RENTLINE_LOGGING_LEVEL").or_else(|| read_env("RENTLINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RENTLINE_LOGGING_FORMAT").or_else(|| read_env("RENTLINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(ledger_url) = overrides.ledger_url {
            self.ledger.url = ledger_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(gateway_base_url) = overrides.gateway_base_url {
            self.gateway.base_url = Some(gateway_base_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ledger(&self.ledger)?;
        validate_inventory(&self.inventory)?;
        validate_gateway(&self.gateway)?;
        validate_negotiation(&self.negotiation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("rentline.toml"), PathBuf::from("config/rentline.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_ledger(ledger: &LedgerConfig) -> Result<(), ConfigError> {
    let url = ledger.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "ledger.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if ledger.max_connections == 0 {
        return Err(ConfigError::Validation(
            "ledger.max_connections must be greater than zero".to_string(),
        ));
    }

    if ledger.timeout_secs == 0 || ledger.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "ledger.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_inventory(inventory: &InventoryConfig) -> Result<(), ConfigError> {
    if inventory.staleness_secs > 3600 {
        return Err(ConfigError::Validation(
            "inventory.staleness_secs must not exceed 3600".to_string(),
        ));
    }
    if inventory.refresh_timeout_secs == 0 || inventory.refresh_timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "inventory.refresh_timeout_secs must be in range 1..=60".to_string(),
        ));
    }
    if inventory.reserve_timeout_secs == 0 || inventory.reserve_timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "inventory.reserve_timeout_secs must be in range 1..=60".to_string(),
        ));
    }
    Ok(())
}

fn validate_gateway(gateway: &GatewayConfig) -> Result<(), ConfigError> {
    if let Some(base_url) = &gateway.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "gateway.base_url must start with http:// or https://".to_string(),
            ));
        }
        let missing_key = gateway
            .api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing_key {
            return Err(ConfigError::Validation(
                "gateway.api_key is required when gateway.base_url is set".to_string(),
            ));
        }
    }

    if gateway.timeout_secs == 0 || gateway.timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "gateway.timeout_secs must be in range 1..=60".to_string(),
        ));
    }

    Ok(())
}

fn validate_negotiation(negotiation: &NegotiationConfig) -> Result<(), ConfigError> {
    if negotiation.max_attempts > 10 {
        return Err(ConfigError::Validation(
            "negotiation.max_attempts must not exceed 10".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    ledger: Option<LedgerPatch>,
    inventory: Option<InventoryPatch>,
    gateway: Option<GatewayPatch>,
    negotiation: Option<NegotiationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LedgerPatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct InventoryPatch {
    staleness_secs: Option<u64>,
    refresh_timeout_secs: Option<u64>,
    reserve_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NegotiationPatch {
    max_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_and_map_to_component_configs() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        let cache = config.inventory_cache_config();
        ensure(cache.staleness == Duration::from_secs(30), "default staleness is 30s")?;
        ensure(
            config.workflow_config().verify_timeout == Duration::from_secs(4),
            "default verify timeout is 4s",
        )?;
        ensure(config.gateway.base_url.is_none(), "gateway defaults to the stub")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_GATEWAY_API_KEY", "vk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rentline.toml");
            fs::write(
                &path,
                r#"
[gateway]
base_url = "https://verify.example.com"
api_key = "${TEST_GATEWAY_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config
                .gateway
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().to_string())
                .unwrap_or_default();
            ensure(api_key == "vk-from-env", "api key should be loaded from environment")
        })();

        clear_vars(&["TEST_GATEWAY_API_KEY"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RENTLINE_LEDGER_URL", "sqlite://from-env.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rentline.toml");
            fs::write(
                &path,
                r#"
[ledger]
url = "sqlite://from-file.db"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    ledger_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.ledger.url == "sqlite://from-override.db",
                "override ledger url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["RENTLINE_LEDGER_URL"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RENTLINE_LOG_LEVEL", "warn");
        env::set_var("RENTLINE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warn log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["RENTLINE_LOG_LEVEL", "RENTLINE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn remote_gateway_without_key_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RENTLINE_GATEWAY_BASE_URL", "https://verify.example.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("gateway.api_key")
            );
            ensure(has_message, "validation failure should mention gateway.api_key")
        })();

        clear_vars(&["RENTLINE_GATEWAY_BASE_URL"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("RENTLINE_GATEWAY_BASE_URL", "https://verify.example.com");
        env::set_var("RENTLINE_GATEWAY_API_KEY", "vk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("vk-secret-value"), "debug output should not contain api key")
        })();

        clear_vars(&["RENTLINE_GATEWAY_BASE_URL", "RENTLINE_GATEWAY_API_KEY"]);
        result
    }
}
