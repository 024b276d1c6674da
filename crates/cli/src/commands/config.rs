use serde_json::json;

use rentline_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::CommandResult;

/// Effective configuration after defaults, file, and environment overrides,
/// with secrets redacted.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let api_key = if config.gateway.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let details = json!({
        "ledger": {
            "url": config.ledger.url,
            "max_connections": config.ledger.max_connections,
            "timeout_secs": config.ledger.timeout_secs,
        },
        "inventory": {
            "staleness_secs": config.inventory.staleness_secs,
            "refresh_timeout_secs": config.inventory.refresh_timeout_secs,
            "reserve_timeout_secs": config.inventory.reserve_timeout_secs,
        },
        "gateway": {
            "base_url": config.gateway.base_url.as_deref().unwrap_or("<stub>"),
            "api_key": api_key,
            "timeout_secs": config.gateway.timeout_secs,
        },
        "negotiation": {
            "max_attempts": config.negotiation.max_attempts,
        },
        "logging": {
            "level": config.logging.level,
            "format": log_format_name(config.logging.format),
        },
    });

    CommandResult::success_with_details(
        "config",
        "effective configuration (precedence: overrides > env > file > defaults)",
        details,
    )
}

fn log_format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}
