use std::env;
use std::sync::{Mutex, OnceLock};

use rentline_cli::commands::{fleet, migrate, seed, simulate};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_succeeds_against_a_fresh_database() {
    let dir = TempDir::new().expect("temp dir");
    let url = sqlite_url(&dir, "migrate.db");

    with_env(&[("RENTLINE_LEDGER_URL", &url)], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_rejects_a_non_sqlite_ledger_url() {
    with_env(&[("RENTLINE_LEDGER_URL", "postgres://elsewhere/rentline")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_then_fleet_lists_the_demo_units() {
    let dir = TempDir::new().expect("temp dir");
    let url = sqlite_url(&dir, "fleet.db");

    with_env(&[("RENTLINE_LEDGER_URL", &url)], || {
        let seeded = seed::run();
        assert_eq!(seeded.exit_code, 0, "expected seed success: {}", seeded.output);

        let listed = fleet::run();
        assert_eq!(listed.exit_code, 0, "expected fleet success: {}", listed.output);

        let payload = parse_payload(&listed.output);
        assert_eq!(payload["command"], "fleet");
        let units = payload["details"]["units"].as_array().expect("units array");
        assert_eq!(units.len(), 10);
        assert!(payload["message"].as_str().unwrap_or("").contains("8 available"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("temp dir");
    let url = sqlite_url(&dir, "reseed.db");

    with_env(&[("RENTLINE_LEDGER_URL", &url)], || {
        let first = seed::run();
        let second = seed::run();
        assert_eq!(first.exit_code, 0);
        assert_eq!(second.exit_code, 0);
        assert_eq!(parse_payload(&first.output)["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn simulate_books_a_unit_with_the_stub_gateway() {
    let dir = TempDir::new().expect("temp dir");
    let url = sqlite_url(&dir, "simulate.db");

    with_env(&[("RENTLINE_LEDGER_URL", &url)], || {
        let seeded = seed::run();
        assert_eq!(seeded.exit_code, 0, "expected seed success: {}", seeded.output);

        let result = simulate::run("excavator", None);
        assert_eq!(result.exit_code, 0, "expected simulate success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "simulate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["details"]["outcome"]["outcome"], "booked");
        assert!(payload["message"].as_str().unwrap_or("").starts_with("booked"));
    });
}

#[test]
fn simulate_without_a_seeded_fleet_reports_empty() {
    let dir = TempDir::new().expect("temp dir");
    let url = sqlite_url(&dir, "empty.db");

    with_env(&[("RENTLINE_LEDGER_URL", &url)], || {
        let migrated = migrate::run();
        assert_eq!(migrated.exit_code, 0, "expected migrate success: {}", migrated.output);

        let result = simulate::run("excavator", None);
        assert_eq!(result.exit_code, 5, "expected empty-fleet failure: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "empty_fleet");
    });
}

fn sqlite_url(dir: &TempDir, file: &str) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join(file).display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "RENTLINE_LEDGER_URL",
        "RENTLINE_LEDGER_MAX_CONNECTIONS",
        "RENTLINE_LEDGER_TIMEOUT_SECS",
        "RENTLINE_INVENTORY_STALENESS_SECS",
        "RENTLINE_INVENTORY_REFRESH_TIMEOUT_SECS",
        "RENTLINE_INVENTORY_RESERVE_TIMEOUT_SECS",
        "RENTLINE_GATEWAY_BASE_URL",
        "RENTLINE_GATEWAY_API_KEY",
        "RENTLINE_GATEWAY_TIMEOUT_SECS",
        "RENTLINE_NEGOTIATION_MAX_ATTEMPTS",
        "RENTLINE_LOGGING_LEVEL",
        "RENTLINE_LOGGING_FORMAT",
        "RENTLINE_LOG_LEVEL",
        "RENTLINE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
