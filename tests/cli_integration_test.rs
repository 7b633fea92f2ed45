//! CLI integration tests.
//!
//! Tests cover:
//! - Config loading and policy resolution with real INI files on disk
//! - Settings store selection (json and sqlite backends)
//! - Command dispatch and exit codes for each subcommand

mod common;

use clap::Parser;
use common::*;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tradeguard::adapters::file_config_adapter::FileConfigAdapter;
use tradeguard::cli::{self, Cli};
use tradeguard::domain::error::TradeguardError;
use tradeguard::ports::settings_port::SettingsPort;

fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_prices(closes: &[f64]) -> tempfile::NamedTempFile {
    let mut body = String::from("timestamp,close\n");
    for (i, c) in closes.iter().enumerate() {
        body.push_str(&format!("{},{}\n", i, c));
    }
    write_temp(&body, ".csv")
}

fn settings_ini(dir: &Path, backend: &str) -> String {
    let file = if backend == "sqlite" { "risk.db" } else { "risk.json" };
    format!(
        "[settings]\nbackend = {}\npath = {}\n",
        backend,
        dir.join(file).display()
    )
}

fn run_args(args: &[&str]) -> ExitCode {
    let mut argv = vec!["tradeguard"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

// ExitCode has no PartialEq on every supported toolchain; compare Debug output.
fn assert_exit(actual: ExitCode, expected: u8) {
    assert_eq!(
        format!("{:?}", actual),
        format!("{:?}", ExitCode::from(expected))
    );
}

mod config_loading {
    use super::*;

    #[test]
    fn resolve_policy_reads_risk_section() {
        let config = FileConfigAdapter::from_string(
            "[risk]\ntake_profit = 8\nstop_loss = 2\ntrailing_stop = on\ntrailing_stop_distance = 1\n",
        )
        .unwrap();
        let policy = cli::resolve_policy(Some(&config), None).unwrap();
        assert_eq!(policy.take_profit_pct, 8.0);
        assert!(policy.trailing_stop_enabled);
    }

    #[test]
    fn resolve_policy_reads_user_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfigAdapter::from_string(&settings_ini(dir.path(), "json")).unwrap();
        cli::open_settings_store(&config)
            .unwrap()
            .put("alice", &policy(12.0, 4.0, None))
            .unwrap();

        let policy_read = cli::resolve_policy(Some(&config), Some("alice")).unwrap();
        assert_eq!(policy_read, policy(12.0, 4.0, None));

        assert!(matches!(
            cli::resolve_policy(Some(&config), Some("bob")),
            Err(TradeguardError::PolicyNotFound { .. })
        ));
    }

    #[test]
    fn load_config_missing_file_fails() {
        assert!(cli::load_config(&"/nonexistent/tradeguard.ini".into()).is_err());
    }

    #[test]
    fn load_series_rejects_bad_prices() {
        let file = write_prices(&[10.0, -1.0, 12.0]);
        let err = cli::load_series(&file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, TradeguardError::InvalidSeries { index: 1, .. }));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_backend_is_selected() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            FileConfigAdapter::from_string(&settings_ini(dir.path(), "sqlite")).unwrap();
        let store = cli::open_settings_store(&config).unwrap();
        store.put("alice", &RiskPolicy::default()).unwrap();
        assert!(dir.path().join("risk.db").exists());
        assert_eq!(store.get("alice").unwrap(), Some(RiskPolicy::default()));
    }
}

mod commands {
    use super::*;

    #[test]
    fn signal_succeeds_on_valid_prices() {
        let prices = write_prices(&falling(20));
        assert_exit(run_args(&["signal", "--prices", prices.path().to_str().unwrap()]), 0);
        assert_exit(
            run_args(&["signal", "--json", "--prices", prices.path().to_str().unwrap()]),
            0,
        );
    }

    #[test]
    fn signal_with_short_history_still_succeeds() {
        let prices = write_prices(&[1.0, 2.0]);
        assert_exit(run_args(&["signal", "--prices", prices.path().to_str().unwrap()]), 0);
    }

    #[test]
    fn signal_missing_price_file() {
        assert_exit(run_args(&["signal", "--prices", "/nonexistent/prices.csv"]), 5);
    }

    #[test]
    fn signal_invalid_config_is_config_error() {
        let prices = write_prices(&rising(20));
        let config = write_temp("[signal]\noversold = 90\noverbought = 10\n", ".ini");
        assert_exit(
            run_args(&[
                "signal",
                "--prices",
                prices.path().to_str().unwrap(),
                "--config",
                config.path().to_str().unwrap(),
            ]),
            2,
        );
    }

    #[test]
    fn evaluate_replays_ticks() {
        let prices = write_prices(&[100.0, 105.0, 110.0, 108.0, 104.0, 90.0]);
        let config = write_temp(
            "[risk]\ntake_profit = 0\nstop_loss = 0\ntrailing_stop = true\ntrailing_stop_distance = 5\n",
            ".ini",
        );
        assert_exit(
            run_args(&[
                "evaluate",
                "--prices",
                prices.path().to_str().unwrap(),
                "--side",
                "buy",
                "--config",
                config.path().to_str().unwrap(),
            ]),
            0,
        );
    }

    #[test]
    fn evaluate_rejects_bad_entry() {
        let prices = write_prices(&[100.0, 101.0]);
        assert_exit(
            run_args(&[
                "evaluate",
                "--prices",
                prices.path().to_str().unwrap(),
                "--side",
                "sell",
                "--entry",
                "0",
            ]),
            5,
        );
    }

    #[test]
    fn evaluate_user_without_config() {
        let prices = write_prices(&[100.0, 101.0]);
        assert_exit(
            run_args(&[
                "evaluate",
                "--prices",
                prices.path().to_str().unwrap(),
                "--side",
                "buy",
                "--user",
                "alice",
            ]),
            2,
        );
    }

    #[test]
    fn policy_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_temp(&settings_ini(dir.path(), "json"), ".ini");
        let config_path = config.path().to_str().unwrap();

        assert_exit(
            run_args(&["policy", "get", "--user", "alice", "--config", config_path]),
            3,
        );

        assert_exit(
            run_args(&[
                "policy",
                "set",
                "--user",
                "alice",
                "--config",
                config_path,
                "--take-profit",
                "8",
                "--trailing-stop",
                "true",
                "--trailing-stop-distance",
                "1.5",
            ]),
            0,
        );
        assert_exit(
            run_args(&["policy", "get", "--user", "alice", "--config", config_path]),
            0,
        );

        let store_config =
            FileConfigAdapter::from_string(&settings_ini(dir.path(), "json")).unwrap();
        let stored = cli::open_settings_store(&store_config)
            .unwrap()
            .get("alice")
            .unwrap()
            .unwrap();
        assert_eq!(stored.take_profit_pct, 8.0);
        assert_eq!(stored.stop_loss_pct, RiskPolicy::default().stop_loss_pct);
        assert!(stored.trailing_stop_enabled);
    }

    #[test]
    fn policy_set_rejects_incoherent_update() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_temp(&settings_ini(dir.path(), "json"), ".ini");
        let config_path = config.path().to_str().unwrap();

        assert_exit(
            run_args(&[
                "policy",
                "set",
                "--user",
                "alice",
                "--config",
                config_path,
                "--trailing-stop",
                "true",
            ]),
            4,
        );
        assert!(!dir.path().join("risk.json").exists());
    }

    #[test]
    fn policy_set_repairs_invalid_stored_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("risk.json"),
            r#"{"alice": {"takeProfit": 5, "stopLoss": 2, "maxRiskPerTrade": 1,
                          "trailingStop": true, "trailingStopDistance": 0}}"#,
        )
        .unwrap();
        let config = write_temp(&settings_ini(dir.path(), "json"), ".ini");
        let config_path = config.path().to_str().unwrap();

        assert_exit(
            run_args(&["policy", "get", "--user", "alice", "--config", config_path]),
            4,
        );
        // Flags that leave the record incoherent are still rejected.
        assert_exit(
            run_args(&[
                "policy",
                "set",
                "--user",
                "alice",
                "--config",
                config_path,
                "--take-profit",
                "6",
            ]),
            4,
        );

        assert_exit(
            run_args(&[
                "policy",
                "set",
                "--user",
                "alice",
                "--config",
                config_path,
                "--trailing-stop-distance",
                "1.5",
            ]),
            0,
        );
        assert_exit(
            run_args(&["policy", "get", "--user", "alice", "--config", config_path]),
            0,
        );

        let store_config =
            FileConfigAdapter::from_string(&settings_ini(dir.path(), "json")).unwrap();
        let stored = cli::open_settings_store(&store_config)
            .unwrap()
            .get("alice")
            .unwrap()
            .unwrap();
        assert_eq!(stored.take_profit_pct, 5.0);
        assert!(stored.trailing_stop_enabled);
        assert_eq!(stored.trailing_stop_distance_pct, 1.5);
    }

    #[test]
    fn policy_validate() {
        let good = write_temp(
            "[signal]\nwindow = 14\n[risk]\ntake_profit = 5\n[settings]\nbackend = json\npath = r.json\n",
            ".ini",
        );
        assert_exit(
            run_args(&["policy", "validate", "--config", good.path().to_str().unwrap()]),
            0,
        );

        let bad = write_temp("[risk]\nmax_risk_per_trade = 0\n", ".ini");
        assert_exit(
            run_args(&["policy", "validate", "--config", bad.path().to_str().unwrap()]),
            2,
        );
    }

    #[test]
    fn size_prints_plan() {
        let prices = write_prices(&falling(20));
        let balances = write_temp(
            r#"{"alice": [{"asset": "USDT", "free": 1000.0, "locked": 0.0}]}"#,
            ".json",
        );
        assert_exit(
            run_args(&[
                "size",
                "--prices",
                prices.path().to_str().unwrap(),
                "--balance-file",
                balances.path().to_str().unwrap(),
                "--user",
                "alice",
            ]),
            2,
        );

        assert_exit(
            run_args(&[
                "size",
                "--prices",
                prices.path().to_str().unwrap(),
                "--balance-file",
                balances.path().to_str().unwrap(),
            ]),
            0,
        );
    }
}
