//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_balance_adapter::JsonBalanceAdapter;
use crate::adapters::json_settings_adapter::JsonSettingsAdapter;
use crate::domain::config_validation::{
    build_risk_policy, build_signal_config, validate_risk_config, validate_settings_config,
    validate_signal_config,
};
use crate::domain::error::TradeguardError;
use crate::domain::indicator::IndicatorType;
use crate::domain::policy_book::PolicyBook;
use crate::domain::position::{Decision, Position, Side};
use crate::domain::position_book::PositionBook;
use crate::domain::price::PriceSeries;
use crate::domain::risk_policy::RiskPolicy;
use crate::domain::signal::{SignalConfig, SignalKind, generate_signal};
use crate::domain::sizing::plan_entry;
use crate::logging::{DEFAULT_LEVEL, init_logging};
use crate::ports::balance_port::BalancePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::settings_port::SettingsPort;

pub type SettingsStore = Box<dyn SettingsPort + Send + Sync>;

#[derive(Parser, Debug)]
#[command(name = "tradeguard", about = "RSI signals and position risk management")]
pub struct Cli {
    /// Log level for tradeguard targets when RUST_LOG is unset
    #[arg(long, global = true, default_value = DEFAULT_LEVEL)]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify the latest price as buy, sell or neutral
    Signal {
        #[arg(short, long)]
        prices: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Replay prices against an open position
    Evaluate {
        #[arg(short, long)]
        prices: PathBuf,
        #[arg(long, value_enum)]
        side: SideArg,
        /// Entry price; defaults to the first price in the file
        #[arg(long)]
        entry: Option<f64>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Use this user's stored policy instead of the [risk] section
        #[arg(long)]
        user: Option<String>,
    },
    /// Manage stored risk policies
    Policy {
        #[command(subcommand)]
        action: PolicyCommand,
    },
    /// Size an entry for the latest signal under the per-trade risk cap
    Size {
        #[arg(short, long)]
        prices: PathBuf,
        #[arg(long)]
        balance_file: PathBuf,
        #[arg(long, default_value = "USDT")]
        asset: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Print a user's stored policy
    Get {
        #[arg(long)]
        user: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Replace a user's policy; omitted fields keep their current value
    Set {
        #[arg(long)]
        user: String,
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        take_profit: Option<f64>,
        #[arg(long)]
        stop_loss: Option<f64>,
        #[arg(long)]
        max_risk: Option<f64>,
        #[arg(long)]
        trailing_stop: Option<bool>,
        #[arg(long)]
        trailing_stop_distance: Option<f64>,
    },
    /// Check the [signal], [risk] and [settings] sections of a config file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => Side::Buy,
            SideArg::Sell => Side::Sell,
        }
    }
}

/// Field overrides for `policy set`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyOverrides {
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
    pub max_risk: Option<f64>,
    pub trailing_stop: Option<bool>,
    pub trailing_stop_distance: Option<f64>,
}

impl PolicyOverrides {
    pub fn apply(&self, base: &RiskPolicy) -> RiskPolicy {
        RiskPolicy {
            take_profit_pct: self.take_profit.unwrap_or(base.take_profit_pct),
            stop_loss_pct: self.stop_loss.unwrap_or(base.stop_loss_pct),
            max_risk_per_trade_pct: self.max_risk.unwrap_or(base.max_risk_per_trade_pct),
            trailing_stop_enabled: self.trailing_stop.unwrap_or(base.trailing_stop_enabled),
            trailing_stop_distance_pct: self
                .trailing_stop_distance
                .unwrap_or(base.trailing_stop_distance_pct),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level);
    match cli.command {
        Command::Signal {
            prices,
            config,
            json,
        } => run_signal(&prices, config.as_ref(), json),
        Command::Evaluate {
            prices,
            side,
            entry,
            config,
            user,
        } => run_evaluate(&prices, side.into(), entry, config.as_ref(), user.as_deref()),
        Command::Policy { action } => match action {
            PolicyCommand::Get { user, config } => run_policy_get(&user, &config),
            PolicyCommand::Set {
                user,
                config,
                take_profit,
                stop_loss,
                max_risk,
                trailing_stop,
                trailing_stop_distance,
            } => {
                let overrides = PolicyOverrides {
                    take_profit,
                    stop_loss,
                    max_risk,
                    trailing_stop,
                    trailing_stop_distance,
                };
                run_policy_set(&user, &config, &overrides)
            }
            PolicyCommand::Validate { config } => run_policy_validate(&config),
        },
        Command::Size {
            prices,
            balance_file,
            asset,
            config,
            user,
        } => run_size(
            &prices,
            &balance_file,
            &asset,
            config.as_ref(),
            user.as_deref(),
        ),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

fn load_optional_config(path: Option<&PathBuf>) -> Result<Option<FileConfigAdapter>, ExitCode> {
    path.map(load_config).transpose()
}

fn fail(err: &TradeguardError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_series(path: &PathBuf) -> Result<PriceSeries, TradeguardError> {
    PriceSeries::new(CsvAdapter::read_file(path)?)
}

/// Opens the store named by `[settings] backend`; json when unset.
pub fn open_settings_store(config: &dyn ConfigPort) -> Result<SettingsStore, TradeguardError> {
    validate_settings_config(config)?;
    let backend = config
        .get_string("settings", "backend")
        .unwrap_or_else(|| "json".to_string())
        .trim()
        .to_lowercase();

    match backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_settings_adapter::SqliteSettingsAdapter;
            Ok(Box::new(SqliteSettingsAdapter::from_config(config)?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(TradeguardError::ConfigInvalid {
            section: "settings".into(),
            key: "backend".into(),
            reason: "sqlite feature is required for this backend".into(),
        }),
        _ => Ok(Box::new(JsonSettingsAdapter::from_config(config)?)),
    }
}

/// Policy for a command: the user's stored policy when `user` is given,
/// otherwise the `[risk]` section, otherwise the defaults.
pub fn resolve_policy(
    config: Option<&FileConfigAdapter>,
    user: Option<&str>,
) -> Result<RiskPolicy, TradeguardError> {
    match (config, user) {
        (Some(config), Some(user)) => {
            let book = PolicyBook::new(open_settings_store(config)?);
            Ok(book.get(user)?.as_ref().clone())
        }
        (None, Some(_)) => Err(TradeguardError::ConfigMissing {
            section: "settings".into(),
            key: "path".into(),
        }),
        (Some(config), None) => build_risk_policy(config),
        (None, None) => Ok(RiskPolicy::default()),
    }
}

fn resolve_signal_config(
    config: Option<&FileConfigAdapter>,
) -> Result<SignalConfig, TradeguardError> {
    match config {
        Some(config) => build_signal_config(config),
        None => Ok(SignalConfig::default()),
    }
}

fn run_signal(prices_path: &PathBuf, config_path: Option<&PathBuf>, as_json: bool) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let signal_config = match resolve_signal_config(config.as_ref()) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let series = match load_series(prices_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let signal = generate_signal(&series, &signal_config);
    let indicator = IndicatorType::Rsi {
        window: signal_config.window,
        method: signal_config.method,
    };

    if as_json {
        println!(
            "{}",
            json!({
                "signal": signal.kind,
                "label": signal.kind.label_fr(),
                "rsi": signal.rsi,
                "indicator": indicator.to_string(),
            })
        );
    } else {
        match signal.rsi {
            Some(rsi) => println!("{} ({} = {:.2})", signal.kind, indicator, rsi),
            None => {
                println!("{} ({} undefined)", signal.kind, indicator);
                eprintln!(
                    "warning: {} prices loaded, {} needs at least {}",
                    series.len(),
                    indicator,
                    signal_config.window + 1
                );
            }
        }
    }
    ExitCode::SUCCESS
}

fn run_evaluate(
    prices_path: &PathBuf,
    side: Side,
    entry: Option<f64>,
    config_path: Option<&PathBuf>,
    user: Option<&str>,
) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let policy = match resolve_policy(config.as_ref(), user) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let series = match load_series(prices_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let points = series.points();
    let (entry_price, ticks) = match (entry, points.split_first()) {
        (Some(price), _) => (price, points),
        (None, Some((first, rest))) => (first.close, rest),
        (None, None) => {
            eprintln!("error: no prices to evaluate");
            return ExitCode::from(5);
        }
    };
    let opened_at = points.first().and_then(|p| p.timestamp).unwrap_or(0);

    let position = match Position::open(side, entry_price, opened_at) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let book = PositionBook::new();
    let id = book.open(position);

    eprintln!(
        "Evaluating {} position from {:.4} over {} ticks",
        side,
        entry_price,
        ticks.len()
    );

    let mut last = Decision::Hold;
    for (i, point) in ticks.iter().enumerate() {
        last = match book.on_tick(id, point.close, &policy) {
            Ok(d) => d,
            Err(e) => return fail(&e),
        };
        let stop = book
            .get(id)
            .and_then(|p| p.trailing_stop_price)
            .map_or_else(|| "-".to_string(), |s| format!("{:.4}", s));
        println!("{}\t{:.4}\t{}\t{}", i + 1, point.close, stop, last);
        if last.is_close() {
            break;
        }
    }

    if let Some(final_state) = book.get(id) {
        let last_price = ticks.last().map_or(entry_price, |p| p.close);
        eprintln!(
            "Result: {} (unrealized {:.2}% at last evaluated price)",
            last,
            final_state.unrealized_pct(last_price)
        );
    }
    ExitCode::SUCCESS
}

fn run_policy_get(user: &str, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_settings_store(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let book = PolicyBook::new(store);
    match book.get(user) {
        Ok(policy) => print_policy(user, &policy),
        Err(e) => fail(&e),
    }
}

fn run_policy_set(user: &str, config_path: &PathBuf, overrides: &PolicyOverrides) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_settings_store(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let book = PolicyBook::new(store);

    // The raw stored record is the base so flags can repair one that no longer validates.
    let current = match book.update_base(user) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    match book.update(user, overrides.apply(&current)) {
        Ok(policy) => {
            eprintln!("Policy for {} updated", user);
            print_policy(user, &policy)
        }
        Err(e) => fail(&e),
    }
}

fn print_policy(user: &str, policy: &RiskPolicy) -> ExitCode {
    match serde_json::to_string_pretty(&json!({ "user": user, "policy": policy })) {
        Ok(body) => {
            println!("{}", body);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to encode policy: {e}");
            ExitCode::from(1)
        }
    }
}

fn run_policy_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_signal_config(&config) {
        return fail(&e);
    }
    eprintln!("  [signal] ok");

    if let Err(e) = validate_risk_config(&config) {
        return fail(&e);
    }
    eprintln!("  [risk] ok");

    if config.get_string("settings", "path").is_some()
        || config.get_string("settings", "backend").is_some()
    {
        if let Err(e) = validate_settings_config(&config) {
            return fail(&e);
        }
        eprintln!("  [settings] ok");
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_size(
    prices_path: &PathBuf,
    balance_path: &PathBuf,
    asset: &str,
    config_path: Option<&PathBuf>,
    user: Option<&str>,
) -> ExitCode {
    let config = match load_optional_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let signal_config = match resolve_signal_config(config.as_ref()) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let policy = match resolve_policy(config.as_ref(), user) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let series = match load_series(prices_path) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let Some(last) = series.last() else {
        eprintln!("error: no prices to size against");
        return ExitCode::from(5);
    };

    let balances = match JsonBalanceAdapter::from_file(balance_path) {
        Ok(b) => b,
        Err(e) => return fail(&e),
    };
    let free = match balances.free_balance(user.unwrap_or("default"), asset) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };

    let signal = generate_signal(&series, &signal_config);
    if signal.kind == SignalKind::Neutral {
        eprintln!("Signal is neutral; nothing to size");
    }

    match plan_entry(&signal, last.close, free, &policy) {
        Ok(Some(plan)) => match serde_json::to_string_pretty(&plan) {
            Ok(body) => {
                println!("{}", body);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: failed to encode entry plan: {e}");
                ExitCode::from(1)
            }
        },
        Ok(None) => {
            println!("null");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}
