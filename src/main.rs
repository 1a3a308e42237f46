#![forbid(unsafe_code)]

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level as TraceLevel};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

use cli::{Cli, Command};
use econ_policy::constants::units::CAKES_PER_ARC;
use econ_policy::units::{format_arcs, parse_amount};
use econ_policy::{
    AppConfig, ChangeNotifier, FactorSnapshot, JsonFileSettings, PolicyId, PolicyStore, StoreHandle,
    StoreService,
};

fn parse_log_level(level: &str) -> TraceLevel {
    match level.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

type LevelHandle = reload::Handle<LevelFilter, Registry>;

/// Level used until the config file has been read
fn startup_level(env_level: Option<&str>) -> TraceLevel {
    parse_log_level(env_level.unwrap_or("info"))
}

/// Level to switch to once the config is loaded; `None` when LOG_LEVEL
/// already decided it
fn configured_level(env_level: Option<&str>, config: &AppConfig) -> Option<TraceLevel> {
    match env_level {
        Some(_) => None,
        None => Some(parse_log_level(&config.log_level)),
    }
}

/// Install the subscriber before anything else logs, so config loading
/// messages are not lost. The level can be changed later through the handle.
fn init_logging(env_level: Option<&str>) -> Result<LevelHandle> {
    let (filter, handle) =
        reload::Layer::new(LevelFilter::from_level(startup_level(env_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(handle)
}

fn print_factor(factor: &FactorSnapshot) {
    let marker = if factor.is_overridden() { "*" } else { " " };
    println!(
        "{marker} {:<58} {:>18}  (default {}) {}",
        factor.key,
        format_arcs(factor.current_value, CAKES_PER_ARC),
        format_arcs(factor.default_value, CAKES_PER_ARC),
        factor.title,
    );
}

async fn list(handle: &StoreHandle, policies: &[PolicyId]) -> Result<()> {
    for &policy in policies {
        println!("[{}]", policy.label());
        let mut group = None;
        for factor in handle.snapshot(policy).await? {
            if group != Some(factor.group) {
                println!("  {}", factor.group.title());
                group = Some(factor.group);
            }
            print_factor(&factor);
        }
    }
    Ok(())
}

async fn watch(handle: &StoreHandle, interval_ms: u64) -> Result<()> {
    let (changed_tx, mut changed_rx) = tokio::sync::mpsc::unbounded_channel();
    let listener = handle.subscribe(Arc::new(move |policy: PolicyId| {
        let _ = changed_tx.send(policy);
    }));

    info!(interval_ms, "watching settings for changes");
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                if let Err(e) = handle.poll_provider().await {
                    warn!(error = %e, "failed to poll settings");
                }
            }
            Some(policy) = changed_rx.recv() => {
                println!("{} changed: {}", policy.label(), handle.raw_settings(policy).await?);
            }
        }
    }

    handle.unsubscribe(listener);
    Ok(())
}

async fn run(command: Command, handle: &StoreHandle, config: &AppConfig) -> Result<()> {
    match command {
        Command::List { policy } => {
            let policies = match policy {
                Some(policy) => vec![policy.into()],
                None => PolicyId::ALL.to_vec(),
            };
            list(handle, &policies).await?;
        }
        Command::Get { key } => {
            let value = handle.get_current_value(&key).await?;
            let title = handle.get_title(&key).await?;
            println!("{key} = {} ({value} cakes) - {title}", format_arcs(value, CAKES_PER_ARC));
        }
        Command::Set { key, amount } => {
            let value = parse_amount(&amount, CAKES_PER_ARC)
                .with_context(|| format!("Invalid amount for {key}"))?;
            handle.update_value(&key, value).await?;
            println!("{key} = {}", format_arcs(value, CAKES_PER_ARC));
        }
        Command::Reset { policy } => {
            handle.reset_to_defaults(policy.into()).await?;
        }
        Command::Raw { policy } => {
            println!("{}", handle.raw_settings(policy.into()).await?);
        }
        Command::Watch => watch(handle, config.watch_interval_ms).await?,
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // LOG_LEVEL wins over the config file
    let env_level = std::env::var("LOG_LEVEL").ok();
    let log_handle = init_logging(env_level.as_deref())?;

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path)?;
    if let Some(level) = configured_level(env_level.as_deref(), &config) {
        log_handle
            .reload(LevelFilter::from_level(level))
            .context("Failed to apply configured log level")?;
    }

    let settings = JsonFileSettings::open(config.settings_path())
        .context("Failed to open settings file")?;
    let store = PolicyStore::load(Box::new(settings), ChangeNotifier::new(), CAKES_PER_ARC);
    let (handle, task) = StoreService::spawn(store);

    let result = run(cli.command, &handle, &config).await;

    handle.shutdown().await;
    task.await.context("Store service panicked")?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG"), TraceLevel::DEBUG);
        assert_eq!(parse_log_level("warn"), TraceLevel::WARN);
        assert_eq!(parse_log_level("verbose"), TraceLevel::INFO);
    }

    #[test]
    fn test_startup_level_before_config() {
        assert_eq!(startup_level(None), TraceLevel::INFO);
        assert_eq!(startup_level(Some("trace")), TraceLevel::TRACE);
    }

    #[test]
    fn test_config_level_applies_only_without_env() {
        let config = AppConfig {
            log_level: "error".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(configured_level(None, &config), Some(TraceLevel::ERROR));
        assert_eq!(configured_level(Some("debug"), &config), None);
    }
}
