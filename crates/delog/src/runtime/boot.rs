//! Boot: logging init and config load for the binary.

use tracing::{info, warn};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::conf::{DelogConfig, OutputFormat};
use crate::error::DelogError;
use crate::runtime::cli::Cli;

/// Filter used until the configuration is loaded.
pub const BOOT_LOG_FILTER: &str = "delog=info";

pub type LogHandle = reload::Handle<EnvFilter, Registry>;

/// Initialise the tracing / logging subsystem. `RUST_LOG` wins over
/// `default_filter`. The returned handle swaps the filter later.
pub fn init_logging(default_filter: &str) -> LogHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

/// Replace the boot filter with the configured one. Skipped when
/// `RUST_LOG` is set.
pub fn apply_log_filter(
    handle: &LogHandle,
    directive: &str,
    env_override: bool,
) -> Result<(), DelogError> {
    if env_override {
        return Ok(());
    }
    let filter = EnvFilter::try_new(directive).map_err(|e| {
        DelogError::configuration(format!("invalid log filter {:?}: {}", directive, e))
    })?;
    if let Err(e) = handle.reload(filter) {
        warn!("Could not apply log filter {}: {}", directive, e);
    }
    Ok(())
}

/// Load the configuration and apply command line overrides.
/// Priority: Command Line > Environment Variables > Config File > Defaults
pub fn load_config(cli: &Cli) -> Result<DelogConfig, DelogError> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = DelogConfig::from_file(path)?;
            config.apply_env(|name| std::env::var(name).ok())?;
            config
        }
        None => DelogConfig::load()?,
    };

    apply_cli(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_cli(config: &mut DelogConfig, cli: &Cli) {
    if let Some(parser) = &cli.parser {
        config.parser = parser.clone();
    }
    config.settings.extend(cli.settings.iter().cloned());
    if cli.pretty {
        config.output = OutputFormat::Pretty;
    }
}

/// Start logging, load config, then switch to its log filter.
pub fn boot(cli: &Cli) -> Result<DelogConfig, DelogError> {
    let handle = init_logging(BOOT_LOG_FILTER);
    let config = load_config(cli)?;
    apply_log_filter(
        &handle,
        &config.log_filter,
        std::env::var_os(EnvFilter::DEFAULT_ENV).is_some(),
    )?;

    info!("Starting delog v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Loaded configuration: parser={}, output={:?}, settings={}",
        config.parser,
        config.output,
        config.settings.len()
    );
    Ok(config)
}
