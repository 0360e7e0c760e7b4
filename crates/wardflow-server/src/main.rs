use std::sync::Arc;
use std::time::Duration;

use wardflow_engine::{Hospital, Transport};
use wardflow_pathway::RoundRobinSupplier;
use wardflow_rate::RateController;
use wardflow_server::config::loader::load_config;
use wardflow_server::config::{AppConfig, OutputTarget};
use wardflow_server::render::{CannedMessages, PlainRenderer};
use wardflow_server::runner::Runner;
use wardflow_server::transport::LineTransport;
use wardflow_server::{metrics, observability, pathways};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From WARDFLOW_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (wardflow.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (WARDFLOW_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present; environment overrides are applied by the config
    // loader afterwards.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let (config_path, source) = resolve_config_path();
    let cfg = match load_config(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(
        path = %config_path.as_deref().unwrap_or("wardflow.toml"),
        source = %source,
        "Configuration loaded"
    );
    observability::apply_logging_level(&cfg.logging.level);
    metrics::init_metrics();

    let hospital = match build_hospital(&cfg) {
        Ok(hospital) => hospital,
        Err(e) => {
            eprintln!("Hospital initialization failed: {e}");
            std::process::exit(2);
        }
    };
    let rate = Arc::new(RateController::new(
        cfg.simulation.pathways_per_hour,
        Duration::from_secs(3600),
    ));

    let runner = Runner::new(
        Arc::new(hospital),
        rate,
        cfg.simulation.sleep_for,
        cfg.simulation.max_pathways,
    );
    let token = runner.cancellation_token();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        token.cancel();
    });

    if let Err(err) = runner.run(cfg.addr()).await {
        eprintln!("Simulator error: {err}");
        std::process::exit(1);
    }
}

fn build_hospital(cfg: &AppConfig) -> Result<Hospital, String> {
    let definitions = pathways::load_pathways(&cfg.simulation.pathways_file)?;
    tracing::info!(
        count = definitions.len(),
        file = %cfg.simulation.pathways_file,
        "Pathways loaded"
    );
    let supplier =
        RoundRobinSupplier::new(definitions).map_err(|e| format!("pathway supplier: {e}"))?;

    let transport: Arc<dyn Transport> = match cfg.output.target {
        OutputTarget::Stdout => Arc::new(LineTransport::stdout()),
        OutputTarget::File => Arc::new(
            LineTransport::file(&cfg.output.file)
                .map_err(|e| format!("cannot open output file {}: {e}", cfg.output.file))?,
        ),
    };

    let mut builder = Hospital::builder()
        .with_supplier(Arc::new(supplier))
        .with_locations(cfg.locations.clone())
        .with_renderer(Arc::new(PlainRenderer))
        .with_transport(transport)
        .with_metrics(Arc::new(metrics::PrometheusSink))
        .with_evict_after_delete(cfg.simulation.delete_patients_from_memory);
    if !cfg.hardcoded_messages.is_empty() {
        builder = builder
            .with_hardcoded_messages(Arc::new(CannedMessages::new(cfg.hardcoded_messages.clone())));
    }
    builder.build().map_err(|e| e.to_string())
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: WARDFLOW_CONFIG
/// 3. None, letting the loader fall back to wardflow.toml
fn resolve_config_path() -> (Option<String>, ConfigSource) {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (Some(path), ConfigSource::CliArgument);
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            return (Some(path.to_string()), ConfigSource::CliArgument);
        }
    }
    if let Ok(path) = std::env::var("WARDFLOW_CONFIG") {
        if !path.is_empty() {
            return (Some(path), ConfigSource::EnvironmentVariable);
        }
    }
    (None, ConfigSource::Default)
}
