use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use {
    admitly_config::{ExporterType, TelemetryConfig},
    admitly_observability::{Observability, logging::init_logging, routes},
    admitly_trace::{FLAG_SAMPLED, SpanContext, generate_traceparent, new_span_id, new_trace_id},
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::{info, warn},
};

#[derive(Parser)]
#[command(name = "admitly", about = "admitly telemetry server", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./admitly.toml and the user config dir).
    #[arg(long, global = true, env = "ADMITLY_CONFIG")]
    config: Option<PathBuf>,

    // Server arguments (used when no subcommand is provided, or with `serve`)
    /// Address to bind to.
    #[arg(long, global = true, env = "ADMITLY_BIND", default_value = "127.0.0.1")]
    bind: String,
    /// Port to listen on.
    #[arg(long, global = true, env = "ADMITLY_PORT", default_value_t = 9464)]
    port: u16,
    /// Span exporter (console, jaeger, zipkin, otlp); overrides config.
    #[arg(long, global = true)]
    exporter: Option<ExporterType>,
    /// Sampling ratio in [0, 1]; overrides config.
    #[arg(long, global = true)]
    sampling_ratio: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve /metrics and the trace API, exporting spans in the background
    /// (default when no subcommand is provided).
    Serve,
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print a fresh root `traceparent` value, handy for manual propagation tests.
    Traceparent {
        /// Mark the trace as not sampled (flags 00).
        #[arg(long)]
        unsampled: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config as JSON.
    Show,
    /// Print the user config directory.
    Path,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<TelemetryConfig> {
    match path {
        Some(path) => {
            let mut config = admitly_config::load_config(path)
                .with_context(|| format!("loading {}", path.display()))?;
            admitly_config::apply_env_overrides(&mut config);
            Ok(config)
        },
        None => Ok(admitly_config::discover_and_load()),
    }
}

/// CLI flags win over file and environment values.
fn apply_cli_overrides(config: &mut TelemetryConfig, cli: &Cli) {
    if let Some(exporter) = cli.exporter {
        config.exporter = exporter;
    }
    if let Some(ratio) = cli.sampling_ratio {
        config.sampling_ratio = ratio;
    }
}

async fn serve(config: TelemetryConfig, bind: &str, port: u16) -> anyhow::Result<()> {
    let obs = Arc::new(Observability::new(config)?);
    if let Err(e) = obs.install_metrics_recorder() {
        warn!(error = %e, "metrics facade recorder not installed");
    }
    obs.start_export_worker();

    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        service = %obs.config().service_name,
        exporter = %obs.config().exporter,
        sampling_ratio = obs.tracer().sampling_ratio(),
        "admitly listening"
    );

    axum::serve(listener, routes::router(Arc::clone(&obs)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    obs.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    info!("shutdown requested");
}

fn root_traceparent(sampled: bool) -> String {
    generate_traceparent(&SpanContext {
        trace_id: new_trace_id(),
        span_id: new_span_id(),
        parent_span_id: None,
        trace_flags: if sampled { FLAG_SAMPLED } else { 0 },
        trace_state: None,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs)?;

    match cli.command {
        // Default: serve when no subcommand is provided
        None | Some(Commands::Serve) => {
            info!(version = env!("CARGO_PKG_VERSION"), "admitly starting");
            let mut config = load_config(cli.config.as_ref())?;
            apply_cli_overrides(&mut config, &cli);
            serve(config, &cli.bind, cli.port).await
        },
        Some(Commands::Config { ref action }) => {
            match action {
                ConfigAction::Show => {
                    let mut config = load_config(cli.config.as_ref())?;
                    apply_cli_overrides(&mut config, &cli);
                    println!("{}", serde_json::to_string_pretty(&config)?);
                },
                ConfigAction::Path => match admitly_config::config_dir() {
                    Some(dir) => println!("{}", dir.display()),
                    None => eprintln!("no user config directory on this platform"),
                },
            }
            Ok(())
        },
        Some(Commands::Traceparent { unsampled }) => {
            println!("{}", root_traceparent(!unsampled));
            Ok(())
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::CommandFactory};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "admitly",
            "serve",
            "--exporter",
            "zipkin",
            "--sampling-ratio",
            "0.25",
            "--port",
            "9000",
        ]);
        assert!(matches!(cli.command, Some(Commands::Serve)));
        let mut config = TelemetryConfig::default();
        apply_cli_overrides(&mut config, &cli);

        assert_eq!(config.exporter, ExporterType::Zipkin);
        assert_eq!(config.sampling_ratio, 0.25);
        assert_eq!(cli.port, 9000);
    }

    #[test]
    fn unknown_exporter_is_rejected() {
        assert!(Cli::try_parse_from(["admitly", "--exporter", "datadog"]).is_err());
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admitly.toml");
        std::fs::write(&path, "service_name = \"college-advisor\"\nexporter = \"otlp\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.service_name, "college-advisor");
        assert_eq!(config.exporter, ExporterType::Otlp);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn traceparent_is_parseable() {
        let sampled = admitly_trace::parse_traceparent(&root_traceparent(true)).unwrap();
        assert!(sampled.is_sampled());
        let unsampled = admitly_trace::parse_traceparent(&root_traceparent(false)).unwrap();
        assert!(!unsampled.is_sampled());
    }
}
