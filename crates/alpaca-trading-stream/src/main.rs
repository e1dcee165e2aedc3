/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Trade updates logged until shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use alpaca_trading_adapter::{StreamError, TradingStream};
use alpaca_trading_stream::{RunnerConfig, log_trade_update};

#[derive(Parser, Debug)]
#[command(name = "alpaca-trading-stream", version, about = "Alpaca trade update stream runner")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: PathBuf,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[arg(long = "dry-run")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    info!(
        config_path = %args.config_path.display(),
        dry_run = args.dry_run,
        "starting alpaca-trading-stream"
    );

    let config = load_config(&args.config_path)?;
    let credentials = config.resolve_credentials()?;
    let stream_config = config.to_stream_config(credentials);
    info!(
        endpoint = %stream_config.endpoint_url(),
        raw_data = stream_config.raw_data,
        "configuration loaded"
    );

    if args.dry_run {
        info!("dry-run requested; configuration validated");
        return Ok(());
    }

    let stream = Arc::new(TradingStream::new(stream_config));
    stream
        .subscribe_trade_updates(log_trade_update)
        .context("register trade update handler")?;

    setup_signal_handlers(stream.clone());

    stream.run_forever().await.context("run trading stream")?;
    info!("trading stream shutdown complete");

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: &PathBuf) -> Result<RunnerConfig> {
    let path_str = path
        .to_str()
        .context("config path must be valid utf-8")?;
    RunnerConfig::from_file(path_str).context("load config")
}

fn request_stop(stream: &TradingStream) {
    match stream.stop() {
        Ok(()) => {}
        // Signal raced the supervisor start; leave the stop pending.
        Err(StreamError::SupervisorNotRunning) => stream.stop_ws(),
        Err(err) => warn!(error = %err, "failed to stop trading stream"),
    }
}

fn setup_signal_handlers(stream: Arc<TradingStream>) {
    let stream_clone = stream.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        request_stop(&stream_clone);
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let stream_clone = stream.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut signals) => {
                    signals.recv().await;
                    info!("received SIGTERM");
                    request_stop(&stream_clone);
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
