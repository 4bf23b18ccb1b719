use clap::Parser;
use host_monitor::{
    alerts::AlertManager,
    config::load_config,
    monitors::host::MonitorLoop,
    reporter::HttpReporter,
    sampler::SysinfoSource,
    util::env_lookup,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Samples host resource usage and reports it to a remote collector")]
struct Args {
    /// Config file (JSON)
    #[arg(short, long)]
    file: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_target("host_monitor", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = load_config(args.file.as_deref(), env_lookup)?;
    debug!("resolved config: {config:?}");

    let source = SysinfoSource::new(config.disk_path.clone());
    let reporter = HttpReporter::new(
        config.api_endpoint.clone(),
        config.auth_key.clone(),
        config.request_timeout,
    )?;
    info!("reporting to {}", reporter.endpoint());

    let alert_manager = AlertManager::new(config.alert_webhook.clone(), config.request_timeout)?;
    let monitor = MonitorLoop::new(source, reporter, config.thresholds, config.interval)
        .with_sample_timeout(config.sample_timeout)
        .with_alert_manager(alert_manager);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for ctrl-c: {e}");
                return;
            }
            info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    monitor.run(shutdown).await;

    Ok(())
}
