use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use upnp_exporter::config::parse_duration;
use upnp_exporter::metrics::{bind, metrics_router, serve, ScrapeMode};
use upnp_exporter::upnp::{IgdStatsClient, SsdpDiscovery};
use upnp_exporter::{ExporterConfig, Poller, RouterScanner, StatsCollector};

/// Prometheus exporter for UPnP gateway traffic counters
#[derive(Parser, Debug)]
#[command(name = "upnp-exporter", version, about, long_about = None)]
struct Cli {
    /// Log debug messages
    #[arg(short, long)]
    debug: bool,

    /// Prometheus listener port
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Router description URL; skips discovery
    #[arg(short, long)]
    url: Option<String>,

    /// Discover router URLs and exit
    #[arg(long)]
    discover: bool,

    /// Poll routers on this interval instead of scanning on every scrape
    #[arg(short, long, value_parser = parse_duration)]
    interval: Option<Duration>,

    /// Timeout for each router query
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    timeout: Duration,

    /// How long to wait for SSDP answers during discovery
    #[arg(long, default_value = "3s", value_parser = parse_duration)]
    search_window: Duration,

    /// When polling, re-run discovery every N cycles
    #[arg(long)]
    rediscover_every: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = ExporterConfig::builder()
        .port(cli.port)
        .router_url(cli.url.as_deref())?
        .poll_interval(cli.interval)
        .rediscover_every(cli.rediscover_every)
        .query_timeout(cli.timeout)
        .search_window(cli.search_window)
        .build();

    let discovery = Arc::new(SsdpDiscovery::new(config.upnp.clone())?);
    let stats = Arc::new(IgdStatsClient::new(&config.upnp)?);
    let scanner = RouterScanner::new(
        config.router.clone(),
        discovery,
        stats,
        config.scanner.clone(),
    )
    .await
    .context("unable to create upnp scanner")?;

    if cli.discover {
        for (index, router) in scanner.list_endpoints().iter().enumerate() {
            println!("{}: {}", index + 1, router);
        }
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        routers = scanner.router_count(),
        "upnp-exporter started"
    );

    let collector = Arc::new(
        StatsCollector::new(Arc::new(scanner)).with_scrape_timeout(config.scrape_timeout),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mode = match config.poll_interval {
        Some(interval) => {
            let poller = Poller::new(collector.clone(), interval)
                .rediscover_every(config.rediscover_every);
            tokio::spawn(poller.run(shutdown_rx.clone()));
            ScrapeMode::Recorded
        }
        None => ScrapeMode::OnDemand,
    };

    let app = metrics_router(collector, mode, &config.metrics_path);
    let listener = bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, path = %config.metrics_path, "Serving metrics");

    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    serve(listener, app, shutdown_rx, config.shutdown_grace)
        .await
        .context("failed to do graceful shutdown for given time")?;

    tracing::info!("upnp-exporter stopped");
    Ok(())
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "upnp_exporter=debug,tower_http=debug"
    } else {
        "upnp_exporter=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Unable to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
