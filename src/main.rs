//! Tenant logging demo host.
//!
//! # Architecture Overview
//!
//! ```text
//!     tenant threads                      registry
//!     ──────────────                      ────────
//!     Tenant::enter()  ──get_repository──▶ cache ──miss──▶ discovery ──▶ loader
//!     logger.info()    ◀── Arc<LogRepo> ──  │                              │
//!                                           └──── watcher (per tenant) ◀───┘
//!
//!     <home>/conf/registry.toml   registry settings
//!     <home>/conf/logging.*       host configuration (optional here)
//!     <home>/apps/<tenant>/       tenant resources
//!     <home>/logs/                default tenant log files
//! ```
//!
//! Each `--tenant` gets a heartbeat thread logging through its own
//! repository. Edit `<home>/apps/<tenant>/logging.xml` while running to see
//! the change applied within one poll interval.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tenant_logging::config::load_or_default;
use tenant_logging::lifecycle::signals::wait_for_shutdown;
use tenant_logging::observability::{logging::init_tracing, metrics::init_metrics};
use tenant_logging::tenant::{DirectoryResolver, HostHome, HostPaths};
use tenant_logging::{Tenant, TenantRepositoryRegistry};

#[derive(Parser)]
#[command(name = "tenant-logging")]
#[command(about = "Run tenants against a shared logging registry", long_about = None)]
struct Cli {
    /// Host home directory (defaults to $TENANT_LOGGING_HOME or the working directory)
    #[arg(long)]
    home: Option<PathBuf>,

    /// Tenant to start; resources are read from <home>/apps/<tenant>
    #[arg(short, long = "tenant")]
    tenants: Vec<String>,

    /// Override the config file poll interval
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Emit host diagnostics as JSON
    #[arg(long)]
    json_logs: bool,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

const HEARTBEAT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    tracing::info!("tenant-logging v{} starting", env!("CARGO_PKG_VERSION"));

    let host = match cli.home {
        Some(home) => HostHome::new(home),
        None => HostHome::from_env()?,
    };

    let mut settings = load_or_default(&host.conf_directory().join("registry.toml"))?;
    if let Some(secs) = cli.interval_secs {
        settings.watch_interval_ms = secs.saturating_mul(1000).max(1);
    }

    tracing::info!(
        home = ?host.home_directory(),
        config_name = %settings.config_name,
        watch_interval_ms = settings.watch_interval_ms,
        "Configuration loaded"
    );

    if let Some(addr) = cli.metrics_address {
        init_metrics(addr);
    }

    let apps_dir = host.home_directory().join("apps");
    let registry = Arc::new(TenantRepositoryRegistry::new(settings, Arc::new(host)));

    match registry.get_repository() {
        Ok(repository) => repository.logger("host").info("Host logging configured"),
        Err(e) => tracing::warn!(error = %e, "Host logging not configured"),
    }

    let running = Arc::new(AtomicBool::new(true));
    let mut tenants = Vec::new();
    let mut heartbeats = Vec::new();

    for name in &cli.tenants {
        let tenant = Tenant::new(name.as_str(), Arc::new(DirectoryResolver::new(apps_dir.join(name))));
        let thread_tenant = tenant.clone();
        let thread_registry = registry.clone();
        let thread_running = running.clone();

        let handle = std::thread::Builder::new()
            .name(format!("[{name}].heartbeat"))
            .spawn(move || heartbeat(&thread_tenant, &thread_registry, &thread_running))?;
        tenants.push(tenant);
        heartbeats.push(handle);
    }

    tracing::info!(tenants = tenants.len(), "Tenants started");
    wait_for_shutdown().await;

    running.store(false, Ordering::SeqCst);
    for tenant in &tenants {
        tenant.shutdown();
    }
    for handle in heartbeats {
        if handle.join().is_err() {
            tracing::error!("Heartbeat thread panicked");
        }
    }
    registry.shutdown();

    tracing::info!("Shutdown complete");
    Ok(())
}

fn heartbeat(tenant: &Arc<Tenant>, registry: &TenantRepositoryRegistry, running: &AtomicBool) {
    let _guard = tenant.enter();
    let mut beat = 0u64;

    while running.load(Ordering::SeqCst) {
        match registry.get_repository() {
            Ok(repository) => {
                let logger = repository.logger("demo.heartbeat");
                logger.info(format!("heartbeat {beat}"));
                logger.debug(format!("tenant {} is alive", tenant.id()));
            }
            Err(e) => tracing::error!(tenant = %tenant.id(), error = %e, "Failed to get logging repository"),
        }
        beat += 1;

        // Sleep in short steps so shutdown is prompt.
        let mut slept = Duration::ZERO;
        while slept < HEARTBEAT && running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(100));
            slept += Duration::from_millis(100);
        }
    }
}
