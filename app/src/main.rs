use app::{spawn_workers, DemoPool};
use cp_collector::PoolCollector;
use cp_config::Config;
use cp_core::telemetry;
use cp_obs::ObsState;
use std::process;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let loaded = Config::load();
    let env = loaded
        .as_ref()
        .map(|config| config.telemetry.env.as_str())
        .unwrap_or("development");
    telemetry::init_tracing(env, "chpool-exporter");
    tracing::info!("chpool-exporter starting");

    // Load configuration - exit with non-zero if invalid
    let config = match loaded {
        Ok(config) => {
            tracing::debug!(?config, "Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    tracing::info!(
        obs_addr = %config.server.bind_addr(),
        namespace = %config.metrics.namespace,
        subsystem = %config.metrics.subsystem,
        max_resources = config.demo.max_resources,
        workers = config.demo.workers,
        "Application configured and ready"
    );

    let pool = DemoPool::new(config.demo.max_resources, Duration::from_millis(10));
    spawn_workers(
        &pool,
        config.demo.workers,
        Duration::from_millis(config.demo.hold_ms),
    );

    let obs_state = ObsState::new();
    let stat_pool = pool.clone();
    let collector = PoolCollector::with_options(
        move || stat_pool.stat(),
        config.metrics.collector_options(),
    );
    if let Err(e) = obs_state.metrics.register_pool(collector) {
        tracing::error!("Failed to register pool collector: {}", e);
        process::exit(1);
    }

    if let Err(e) = cp_obs::start_server(&config.server.bind_addr(), obs_state).await {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }
}
