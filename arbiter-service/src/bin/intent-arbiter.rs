#[path = "intent-arbiter/cli.rs"]
mod cli;
#[path = "intent-arbiter/setup.rs"]
mod setup;

use crate::cli::Cli;
use arbiter_core::infrastructure::transport::{CommandSink, IntentSource};
use arbiter_service::service::arbitration::run_arbitration_loop;
use arbiter_service::service::flow::ServiceFlow;
use arbiter_service::service::metrics::Metrics;
use arbiter_service::transport::{TcpCommandSink, TcpIntentSource};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse_args();
    args.apply_to_env();

    let data_dir = arbiter_core::infrastructure::config::resolve_data_dir()?;
    let log_dir = data_dir.join("logs").to_string_lossy().into_owned();
    setup::init_logging(Some(log_dir.as_str()), &args.log_level);
    info!("intent-arbiter starting log_level={} log_dir={}", args.log_level, log_dir);

    let app_config = if let Some(profile) = args.profile.as_deref() {
        info!("loading config profile profile={}", profile.trim());
        let config_path = arbiter_core::infrastructure::config::resolve_config_path(&data_dir);
        setup::load_app_config_profile(&config_path, profile.trim())?
    } else {
        setup::load_app_config()?
    };
    info!(
        "config loaded listen_addr={} forward_addr={} collection_window_ms={} default_ttl_seconds={} table_entries={} directory_addr_set={}",
        app_config.ingress.listen_addr,
        app_config.egress.forward_addr,
        app_config.arbitration.collection_window_ms,
        app_config.arbitration.default_ttl_seconds,
        app_config.priority.table.len(),
        app_config.priority.directory_addr().is_some()
    );

    let audit = setup::init_audit(&app_config)?;
    let directory = setup::init_directory(&app_config);
    let sink: Arc<dyn CommandSink> = Arc::new(TcpCommandSink::new(app_config.egress.forward_addr.clone()));

    let (flow, fired_rx) = ServiceFlow::new(&app_config, audit, directory, sink)?;
    let flow = Arc::new(flow);
    spawn_status_reporter(flow.metrics());

    let source: Arc<dyn IntentSource> = Arc::new(TcpIntentSource::bind(&app_config.ingress.listen_addr).await?);

    let app_config_for_loop = app_config.clone();
    let flow_for_loop = flow.clone();
    tokio::spawn(async move {
        if let Err(err) = run_arbitration_loop(app_config_for_loop, flow_for_loop, source, fired_rx).await {
            warn!("arbitration loop error: {}", err);
        }
    });

    info!("arbiter running; waiting for ctrl-c");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    Ok(())
}

fn spawn_status_reporter(metrics: Arc<Metrics>) {
    tokio::spawn(async move {
        let interval_seconds = 300u64;
        info!("status reporter started interval_seconds={}", interval_seconds);
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
        loop {
            interval.tick().await;
            let snapshot = metrics.snapshot();
            info!(
                "periodic status report uptime_minutes={} intents_admitted={} intents_malformed={} resolutions_single={} resolutions_identical={} resolutions_conflict={} commands_ok={} commands_error={} intents_expired={}",
                snapshot.uptime.as_secs() / 60,
                snapshot.intents_admitted,
                snapshot.intents_malformed,
                snapshot.resolutions_single,
                snapshot.resolutions_identical,
                snapshot.resolutions_conflict,
                snapshot.commands_ok,
                snapshot.commands_error,
                snapshot.intents_expired
            );
        }
    });
}
