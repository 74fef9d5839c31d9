use crate::cli::ServeArgs;
use crate::infra::{build_core, seed_demo_portfolio, AppState};
use crate::routes::app_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use rentdesk::config::AppConfig;
use rentdesk::error::AppError;
use rentdesk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let core = build_core(config.billing.repeat_settlement);
    if args.demo_seed {
        let portfolio = seed_demo_portfolio(core.store.as_ref()).map_err(|err| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                err.to_string(),
            ))
        })?;
        info!(
            organization = %portfolio.organization,
            unit = %portfolio.unit_id,
            "demo portfolio seeded"
        );
    }

    spawn_sweep_loop(config.sweeper.lease_sweep_interval, {
        let sweeper = core.sweeper.clone();
        move || sweeper.expire_leases(Local::now().date_naive()).map(|_| ())
    });
    spawn_sweep_loop(config.sweeper.payment_sweep_interval, {
        let sweeper = core.sweeper.clone();
        move || {
            sweeper
                .flag_overdue_payments(Local::now().date_naive())
                .map(|_| ())
        }
    });

    let app = app_router(&core)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lease lifecycle service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Schedules one reconciliation sweep on a fixed cadence. A failing pass is
/// logged and the schedule keeps going; the sweeps are idempotent, so the
/// next tick picks up whatever this one missed.
fn spawn_sweep_loop<F>(period: Duration, sweep: F)
where
    F: Fn() -> Result<(), rentdesk::store::StoreError> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = sweep() {
                error!(error = %err, "reconciliation sweep failed");
            }
        }
    });
}
