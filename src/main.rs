#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use alumniconnect_chat::api::{MgmtState, ServiceContainer};
use alumniconnect_chat::config::Config;
use alumniconnect_chat::services::conversation_service::ConversationService;
use alumniconnect_chat::services::gateway::GatewayService;
use alumniconnect_chat::services::health_service::HealthService;
use alumniconnect_chat::services::rate_limit_service::RateLimitService;
use alumniconnect_chat::services::relay::{InProcessRelay, RoomRelay};
use alumniconnect_chat::storage::conversation_repo::ConversationRepository;
use alumniconnect_chat::workers::RelayGcWorker;
use alumniconnect_chat::{api, storage, telemetry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|&stop| stop).await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    telemetry::init_telemetry(&config.telemetry)?;

    alumniconnect_chat::setup_panic_hook();

    let startup_span = tracing::info_span!("startup");
    let (api_listener, mgmt_listener, app_router, mgmt_app, shutdown_tx, shutdown_rx, gc_worker) = async {
        // Phase 1: infrastructure (pool, schema, shutdown plumbing)
        let pool = storage::init_pool(&config.database).await?;
        alumniconnect_chat::run_migrations(&pool).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        alumniconnect_chat::spawn_signal_handler(shutdown_tx.clone());

        // Phase 2: service wiring
        let relay: Arc<dyn RoomRelay> = Arc::new(InProcessRelay::new(&config.relay));
        let conversation_service =
            ConversationService::new(pool.clone(), ConversationRepository::new(), Arc::clone(&relay));
        let gateway_service = GatewayService::new(conversation_service.clone(), Arc::clone(&relay));
        let rate_limit_service = RateLimitService::new(config.server.trusted_proxies.clone());
        let health_service = HealthService::new(pool, config.health.clone());
        let gc_worker = RelayGcWorker::new(relay, &config.relay);

        let services = ServiceContainer { conversation_service, gateway_service, rate_limit_service };

        // Phase 3: listeners and routers
        let app_router = api::app_router(config.clone(), services, shutdown_rx.clone());
        let mgmt_app = api::mgmt_router(MgmtState { health_service });

        let api_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let mgmt_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.mgmt_port).parse()?;

        tracing::info!(address = %api_addr, "listening");
        tracing::info!(address = %mgmt_addr, "management server listening");

        let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
        let mgmt_listener = tokio::net::TcpListener::bind(mgmt_addr).await?;

        anyhow::Ok((api_listener, mgmt_listener, app_router, mgmt_app, shutdown_tx, shutdown_rx, gc_worker))
    }
    .instrument(startup_span)
    .await?;

    // Phase 4: serve
    let gc_task = tokio::spawn(gc_worker.run(shutdown_rx.clone()));

    let api_server = axum::serve(api_listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));

    let mgmt_server = axum::serve(mgmt_listener, mgmt_app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));

    if let Err(e) = tokio::try_join!(api_server, mgmt_server) {
        tracing::error!(error = %e, "Server error");
    }

    // Phase 5: drain background tasks, bounded by the shutdown timeout
    let _ = shutdown_tx.send(true);
    tokio::select! {
        _ = gc_task => {
            tracing::info!("Background worker finished.");
        }
        () = tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)) => {
            tracing::warn!("Timeout waiting for background worker to exit.");
        }
    }

    telemetry::shutdown_telemetry();
    Ok(())
}
