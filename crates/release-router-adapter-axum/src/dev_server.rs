use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use tokio::net::TcpListener;
use tokio::runtime::Builder as RuntimeBuilder;
use tokio::signal;

use release_router_core::config::{LoggingConfig, RouterConfig};
use release_router_core::parameter::ParameterStore;
use release_router_core::router::ReleaseRouter;

use crate::parameter::MemoryParameterStore;
use crate::service::ReleaseRouterAxumService;

/// Install `simple_logger` at the configured level. Repeated calls are ignored.
pub fn init_logging(logging: &LoggingConfig) {
    let level: LevelFilter = logging.level_filter();
    SimpleLogger::new().with_level(level).init().ok();
}

/// Build the router described by `config`, backed by an in-memory parameter
/// store seeded from `[dev.parameters]`.
pub fn dev_router(config: &RouterConfig) -> anyhow::Result<ReleaseRouter> {
    let store: Arc<dyn ParameterStore> = Arc::new(MemoryParameterStore::from_pairs(
        config.dev.parameters.clone(),
    ));
    config
        .build_router(Some(store))
        .context("failed to build release router")
}

/// Serve the router described by `config` until Ctrl-C.
///
/// Blocks the calling thread on its own tokio runtime. `addr` overrides
/// `[dev] addr`.
pub fn run_dev(config: &RouterConfig, addr: Option<SocketAddr>) -> anyhow::Result<()> {
    init_logging(&config.logging);
    let router = dev_router(config)?;
    let addr = addr.unwrap_or(config.dev.addr);

    let runtime = RuntimeBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        let listener = bind(addr).await?;
        log::info!("release router dev server listening on http://{addr}");
        serve(router, listener, async {
            let _ = signal::ctrl_c().await;
        })
        .await
    })
}

async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dev server to {addr}"))
}

async fn serve<F>(router: ReleaseRouter, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = Router::new().fallback_service(ReleaseRouterAxumService::new(router));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("axum server error")
}
