//! Axum adapter that runs the release router as a local development server.

mod dev_server;
mod parameter;
mod request;
mod service;

pub use dev_server::{dev_router, init_logging, run_dev};
pub use parameter::MemoryParameterStore;
pub use request::{into_cf_request, LOCAL_ORIGIN_DOMAIN};
pub use service::ReleaseRouterAxumService;
