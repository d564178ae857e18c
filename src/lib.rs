//! tasksync core library
//!
//! Backend core for a multi-device task manager: CRUD over a relational
//! store, an offline-sync reconciliation engine, Redis-backed rate limiting,
//! and a best-effort listing cache. The HTTP layer lives elsewhere and
//! consumes the services exposed here.

pub mod cache;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod services;

/// Initialize logging for binaries and ad-hoc tooling.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasksync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
