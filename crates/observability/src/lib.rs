//! Observability for the admitly advisor platform.
//!
//! [`Observability`] owns the metric registry, the span tracer and the export
//! worker. Build it once from [`TelemetryConfig`](admitly_config::TelemetryConfig)
//! and share it by `Arc`:
//!
//! ```rust,ignore
//! let obs = Arc::new(Observability::new(config)?);
//! obs.start_export_worker();
//! let app = admitly_observability::routes::router(Arc::clone(&obs));
//! // ...
//! obs.shutdown().await;
//! ```

mod agent;
mod error;
pub mod logging;
pub mod middleware;
mod observability;
pub mod routes;

pub use {
    agent::{AgentRequest, AgentTelemetry, RequestOutcome},
    error::{Error, Result},
    observability::Observability,
};
