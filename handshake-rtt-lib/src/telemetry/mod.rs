pub mod metrics;
mod metrics_handler;
pub mod server;
pub mod tracing;

pub use metrics::{build_metrics, init_metrics, Metrics};
pub use metrics_handler::{handle_metrics, health_check_response};
pub use server::{serve_observability, start_observability_server};
pub use tracing::init_tracing;
