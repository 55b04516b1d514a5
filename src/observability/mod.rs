//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, stderr)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → terminal or log aggregation (fmt / JSON)
//!     → Prometheus scrape endpoint, when enabled
//! ```
//!
//! # Design Decisions
//! - Logs go to stderr so command output on stdout stays machine-readable
//! - Recording a metric without an installed exporter is a no-op

pub mod logging;
pub mod metrics;
