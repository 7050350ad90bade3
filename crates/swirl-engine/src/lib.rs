//! Pipeline façade for Swirl.
//!
//! [`Pipeline`] owns one compute device and everything allocated on it,
//! and runs the per-tick simulate → rasterize → encode sequence behind a
//! small lifecycle (`Uninitialized → Ready → Released`, with `Faulted`
//! entered on any device or codec fault).
//!
//! Configuration lives in [`PipelineConfig`]; faults surface as
//! [`PipelineError`] and leave the pipeline in a terminal state rather than
//! terminating the process. Whether to exit is the embedding host's call.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;

pub use config::{ConfigError, InitialField, PipelineConfig, RuleConfig, TransferKind};
pub use error::{LifecycleState, PipelineError};
pub use metrics::StepMetrics;
pub use pipeline::Pipeline;
