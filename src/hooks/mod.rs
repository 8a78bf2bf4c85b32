//! Push acceptance core
//!
//! One [`Pipeline`] run decides one ref update:
//!
//! 1. the pushed commit's metadata goes through the ordered [`gates`];
//! 2. if no gate decides, changed files are staged per type and checked;
//! 3. the result is a [`Decision`] for the caller to report.

pub mod context;
pub mod exemption;
pub mod gates;
pub mod pipeline;
pub mod staging;

pub use context::{ProjectPath, Protocol, PushEnv, PushRequest};
pub use exemption::ExemptionStore;
pub use pipeline::{Decision, Outcome, Pipeline, PipelineRun};
