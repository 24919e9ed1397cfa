//! Client library for the Canopy group tree.
//!
//! - [`MulticastClient`]: picks the entry group (the targets' lowest
//!   common ancestor), submits requests, decodes aggregate responses.
//! - [`workload`]: the timed multi-client driver behind `canopy bench`.
//! - [`stats`]: latency samples and the tab-separated stats files the
//!   analysis scripts consume.

pub mod client;
pub mod error;
pub mod stats;
pub mod workload;

pub use client::MulticastClient;
pub use error::{ClientError, Result};
pub use stats::{Sample, write_stats, write_stats_dir};
pub use workload::{WorkloadConfig, WorkloadReport, run_workload};
