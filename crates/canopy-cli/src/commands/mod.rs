//! CLI command implementations.

pub mod bench;
pub mod cluster;
pub mod group_config;
pub mod topology;
pub mod version;
