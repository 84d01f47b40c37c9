//! Small helpers shared by the ingestor and the autotune engine.

pub mod config;
pub mod env;
