//! Catalog service library: item store, stats cache and HTTP surface.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod stats;
