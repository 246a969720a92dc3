//! HTTP API: server wiring, identity resolution and access checks.

pub mod app;
pub mod authz;
pub mod config;
pub mod middleware;
