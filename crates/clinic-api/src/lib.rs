//! # clinic-api
//!
//! HTTP surface of the session subsystem built with Axum: login, refresh,
//! logout, session listing, and health probes.

pub mod delivery;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, create_in_memory_state, run, run_server};
pub use state::AppState;
