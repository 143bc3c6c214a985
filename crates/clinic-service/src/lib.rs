//! # clinic-service
//!
//! Application layer: the session orchestrator and the components it drives
//! (refresh-token store, lockout guard, per-account lock registry), plus the
//! request/response DTOs used by the HTTP layer.

pub mod dto;
pub mod services;

pub use services::{
    spawn_purge_task, AccountLockGuard, AccountLockRegistry, AccountLockoutGuard,
    RefreshTokenStore, ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult,
    SessionPolicy, SessionService, SessionTokens,
};
