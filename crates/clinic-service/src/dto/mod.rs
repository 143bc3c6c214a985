//! Data transfer objects for API requests and responses
//!
//! This module provides:
//! - Request DTOs with validation for API inputs
//! - Response DTOs for serializing API outputs

pub mod requests;
pub mod responses;

pub use requests::{LoginRequest, LogoutRequest, RefreshTokenRequest};

pub use responses::{
    CurrentAccountResponse, HealthChecks, HealthResponse, LogoutAllResponse, MessageResponse,
    ReadinessResponse, SessionResponse, TokenResponse,
};
