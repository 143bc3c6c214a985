//! Application state
//!
//! Holds the shared state for the Axum application including
//! the service context and configuration.

use std::sync::Arc;

use clinic_common::{AppConfig, TokenIssuer};
use clinic_service::ServiceContext;

use crate::delivery::ClientDeliveryAdapter;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    service_context: Arc<ServiceContext>,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(service_context: ServiceContext, config: AppConfig) -> Self {
        Self {
            service_context: Arc::new(service_context),
            config: Arc::new(config),
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Access-token issuer from the service context
    pub fn token_issuer(&self) -> &TokenIssuer {
        self.service_context.token_issuer()
    }

    /// Cookie/body delivery for refresh tokens
    pub fn delivery(&self) -> ClientDeliveryAdapter<'_> {
        ClientDeliveryAdapter::new(&self.config.cookie)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &"ServiceContext")
            .field("config", &"AppConfig")
            .finish()
    }
}
