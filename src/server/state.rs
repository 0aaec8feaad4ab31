use std::sync::Arc;

use crate::bus::BusAdapter;
use crate::credentials::CredentialStore;
use crate::delivery::DeliveryEngine;
use crate::subscription::SubscriptionRegistry;

/// Shared application state accessible to all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialStore>,
    pub registry: Arc<SubscriptionRegistry>,
    pub bus: Arc<dyn BusAdapter>,
    pub delivery: Arc<DeliveryEngine>,
}

impl AppState {
    pub fn new(
        credentials: Arc<CredentialStore>,
        registry: Arc<SubscriptionRegistry>,
        bus: Arc<dyn BusAdapter>,
        delivery: Arc<DeliveryEngine>,
    ) -> Self {
        Self {
            credentials,
            registry,
            bus,
            delivery,
        }
    }
}
