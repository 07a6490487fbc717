use clinic_bus::EventBus;
use clinic_core::store::StateStore;
use clinic_core::Catalog;
use std::sync::Arc;

/// Capabilities shared with every route handler.
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<dyn EventBus>,
    pub state_store: Arc<dyn StateStore>,
    pub catalog: Arc<dyn Catalog>,
}
