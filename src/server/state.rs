use std::sync::Arc;

use crate::cluster::SharedClusterClient;
use crate::facade::OrchestrationFacade;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<OrchestrationFacade>,
}

impl AppState {
    /// Build the state around the process-wide cluster client
    pub fn new(client: SharedClusterClient) -> Self {
        Self {
            facade: Arc::new(OrchestrationFacade::new(client)),
        }
    }
}
