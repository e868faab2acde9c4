// Application state for HTTP handlers
use crate::application::pricing_service::PricingService;

#[derive(Clone)]
pub struct AppState {
    pub pricing_service: PricingService,
    /// Shared secret for the admin endpoints; `None` rejects every admin call.
    pub admin_api_key: Option<String>,
}

impl AppState {
    pub fn is_admin(&self, presented: Option<&str>) -> bool {
        match (self.admin_api_key.as_deref(), presented) {
            (Some(expected), Some(presented)) => expected == presented,
            _ => false,
        }
    }
}
