// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::infrastructure::headless_host::HeadlessHost;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub host: Arc<HeadlessHost>,
}
