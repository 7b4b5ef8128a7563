use std::sync::Arc;

use crate::monitor::SiteMonitor;

// App state
#[derive(Debug, Clone)]
pub struct AppState {
    pub monitor: Arc<SiteMonitor>,
}

impl AppState {
    pub fn new(monitor: Arc<SiteMonitor>) -> Self {
        Self { monitor }
    }
}
