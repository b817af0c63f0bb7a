use std::sync::Arc;

use crate::pipeline::Crawler;

/// Estado compartido de la aplicación.
#[derive(Clone)]
pub struct AppState {
    pub crawler: Arc<Crawler>,
}
