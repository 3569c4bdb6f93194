//! Shared application state handed to every action. Built once by the composition root.

use crate::config::Settings;
use crate::db::ConnectionManager;
use crate::view::Renderer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: Arc<ConnectionManager>,
    pub views: Arc<Renderer>,
}

impl AppState {
    pub fn new(settings: Settings, db: ConnectionManager, views: Renderer) -> Self {
        AppState {
            settings: Arc::new(settings),
            db: Arc::new(db),
            views: Arc::new(views),
        }
    }

    /// Connection manager and renderer derived from the settings.
    pub fn from_settings(settings: Settings) -> Self {
        let db = ConnectionManager::new(settings.database.clone());
        let views = Renderer::new(&settings.app.views_path).with_globals(&settings.app);
        Self::new(settings, db, views)
    }
}
