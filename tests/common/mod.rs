#![allow(dead_code)]

use registrar::config::DatabaseSettings;
use registrar::{AppState, ConnectionManager, Renderer, Settings};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const LAYOUT: &str = "<html><body><main>{{ content }}</main></body></html>";

/// Settings for an in-memory SQLite database and the given views directory.
pub fn settings(views: &Path, debug: bool) -> Settings {
    let views = views.display().to_string();
    let debug = if debug { "true" } else { "false" };
    Settings::from_lookup(|key| match key {
        "DB_DRIVER" => Some("sqlite".to_string()),
        "DB_DATABASE" => Some(":memory:".to_string()),
        "APP_NAME" => Some("Registrar Test".to_string()),
        "APP_ENV" => Some("testing".to_string()),
        "APP_DEBUG" => Some(debug.to_string()),
        "VIEWS_PATH" => Some(views.clone()),
        _ => None,
    })
    .unwrap()
}

pub fn write(dir: &Path, name: &str, source: &str) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, source).unwrap();
}

/// A views directory with the main layout and 404/500 pages.
pub fn views() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "layouts/main.html", LAYOUT);
    write(dir.path(), "errors/404.html", "<h1>Not found: {{ path }}</h1>");
    write(dir.path(), "errors/500.html", "<h1>Something went wrong</h1>");
    dir
}

pub fn state(views: &Path, debug: bool) -> AppState {
    AppState::from_settings(settings(views, debug))
}

/// State whose connection manager is already bound to `conn`.
pub fn state_with(views: &Path, conn: Arc<dyn registrar::Connection>) -> AppState {
    let settings = settings(views, false);
    let renderer = Renderer::new(views).with_globals(&settings.app);
    AppState::new(settings, ConnectionManager::from_connection(conn), renderer)
}

pub async fn sqlite() -> Arc<dyn registrar::Connection> {
    registrar::db::connect(&DatabaseSettings::sqlite_memory()).await.unwrap()
}
