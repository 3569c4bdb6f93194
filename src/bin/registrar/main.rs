//! Registrar server: loads settings, registers routes once and serves them.
//!
//! Run with `cargo run --bin registrar`. Set `DB_DRIVER=sqlite` and `DB_DATABASE=:memory:` for a
//! local run without PostgreSQL.

mod students;

use registrar::config::Driver;
use registrar::{logging, AppState, Kernel, Router, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    let _log_guard = logging::init(&settings.app);

    let state = AppState::from_settings(settings);
    if state.settings.database.driver == Driver::Sqlite {
        let conn = state.db.get_connection().await?;
        conn.execute(students::SQLITE_SCHEMA, &[]).await?;
    }

    let mut router = Router::new();
    students::routes(&mut router)?;
    for route in router.routes() {
        tracing::debug!(method = %route.method(), pattern = %route.pattern(), handler = %route.target(), "route");
    }
    tracing::info!(routes = router.routes().len(), "routes registered");

    let bind = state.settings.app.bind.clone();
    let app = Kernel::new(router, state).into_router();
    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("{} listening on http://{}", env!("CARGO_PKG_NAME"), listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
