mod appointment;
mod config;
mod middleware;

mod db;
mod error;
mod listing;
mod lookup;
mod models;
mod routes;
mod store;

use crate::{
    config::Config, lookup::StaticRegionLookup, middleware::revising_user::X_REVISING_USER,
    models::AppState,
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;

    let state = match &cfg.database_url {
        Some(url) => {
            let pool = db::connect_pg(url, cfg.db_max_connections).await?;
            db::apply_schema(&pool).await?;
            AppState::postgres(pool, cfg.paging)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; appointments are kept in memory only");
            AppState::in_memory(StaticRegionLookup::default(), cfg.paging)
        }
    };

    // The host UI calls the API from the browser.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            X_REVISING_USER.clone(),
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
