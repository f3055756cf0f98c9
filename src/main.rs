mod config;
mod db;
mod entities;
mod error;
mod models;
mod omdb;
mod reconcile;
mod routes;
mod store;
mod templates;

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::Config, omdb::OmdbClient, store::MovieStore};

pub struct AppState {
    pub store: MovieStore,
    pub omdb: Arc<OmdbClient>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movieweb=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent("movieweb/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let store = MovieStore::new(db);

    let omdb = OmdbClient::new(
        http,
        config.omdb_api_key.clone(),
        config.omdb_base_url.clone(),
        config.omdb_timeout_secs,
        config.omdb_rps,
    );

    let state = Arc::new(AppState { store, omdb: Arc::new(omdb) });

    let app = Router::new()
        .route("/", get(routes::home))
        .route("/users", get(routes::list_users))
        .route("/users/{id}", get(routes::user_movies))
        .route("/add_user", get(routes::add_user_form).post(routes::add_user))
        .route("/users/{id}/add_movie", get(routes::add_movie_form).post(routes::add_movie))
        .route(
            "/users/{id}/update_movie/{movie_id}",
            get(routes::update_movie_form).post(routes::update_movie),
        )
        .route("/users/{id}/delete_movie/{movie_id}", get(routes::delete_movie))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
