use axum::{
    Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use clap::Parser;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

mod config;
mod error;
mod extract;
mod routes;
mod state;
mod ws;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    let config = Config::parse();
    let state = AppState::from_config(&config)?;
    state.spawn_idle_sweep(config.client_idle());

    info!("Starting tolk web server");
    let app = app(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("🚀 Server running at http://{}", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn app(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    let api = Router::new()
        .route("/session", post(routes::open_session).delete(routes::close_session))
        .route("/languages", get(routes::languages))
        .route("/locales/{code}", get(routes::locale_messages))
        .route("/auth/signup", post(routes::signup))
        .route("/auth/login", post(routes::login))
        .route("/auth/logout", post(routes::logout))
        .route("/auth/password-reset", post(routes::reset_password))
        .route("/auth/password", post(routes::change_password))
        .route("/auth/verify-email", post(routes::verify_email))
        .route("/account", get(routes::account).patch(routes::update_account))
        .route("/history", get(routes::history))
        .route("/history/{id}", delete(routes::delete_history))
        .route("/saved", get(routes::saved).post(routes::save))
        .route("/saved/{id}", delete(routes::unsave))
        .route("/panels/{collection}", get(routes::panel))
        .route("/panels/{collection}/toggle", post(routes::toggle_panel))
        .route("/translate", post(routes::translate))
        .route("/preferences", get(routes::preferences).put(routes::update_preferences))
        .route("/translator/ws", get(ws::translator_ws));

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api)
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn serve_index() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        include_str!("static/index.html"),
    )
}
