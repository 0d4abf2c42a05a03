mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;
use crate::handlers::*;
use crate::state::{load_config, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Optional TOML file layered between defaults and the environment.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides server.host / server.port.
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let state = match AppState::from_config(config) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            error!(error = %err, "refusing to start");
            return Err(err.into());
        }
    };

    let listen = match args.listen {
        Some(addr) => addr,
        None => state.config.listen_addr().parse()?,
    };
    let app = build_router(state)?;

    info!("bondvault-server listening on {}", listen);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Result<Router, AppError> {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/admin/login", post(login))
        .route("/admin/verify", post(login).get(verify))
        .route("/bonds", get(list_bonds))
        .route("/contact", post(contact));

    let admin_routes = Router::new()
        .route("/bonds", post(create_bond))
        .route("/bonds/:id", put(update_bond).delete(delete_bond))
        .route("/bonds/upload", post(upload_bonds))
        .route("/bonds/export", get(export_bonds))
        .route("/messages", get(list_messages))
        .route("/messages/:id", delete(delete_message))
        .route("/messages/export", get(export_messages))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    let cors = cors_layer(&state)?;
    Ok(Router::new()
        .nest("/api", public_routes.merge(admin_routes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn cors_layer(state: &AppState) -> Result<CorsLayer, AppError> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([
            HeaderName::from_static("x-total-count"),
            header::CONTENT_DISPOSITION,
        ]);
    match state.config.allowed_origin() {
        Some(origin) => {
            let origin = HeaderValue::from_str(&origin)
                .map_err(|err| AppError::internal(format!("invalid cors origin: {err}")))?;
            Ok(cors.allow_origin(origin).allow_credentials(true))
        }
        None => {
            warn!("cors allows any origin");
            Ok(cors.allow_origin(Any))
        }
    }
}
