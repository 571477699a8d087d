//! Backend for a browser-based color-cycle preference survey.
//!
//! The server shows a participant two randomly generated color cycles and
//! records which one (and which presentation order) they prefer. There is
//! no server-side session table: each participant's entire state rides in
//! an encrypted, authenticated cookie, so any number of instances can serve
//! requests without coordination.
//!
//! # Request flow
//!
//! - No cookie yet: the client is prompted to complete the one-time intake
//!   questionnaire (consent plus a few fixed-vocabulary questions).
//! - Valid intake: a fresh session begins and the first stimulus is issued.
//! - Each subsequent POST echoes the previous stimulus back along with the
//!   participant's picks. The echo must byte-match the fingerprint stored
//!   in the cookie or the answer is discarded as a replay/tamper attempt.
//! - Either way a new stimulus is generated, its fingerprint replaces the
//!   old one in the cookie, and the question JSON is returned.
//!
//! # Anti-tamper design
//!
//! The expected answer is never trusted from client state alone. The cookie
//! is AES-GCM encrypted and authenticated (`axum-extra`'s private jar), so a
//! client cannot forge its pick counter or the pending fingerprint. A page
//! reload re-serves the pending stimulus by decoding the stored fingerprint
//! rather than generating a new question.
//!
//! Accepted picks and rejected submissions are appended as structured JSON
//! records to a results log for offline analysis. Client addresses are
//! anonymized before they reach any log record.
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;

pub mod config;
pub mod error;
pub mod intake;
pub mod palette;
pub mod routes;
pub mod session;
pub mod state;
pub mod stimulus;
pub mod telemetry;
pub mod verify;

use config::Config;
use routes::{question_handler, reset_handler, submit_handler};
use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/colors", get(question_handler).post(submit_handler))
        .route("/colors/new", get(reset_handler).post(reset_handler))
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    let config = Config::load();
    let _log_guard = telemetry::init(&config);

    info!("Initializing state...");
    let state = AppState::new(config);

    info!("Starting server...");
    let app = app(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
