//! HTTP surface of the attendance store.
//!
//! | Method | Path | Answer |
//! |---|---|---|
//! | POST | `/signup` | `User registered` or `Email already exists` |
//! | POST | `/login` | `Login success`, `User not found` or `Wrong password` |
//! | GET | `/attendance[?date=YYYY-MM-DD]` | JSON mapping of student name to record |
//! | POST | `/attendance[?date=YYYY-MM-DD]` | `Attendance saved successfully`, or 500 with the error text |
//! | GET | `/health` | version and workspace path |
//!
//! The GET on `/attendance` answers `{}` when the store fails, unless the
//! server runs with `ATTENDANCE_ON_LOAD_ERROR=propagate`.
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub mod error;
pub mod routes;
pub mod state;

use crate::config::Config;
use routes::{
    get_attendance_handler, health_handler, login_handler, save_attendance_handler,
    signup_handler,
};
pub use state::State;

pub fn build_router(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
        .route(
            "/attendance",
            get(get_attendance_handler).post(save_attendance_handler),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    info!("Opening workspace {}", config.workspace.to_string_lossy());
    let state = State::open(config)?;

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;

    serve_on(listener, state, shutdown_signal()).await?;

    info!("Server shutting down...");
    Ok(())
}

/// Serves on an already bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    state: Arc<State>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let local: SocketAddr = listener.local_addr()?;
    info!("Server running on http://{local}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
