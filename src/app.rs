use crate::assets;
use crate::state;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use tower_http::trace::TraceLayer;

mod auth;
mod error;
mod live;
mod timers;

pub fn app(state: state::AppState) -> Router {
    Router::new()
        .route("/", get(timers::timer_board))
        .route("/login", post(auth::login_submit))
        .route("/signup", post(auth::signup_submit))
        .route("/logout", get(auth::logout).post(auth::logout))
        .route(
            "/api/timers",
            get(timers::timer_list).post(timers::timer_create),
        )
        .route("/api/timers/{id}/stop", post(timers::timer_stop))
        .route("/ws", get(live::live_socket))
        .route("/static/style.css", get(assets::stylesheet))
        .route("/static/app.js", get(assets::app_script))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state,
            auth::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
