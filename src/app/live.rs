use super::auth::SessionUser;
use crate::live;
use crate::state;

use axum::Extension;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;

pub(crate) async fn live_socket(
    State(state): State<state::AppState>,
    Extension(session): Extension<SessionUser>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = session.user.id;
    tracing::debug!(user_id, "live connection upgrade");
    ws.on_upgrade(move |socket| {
        live::run_connection(
            socket,
            state.scheduler,
            state.connections,
            session.session_id,
            user_id,
        )
    })
}
