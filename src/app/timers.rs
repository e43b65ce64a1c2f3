use super::auth::SessionUser;
use super::error::AppError;
use crate::live::present;
use crate::ports::TimeProvider;
use crate::state;
use crate::templates;
use crate::types::live::TimerView;
use crate::types::timers::TimerId;

use axum::Extension;
use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use serde::{Deserialize, Serialize};

pub(crate) const MAX_DESCRIPTION_CHARS: usize = 255;

#[derive(Debug, Deserialize)]
pub(crate) struct BoardQuery {
    #[serde(rename = "authError")]
    auth_error: Option<String>,
}

pub(crate) async fn timer_board(
    State(state): State<state::AppState>,
    session: Option<Extension<SessionUser>>,
    Query(query): Query<BoardQuery>,
) -> templates::IndexTemplate {
    let auth_error = match query.auth_error.as_deref() {
        None | Some("") => String::new(),
        Some("true") => "Wrong username or password".to_string(),
        Some(other) => other.to_string(),
    };
    templates::IndexTemplate {
        app_name: state.config.app_name,
        username: session.map(|Extension(session)| session.user.username),
        auth_error,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    active: Option<bool>,
}

pub(crate) async fn timer_list(
    State(state): State<state::AppState>,
    Extension(session): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TimerView>>, AppError> {
    let user_id = session.user.id;
    let timers = state
        .store
        .run(move |store| store.list_by_user(user_id, query.active))
        .await?;
    Ok(Json(present::present_timers(&timers, state.time.now())))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateTimerRequest {
    description: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatedTimer {
    id: TimerId,
    description: String,
}

pub(crate) async fn timer_create(
    State(state): State<state::AppState>,
    Extension(session): Extension<SessionUser>,
    Json(request): Json<CreateTimerRequest>,
) -> Result<Json<CreatedTimer>, AppError> {
    if request.description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::BadRequest("description is too long"));
    }
    let user_id = session.user.id;
    let now = state.time.now();
    let timer = state
        .store
        .run(move |store| store.create_timer(user_id, &request.description, now))
        .await?;
    tracing::info!(user_id, timer_id = timer.id, "timer started");

    state.dispatcher.notify(user_id);
    Ok(Json(CreatedTimer {
        id: timer.id,
        description: timer.description,
    }))
}

#[derive(Debug, Serialize)]
pub(crate) struct StoppedTimer {
    id: TimerId,
}

pub(crate) async fn timer_stop(
    State(state): State<state::AppState>,
    Extension(session): Extension<SessionUser>,
    Path(timer_id): Path<TimerId>,
) -> Result<Json<StoppedTimer>, AppError> {
    let user_id = session.user.id;
    let now = state.time.now();
    let stopped = state
        .store
        .run(move |store| store.stop_timer(user_id, timer_id, now))
        .await?;
    let Some(timer) = stopped else {
        return Err(AppError::NotFound);
    };
    tracing::info!(user_id, timer_id, "timer stopped");

    state.dispatcher.notify(user_id);
    Ok(Json(StoppedTimer { id: timer.id }))
}
