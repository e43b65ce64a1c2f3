use super::error::AppError;
use crate::auth as auth_service;
use crate::ports::TimeProvider;
use crate::state;
use crate::store::StoreError;
use crate::types::users::User;

use axum::body::Body;
use axum::extract::Form;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::http::Request;
use axum::http::header::SET_COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

const AUTH_ERROR_REDIRECT: &str = "/?authError=true";

/// The signed-in user behind a request, inserted by [`session_middleware`].
#[derive(Debug, Clone)]
pub(crate) struct SessionUser {
    pub(crate) session_id: String,
    pub(crate) user: User,
}

pub(crate) async fn session_middleware(
    State(state): State<state::AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = state
        .cookies
        .session_token(req.headers())
        .map(str::to_string);

    if let Some(session_id) = token {
        let now = state.time.now();
        let lookup_id = session_id.clone();
        let found = state
            .store
            .run(move |store| store.lookup_by_session_id(&lookup_id, now))
            .await;
        match found {
            Ok(Some(user)) => {
                req.extensions_mut().insert(SessionUser { session_id, user });
            }
            Ok(None) => {}
            Err(err) => return AppError::Store(err).into_response(),
        }
    }

    let path = req.uri().path();
    if requires_session(path) && req.extensions().get::<SessionUser>().is_none() {
        return AppError::Unauthorized.into_response();
    }

    next.run(req).await
}

fn requires_session(path: &str) -> bool {
    path == "/ws" || path.starts_with("/api/")
}

#[derive(Debug, Deserialize)]
pub(crate) struct CredentialsForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl CredentialsForm {
    fn is_blank(&self) -> bool {
        self.username.trim().is_empty() || self.password.is_empty()
    }
}

pub(crate) async fn login_submit(
    State(state): State<state::AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    if form.is_blank() {
        return Ok(Redirect::to(AUTH_ERROR_REDIRECT).into_response());
    }
    let username = form.username.trim().to_string();
    let password = form.password;

    let user = state
        .store
        .run(move |store| {
            let user = store.find_user_by_username(&username)?;
            Ok::<_, StoreError>(user.filter(|user| {
                auth_service::verify_password(&password, &user.password_hash)
            }))
        })
        .await?;

    match user {
        Some(user) => start_session(&state, user).await,
        None => {
            tracing::info!("login rejected");
            Ok(Redirect::to(AUTH_ERROR_REDIRECT).into_response())
        }
    }
}

/// Sign in an existing user whose password matches, or create the account.
pub(crate) async fn signup_submit(
    State(state): State<state::AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    if form.is_blank() {
        return Ok(Redirect::to(AUTH_ERROR_REDIRECT).into_response());
    }
    let username = form.username.trim().to_string();
    let password = form.password;
    let now = state.time.now();

    let outcome = state
        .store
        .run(move |store| -> Result<Option<User>, AppError> {
            if let Some(existing) = store.find_user_by_username(&username)? {
                if auth_service::verify_password(&password, &existing.password_hash) {
                    return Ok(Some(existing));
                }
                return Ok(None);
            }
            let password_hash = auth_service::hash_password(&password)?;
            match store.create_user(&username, &password_hash, now) {
                Ok(user) => {
                    tracing::info!(user_id = user.id, "user created");
                    Ok(Some(user))
                }
                Err(StoreError::UsernameTaken) => Ok(None),
                Err(err) => Err(err.into()),
            }
        })
        .await?;

    match outcome {
        Some(user) => start_session(&state, user).await,
        None => {
            tracing::info!("signup rejected");
            Ok(Redirect::to(AUTH_ERROR_REDIRECT).into_response())
        }
    }
}

async fn start_session(state: &state::AppState, user: User) -> Result<Response, AppError> {
    let token = auth_service::generate_session_token();
    let now = state.time.now();
    let ttl = state.config.session.ttl;
    let user_id = user.id;
    let session_id = token.clone();
    state
        .store
        .run(move |store| store.create_session(user_id, &session_id, now, ttl))
        .await?;
    tracing::info!(user_id, "session started");

    let mut response = Redirect::to("/").into_response();
    let cookie = state.cookies.session_cookie(&token);
    response
        .headers_mut()
        .append(SET_COOKIE, HeaderValue::from_str(&cookie)?);
    Ok(response)
}

pub(crate) async fn logout(
    State(state): State<state::AppState>,
    session: Option<axum::Extension<SessionUser>>,
) -> Result<Response, AppError> {
    if let Some(axum::Extension(session)) = session {
        let session_id = session.session_id.clone();
        state
            .store
            .run(move |store| store.delete_session(&session_id))
            .await?;
        tracing::info!(user_id = session.user.id, "session ended");
    }

    let mut response = Redirect::to("/").into_response();
    let cookie = state.cookies.clear_cookie();
    response
        .headers_mut()
        .append(SET_COOKIE, HeaderValue::from_str(&cookie)?);
    Ok(response)
}
