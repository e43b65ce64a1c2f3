use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;

const CSS_CONTENT: &str = include_str!("../static/style.css");
const APP_JS_CONTENT: &str = include_str!("../static/app.js");

pub(crate) async fn stylesheet() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/css"),
            (CACHE_CONTROL, "public, max-age=3600"),
        ],
        CSS_CONTENT,
    )
}

pub(crate) async fn app_script() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "application/javascript"),
            (CACHE_CONTROL, "no-cache"),
        ],
        APP_JS_CONTENT,
    )
}
