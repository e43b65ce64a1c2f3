use askama::Template;
use askama_web::WebTemplate;

/// Sign-in page for visitors, live timer board for signed-in users.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) app_name: String,
    pub(crate) username: Option<String>,
    pub(crate) auth_error: String,
}
