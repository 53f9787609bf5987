//! Allow-list gate and session cookie handling.
//!
//! The gate is a plain membership test on a user id. There is no password,
//! hashing, rate limiting or lockout; it keeps casual visitors out and nothing
//! more.

#[cfg(feature = "web")]
use crate::app::AppState;
#[cfg(feature = "web")]
use crate::session::DashboardSession;
#[cfg(feature = "web")]
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
#[cfg(feature = "web")]
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use std::collections::HashSet;
#[cfg(feature = "web")]
use std::sync::Arc;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "session";

pub const UNREGISTERED_WARNING: &str = "Unregistered ID. Please contact the administrator.";

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized,
    Rejected,
}

/// Static list of ids allowed into the dashboard.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    allowed: HashSet<String>,
}

impl Gatekeeper {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Gatekeeper {
            allowed: ids
                .into_iter()
                .map(|id| {
                    let id: String = id.into();
                    id.trim().to_string()
                })
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    /// Check a submitted id against the allow-list. Surrounding whitespace is
    /// ignored; the comparison is otherwise exact.
    pub fn authenticate(&self, submitted_id: &str) -> AuthOutcome {
        let id = submitted_id.trim();
        if !id.is_empty() && self.allowed.contains(id) {
            AuthOutcome::Authorized
        } else {
            AuthOutcome::Rejected
        }
    }
}

/// Login form data
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub user_id: String,
}

// Web handler functions below (only compiled with "web" feature)

/// Handle login submissions
///
/// On success the session is marked authorized (a new one is created when the
/// browser has none) and the browser is sent to the dashboard. A non-empty
/// unknown id re-renders the login page with a warning; an empty one just
/// re-renders it.
///
/// # Arguments
/// * `state` - Shared application state
/// * `jar` - Cookie jar holding the session cookie
/// * `form` - Submitted user id
///
/// # Returns
/// * `Response` - Redirect to `/` or the login page
#[cfg(feature = "web")]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.gatekeeper.authenticate(&form.user_id) {
        AuthOutcome::Authorized => {
            log::info!("login accepted for {:?}", form.user_id.trim());
            let existing = jar
                .get(SESSION_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|id| state.sessions.with_session(id, |s| s.authorize()).is_some());

            let session_id = match existing {
                Some(id) => id,
                None => {
                    let purged = state.sessions.purge_expired();
                    if purged > 0 {
                        log::debug!("purged {} expired session(s)", purged);
                    }
                    let mut session = DashboardSession::new();
                    session.authorize();
                    state.sessions.create(session)
                }
            };

            (jar.add(session_cookie(session_id)), Redirect::to("/")).into_response()
        }
        AuthOutcome::Rejected => {
            let warnings = if form.user_id.trim().is_empty() {
                Vec::new()
            } else {
                log::warn!("login rejected for {:?}", form.user_id.trim());
                vec![UNREGISTERED_WARNING.to_string()]
            };
            render_login(&state, &warnings)
        }
    }
}

/// Handle user logout
///
/// Forgets the server-side session and clears the cookie.
#[cfg(feature = "web")]
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    (jar.remove(removal), Redirect::to("/"))
}

/// Authentication middleware
///
/// Lets the request through when it carries the cookie of an authorized,
/// unexpired session, storing the session id in the request extensions.
/// Everything else is sent back to `/`, which shows the login page.
#[cfg(feature = "web")]
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    if let Some(session_cookie) = jar.get(SESSION_COOKIE) {
        let session_id = session_cookie.value().to_string();
        if state.sessions.is_authorized(&session_id) {
            request.extensions_mut().insert(SessionId(session_id));
            return next.run(request).await;
        }
    }

    Redirect::to("/").into_response()
}

/// Id of the authenticated session, placed in request extensions by
/// [`require_auth`].
#[cfg(feature = "web")]
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

#[cfg(feature = "web")]
fn session_cookie(session_id: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie
}

#[cfg(feature = "web")]
pub(crate) fn render_login(state: &AppState, warnings: &[String]) -> Response {
    match state.views.login(warnings) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            log::error!("failed to render login page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}
