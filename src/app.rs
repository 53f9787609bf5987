use axum::{
    Extension, Form, Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use handlebars::TemplateError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::analysis::{self, CompanyProfile, Overview, RankedSummary};
use crate::cache::DatasetCache;
use crate::config::Config;
use crate::downloader;
use crate::error::DataLoadError;
use crate::login::{self, Gatekeeper, SESSION_COOKIE, SessionId};
use crate::record::{ALL, Party, Table};
use crate::session::{DashboardSession, FilterCriteria, Screen, SessionStore};
use crate::views::Views;

/// State shared by every request of one server instance.
pub struct AppState {
    pub dataset: DatasetCache,
    pub sessions: SessionStore,
    pub gatekeeper: Gatekeeper,
    pub views: Views,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, TemplateError> {
        Ok(AppState {
            dataset: DatasetCache::new(&config.data_path),
            sessions: SessionStore::new(config.session_ttl),
            gatekeeper: Gatekeeper::new(config.allowed_ids.iter().cloned()),
            views: Views::new()?,
        })
    }

    /// State around an already prepared dataset cache.
    pub fn with_dataset(
        dataset: DatasetCache,
        gatekeeper: Gatekeeper,
        sessions: SessionStore,
    ) -> Result<Self, TemplateError> {
        Ok(AppState {
            dataset,
            sessions,
            gatekeeper,
            views: Views::new()?,
        })
    }
}

#[derive(Deserialize)]
struct SearchForm {
    analysis_type: String,
    #[serde(default = "all")]
    category: String,
    #[serde(default)]
    min_containers: u64,
}

#[derive(Deserialize)]
struct BusinessForm {
    #[serde(default = "all")]
    business: String,
}

#[derive(Deserialize)]
struct AnalyzeForm {
    analysis_type: String,
    #[serde(default)]
    company: Option<String>,
}

#[derive(Deserialize)]
struct CompaniesQuery {
    #[serde(default)]
    analysis_type: Option<String>,
    #[serde(default = "all")]
    category: String,
}

#[derive(Deserialize)]
struct ExportQuery {
    #[serde(default = "csv")]
    format: String,
}

fn all() -> String {
    ALL.to_string()
}

fn csv() -> String {
    "csv".to_string()
}

/// JSON view of one session's screen.
#[derive(Serialize)]
struct StateSnapshot<'a> {
    screen: Screen,
    criteria: &'a FilterCriteria,
    selected_company: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overview: Option<Overview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_results: Option<&'a RankedSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    business_results: Option<RankedSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<&'a CompanyProfile>,
    warnings: Vec<String>,
}

/// Build the application router.
///
/// Dashboard actions and the JSON API sit behind [`login::require_auth`];
/// `/`, `/login` and `/logout` are reachable without a session.
pub fn router(state: Arc<AppState>, static_dir: impl AsRef<Path>) -> Router {
    let protected = Router::new()
        .route("/search", post(handle_search))
        .route("/business", post(handle_business))
        .route("/analyze", post(handle_analyze))
        .route("/home", post(handle_home))
        .route("/api/state", get(get_state))
        .route("/api/companies", get(get_companies))
        .route("/api/export", get(export_results))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_auth,
        ));

    Router::new()
        .route("/", get(serve_dashboard))
        .route("/login", post(login::handle_login))
        .route("/logout", post(login::handle_logout))
        .merge(protected)
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(&config)?);

    // Warm the cache so a broken dataset shows up in the log at startup
    if let Err(e) = state.dataset.load() {
        log::warn!("dataset not available yet: {}", e);
    }

    let app = router(state, &config.static_dir);

    let listener = TcpListener::bind(config.bind).await?;
    log::info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

fn data_error_page(state: &AppState, err: &DataLoadError) -> Response {
    match state.views.error(&err.to_string()) {
        Ok(page) => (StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response(),
        Err(e) => {
            log::error!("failed to render error page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

fn parse_party(value: &str) -> Result<Party, Response> {
    Party::parse(value).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("unknown analysis type: {}", value),
        )
            .into_response()
    })
}

/// Load the table, apply one transition to the caller's session and send the
/// browser back to `/`.
fn transition<F>(state: &AppState, session_id: &str, f: F) -> Response
where
    F: FnOnce(&mut DashboardSession, &Table),
{
    let table = match state.dataset.load() {
        Ok(table) => table,
        Err(e) => return data_error_page(state, &e),
    };
    state.sessions.with_session(session_id, |s| f(s, &*table));
    Redirect::to("/").into_response()
}

/// Render the current screen
///
/// A `home` query parameter resets the session to the overview before
/// anything else happens. Without an authorized session the login page is
/// shown. A dataset failure replaces the whole dashboard with an error page.
async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    if params.contains_key("home") {
        if let Some(id) = &session_id {
            state.sessions.with_session(id, |s| s.home());
        }
    }

    let Some(session_id) = session_id.filter(|id| state.sessions.is_authorized(id)) else {
        return login::render_login(&state, &[]);
    };

    let table = match state.dataset.load() {
        Ok(table) => table,
        Err(e) => return data_error_page(&state, &e),
    };

    let rendered = state.sessions.with_session(&session_id, |s| {
        let warnings = s.take_warnings();
        state.views.dashboard(s, &table, &warnings)
    });

    match rendered {
        Some(Ok(page)) => Html(page).into_response(),
        Some(Err(e)) => {
            log::error!("failed to render dashboard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
        // Session expired between the checks above
        None => login::render_login(&state, &[]),
    }
}

async fn handle_search(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Form(form): Form<SearchForm>,
) -> Response {
    let party = match parse_party(&form.analysis_type) {
        Ok(party) => party,
        Err(response) => return response,
    };
    transition(&state, &session_id, |s, table| {
        s.search(table, party, &form.category, form.min_containers)
    })
}

async fn handle_business(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Form(form): Form<BusinessForm>,
) -> Response {
    transition(&state, &session_id, |s, _| {
        s.apply_business_filter(&form.business)
    })
}

async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Form(form): Form<AnalyzeForm>,
) -> Response {
    let party = match parse_party(&form.analysis_type) {
        Ok(party) => party,
        Err(response) => return response,
    };
    transition(&state, &session_id, |s, table| {
        // Failures are queued as warnings on the session
        let _ = s.analyze(table, party, form.company.as_deref());
    })
}

async fn handle_home(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Redirect {
    state.sessions.with_session(&session_id, |s| s.home());
    Redirect::to("/")
}

/// JSON snapshot of the caller's screen. Queued warnings are drained.
async fn get_state(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Response {
    let table = match state.dataset.load() {
        Ok(table) => table,
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({
                "error": e.to_string(),
            })))
                .into_response();
        }
    };

    let snapshot = state.sessions.with_session(&session_id, |s| {
        let warnings = s.take_warnings();
        let screen = s.screen();
        serde_json::to_value(StateSnapshot {
            screen,
            criteria: s.criteria(),
            selected_company: s.selected_company(),
            overview: (screen == Screen::Overview).then(|| analysis::overview(&table)),
            search_results: s.search_results(),
            business_results: s.business_results(),
            analysis: s.analysis(),
            warnings,
        })
    });

    match snapshot {
        Some(Ok(value)) => Json(value).into_response(),
        Some(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

/// Picker options for the company selector: categories of the role and the
/// companies within the chosen category.
async fn get_companies(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Query(query): Query<CompaniesQuery>,
) -> Response {
    let party = match query.analysis_type.as_deref() {
        Some(value) => match parse_party(value) {
            Ok(party) => party,
            Err(response) => return response,
        },
        None => state
            .sessions
            .with_session(&session_id, |s| s.criteria().analysis_type)
            .unwrap_or_default(),
    };

    let table = match state.dataset.load() {
        Ok(table) => table,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    let categories = analysis::categories(&table, party);
    let category = if query.category == ALL || categories.contains(&query.category) {
        query.category
    } else {
        all()
    };
    let companies = analysis::companies(&table, party, &category);

    Json(serde_json::json!({
        "analysis_type": party,
        "category": category,
        "categories": categories,
        "companies": companies,
    }))
    .into_response()
}

/// Download the current search results (with the business filter applied
/// when one is active) as CSV or XLSX.
async fn export_results(
    State(state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let current = state.sessions.with_session(&session_id, |s| {
        let summary = s.business_results().or_else(|| s.search_results().cloned())?;
        Some((summary, s.criteria().clone()))
    });

    let Some(Some((summary, criteria))) = current else {
        return (StatusCode::NOT_FOUND, "No search results to export").into_response();
    };

    let party = criteria.analysis_type;
    let mut stem = format!("{}_ranking", party.label());
    if criteria.category != ALL {
        stem.push('_');
        stem.push_str(&criteria.category);
    }

    let (body, content_type, extension) = match query.format.as_str() {
        "csv" => (
            downloader::to_csv(&summary, party).into_bytes(),
            "text/csv; charset=utf-8",
            "csv",
        ),
        "xlsx" => match downloader::to_xlsx(&summary, party) {
            Ok(bytes) => (
                bytes,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                "xlsx",
            ),
            Err(e) => {
                log::error!("{}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
            }
        },
        other => {
            return (
                StatusCode::BAD_REQUEST,
                format!("unsupported export format: {}", other),
            )
                .into_response();
        }
    };

    let disposition = format!(
        "attachment; filename=\"{}.{}\"; filename*=UTF-8''{}.{}",
        party.label(),
        extension,
        urlencoding::encode(&stem),
        extension
    );

    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
