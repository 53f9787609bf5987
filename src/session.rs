//! Per-session dashboard state.
//!
//! Each browser session owns one [`DashboardSession`]. Handlers receive it by
//! mutable reference, apply one transition, and render from it. Nothing here is
//! shared between sessions except the read-only [`Table`] passed in.

use crate::analysis::{self, CompanyProfile, RankedSummary};
use crate::error::DashboardError;
use crate::record::{ALL, Party, Table};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Search parameters chosen in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub analysis_type: Party,
    pub min_containers: u64,
    pub category: String,
    pub business: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        FilterCriteria {
            analysis_type: Party::Exporter,
            min_containers: 0,
            category: ALL.to_string(),
            business: ALL.to_string(),
        }
    }
}

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    LoggedOut,
    Overview,
    SearchResults,
    CompanyAnalysis,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardSession {
    authorized: bool,
    criteria: FilterCriteria,
    selected_company: Option<String>,
    has_business_filter: bool,
    search_results: Option<RankedSummary>,
    analysis: Option<CompanyProfile>,
    warnings: Vec<String>,
}

impl DashboardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        if !self.authorized {
            Screen::LoggedOut
        } else if self.analysis.is_some() {
            Screen::CompanyAnalysis
        } else if self.search_results.is_some() {
            Screen::SearchResults
        } else {
            Screen::Overview
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn selected_company(&self) -> Option<&str> {
        self.selected_company.as_deref()
    }

    pub fn search_results(&self) -> Option<&RankedSummary> {
        self.search_results.as_ref()
    }

    pub fn analysis(&self) -> Option<&CompanyProfile> {
        self.analysis.as_ref()
    }

    /// The business-description view layered over the search results, if one
    /// is active.
    pub fn business_results(&self) -> Option<RankedSummary> {
        let summary = self.search_results.as_ref()?;
        if self.has_business_filter && self.criteria.business != ALL {
            Some(analysis::business_filter(summary, &self.criteria.business))
        } else {
            None
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Hand the queued warnings to the renderer.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Successful gate check: LoggedOut → Overview.
    pub fn authorize(&mut self) {
        self.authorized = true;
        self.clear_results();
    }

    pub fn logout(&mut self) {
        *self = DashboardSession::default();
    }

    /// Reset to the overview from any screen.
    ///
    /// Drops both result sets, the company selection and every filter choice.
    /// Authorization is untouched.
    pub fn home(&mut self) {
        self.clear_results();
        self.criteria = FilterCriteria::default();
        self.selected_company = None;
        self.has_business_filter = false;
    }

    /// Switch the role being analysed. A category that does not exist for the
    /// new role falls back to `ALL`.
    pub fn set_analysis_type(&mut self, table: &Table, party: Party) {
        self.criteria.analysis_type = party;
        if self.criteria.category != ALL
            && !analysis::categories(table, party).contains(&self.criteria.category)
        {
            self.criteria.category = ALL.to_string();
        }
    }

    /// Run a company ranking and show it. Entering this screen drops any
    /// company analysis, the company selection and the business filter.
    pub fn search(&mut self, table: &Table, party: Party, category: &str, min_containers: u64) {
        self.set_analysis_type(table, party);
        if category == ALL || analysis::categories(table, party).iter().any(|c| c == category) {
            self.criteria.category = category.to_string();
        } else {
            self.criteria.category = ALL.to_string();
        }
        self.criteria.min_containers = min_containers;
        self.criteria.business = ALL.to_string();
        self.has_business_filter = false;
        self.selected_company = None;
        self.analysis = None;

        let summary = analysis::rank(
            table,
            self.criteria.analysis_type,
            self.criteria.min_containers,
            &self.criteria.category,
        );
        log::info!(
            "search {} category={} min={} -> {} rows",
            self.criteria.analysis_type,
            self.criteria.category,
            self.criteria.min_containers,
            summary.len()
        );
        self.search_results = Some(summary);
    }

    /// Layer a business-description filter over the current search results.
    ///
    /// Only meaningful on the search screen; elsewhere it is ignored.
    pub fn apply_business_filter(&mut self, business: &str) {
        if self.search_results.is_none() {
            return;
        }
        self.criteria.business = business.to_string();
        self.has_business_filter = true;
        if let Some(filtered) = self.business_results() {
            if filtered.is_empty() {
                self.warn("No data matches the selected business description.");
            }
        }
    }

    /// Drill into one company.
    ///
    /// Without a selection, or when the company has no shipments for the
    /// requested role, a warning is queued and neither the screen nor the
    /// criteria change.
    pub fn analyze(
        &mut self,
        table: &Table,
        party: Party,
        company: Option<&str>,
    ) -> Result<(), DashboardError> {
        let Some(company) = company.map(str::trim).filter(|c| !c.is_empty()) else {
            let err = DashboardError::NoCompanySelected(party);
            self.warn(err.to_string());
            return Err(err);
        };

        // Criteria and selection only change once the company is known to exist
        match analysis::company_profile(table, party, company) {
            Ok(profile) => {
                log::info!("analysis of {} {:?}", party, company);
                self.set_analysis_type(table, party);
                self.selected_company = Some(company.to_string());
                self.search_results = None;
                self.has_business_filter = false;
                self.analysis = Some(profile);
                Ok(())
            }
            Err(err) => {
                log::warn!("{}", err);
                self.warn(err.to_string());
                Err(err)
            }
        }
    }

    fn clear_results(&mut self) {
        self.search_results = None;
        self.analysis = None;
    }
}

/// Default lifetime of a session.
pub const SESSION_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on any configured session lifetime.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

struct SessionEntry {
    state: DashboardSession,
    expires_at: SystemTime,
}

/// All live sessions of one application instance, keyed by session id.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    /// Lifetimes above [`MAX_SESSION_TTL`] are clamped to it.
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            ttl: ttl.min(MAX_SESSION_TTL),
        }
    }

    /// Start a new session and return its id.
    pub fn create(&self, state: DashboardSession) -> String {
        let session_id = Uuid::new_v4().to_string();
        let entry = SessionEntry {
            state,
            expires_at: SystemTime::now() + self.ttl,
        };
        self.lock().insert(session_id.clone(), entry);
        session_id
    }

    /// Run `f` against a live session. Expired sessions are removed and treated
    /// as absent.
    pub fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut DashboardSession) -> T,
    ) -> Option<T> {
        let mut sessions = self.lock();
        let now = SystemTime::now();
        let live = sessions.get(session_id)?.expires_at > now;
        if !live {
            sessions.remove(session_id);
            return None;
        }
        sessions.get_mut(session_id).map(|entry| f(&mut entry.state))
    }

    pub fn is_authorized(&self, session_id: &str) -> bool {
        self.with_session(session_id, |s| s.is_authorized())
            .unwrap_or(false)
    }

    pub fn remove(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    /// Drop every expired session.
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::new(SESSION_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ShipmentRecord;

    fn table() -> Table {
        let ship = |exporter: &str, category: &str, business: &str, importer: &str, n: u64| {
            ShipmentRecord {
                exporter: exporter.to_string(),
                exporter_category: category.to_string(),
                exporter_business: business.to_string(),
                importer: importer.to_string(),
                importer_category: "Trade".to_string(),
                importer_business: "Retail".to_string(),
                container_line: "HMM".to_string(),
                containers: n,
                origin_port: "Busan".to_string(),
                destination_port: "Jakarta".to_string(),
            }
        };
        Table::new(vec![
            ship("A", "Steel", "Coil", "X", 10),
            ship("A", "Steel", "Coil", "Y", 30),
            ship("B", "Food", "Snacks", "X", 5),
        ])
    }

    fn logged_in() -> DashboardSession {
        let mut s = DashboardSession::new();
        s.authorize();
        s
    }

    #[test]
    fn starts_logged_out_and_authorize_shows_overview() {
        let mut s = DashboardSession::new();
        assert_eq!(s.screen(), Screen::LoggedOut);
        s.authorize();
        assert_eq!(s.screen(), Screen::Overview);
    }

    #[test]
    fn search_then_business_filter_stays_on_results() {
        let t = table();
        let mut s = logged_in();
        s.search(&t, Party::Exporter, ALL, 0);
        assert_eq!(s.screen(), Screen::SearchResults);
        assert_eq!(s.search_results().unwrap().len(), 2);
        assert!(s.business_results().is_none());

        s.apply_business_filter("Snacks");
        assert_eq!(s.screen(), Screen::SearchResults);
        let filtered = s.business_results().unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows[0].keys[0], "B");
        assert!(s.take_warnings().is_empty());

        s.apply_business_filter("Nothing");
        assert!(s.business_results().unwrap().is_empty());
        assert_eq!(s.take_warnings().len(), 1);
    }

    #[test]
    fn analyze_replaces_search_and_keeps_criteria() {
        let t = table();
        let mut s = logged_in();
        s.search(&t, Party::Exporter, "Steel", 10);
        s.analyze(&t, Party::Exporter, Some("A")).unwrap();

        assert_eq!(s.screen(), Screen::CompanyAnalysis);
        assert!(s.search_results().is_none());
        assert_eq!(s.criteria().category, "Steel");
        assert_eq!(s.criteria().min_containers, 10);
        assert_eq!(s.analysis().unwrap().containers, 40);

        // A new search clears the analysis and the company selection
        s.search(&t, Party::Exporter, ALL, 0);
        assert_eq!(s.screen(), Screen::SearchResults);
        assert!(s.analysis().is_none());
        assert!(s.selected_company().is_none());
    }

    #[test]
    fn unknown_company_warns_without_transition() {
        let t = table();
        let mut s = logged_in();
        s.search(&t, Party::Exporter, ALL, 0);

        let err = s.analyze(&t, Party::Exporter, Some("Nobody")).unwrap_err();
        assert!(matches!(err, DashboardError::NotFound { .. }));
        assert_eq!(s.screen(), Screen::SearchResults);
        assert_eq!(s.take_warnings().len(), 1);

        let err = s.analyze(&t, Party::Exporter, Some("  ")).unwrap_err();
        assert!(matches!(err, DashboardError::NoCompanySelected(Party::Exporter)));
        assert_eq!(s.screen(), Screen::SearchResults);
    }

    #[test]
    fn home_from_company_analysis_returns_to_overview() {
        let t = table();
        let mut s = logged_in();
        s.analyze(&t, Party::Importer, Some("X")).unwrap();
        assert_eq!(s.screen(), Screen::CompanyAnalysis);

        s.home();
        assert_eq!(s.screen(), Screen::Overview);
        assert!(s.analysis().is_none());
        assert!(s.selected_company().is_none());
        assert_eq!(s.criteria(), &FilterCriteria::default());
        assert!(s.is_authorized());
    }

    #[test]
    fn switching_role_resets_unknown_category() {
        let t = table();
        let mut s = logged_in();
        s.search(&t, Party::Exporter, "Steel", 0);
        s.set_analysis_type(&t, Party::Importer);
        assert_eq!(s.criteria().category, ALL);

        s.search(&t, Party::Importer, "Trade", 0);
        assert_eq!(s.criteria().category, "Trade");
        s.search(&t, Party::Importer, "Bogus", 0);
        assert_eq!(s.criteria().category, ALL);
    }

    #[test]
    fn repeated_search_is_deterministic() {
        let t = table();
        let mut s = logged_in();
        s.search(&t, Party::Exporter, ALL, 0);
        let first = s.search_results().cloned();
        s.search(&t, Party::Exporter, ALL, 0);
        assert_eq!(s.search_results().cloned(), first);
    }

    #[test]
    fn sessions_are_isolated_and_expire() {
        let store = SessionStore::default();
        let a = store.create(logged_in());
        let b = store.create(DashboardSession::new());
        assert_ne!(a, b);

        let t = table();
        store.with_session(&a, |s| s.search(&t, Party::Exporter, ALL, 0));
        assert_eq!(store.with_session(&a, |s| s.screen()), Some(Screen::SearchResults));
        assert_eq!(store.with_session(&b, |s| s.screen()), Some(Screen::LoggedOut));
        assert!(store.is_authorized(&a));
        assert!(!store.is_authorized(&b));
        assert!(!store.is_authorized("missing"));

        let short = SessionStore::new(Duration::ZERO);
        let id = short.create(logged_in());
        assert!(short.with_session(&id, |_| ()).is_none());
        assert!(short.is_empty());
    }

    #[test]
    fn failed_analysis_for_other_role_keeps_search_criteria() {
        let t = table();
        let mut s = logged_in();
        s.search(&t, Party::Exporter, "Steel", 10);
        let before = s.criteria().clone();
        let results = s.search_results().cloned();

        assert!(s.analyze(&t, Party::Importer, Some("Nobody")).is_err());
        assert_eq!(s.screen(), Screen::SearchResults);
        assert_eq!(s.criteria(), &before);
        assert_eq!(s.search_results().cloned(), results);
        assert!(s.selected_company().is_none());

        assert!(s.analyze(&t, Party::Importer, None).is_err());
        assert_eq!(s.criteria(), &before);
        assert_eq!(s.take_warnings().len(), 2);
    }

    #[test]
    fn huge_ttl_is_clamped() {
        let store = SessionStore::new(Duration::MAX);
        let id = store.create(logged_in());
        assert!(store.is_authorized(&id));
    }

    #[test]
    fn logout_clears_everything() {
        let t = table();
        let mut s = logged_in();
        s.search(&t, Party::Importer, ALL, 5);
        s.logout();
        assert_eq!(s.screen(), Screen::LoggedOut);
        assert!(s.search_results().is_none());
        assert_eq!(s.criteria(), &FilterCriteria::default());
    }
}
