//! HTML pages built from session state with handlebars templates.

use crate::analysis::{self, CONTAINER_THRESHOLDS, CompanyProfile, Overview, RankedSummary, key};
use crate::record::{ALL, Party, Table};
use crate::session::{DashboardSession, Screen};
use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;
use serde_json::{Value, json};

/// Template registry for every page the dashboard serves.
pub struct Views {
    registry: Handlebars<'static>,
}

/// A rendered table: header labels plus pre-formatted cells.
#[derive(Debug, Serialize)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

impl Views {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_partial("table", include_str!("./static/table.hbs"))?;
        registry.register_partial("header", include_str!("./static/header.hbs"))?;
        registry.register_template_string("login", include_str!("./static/login.hbs"))?;
        registry.register_template_string("error", include_str!("./static/error.hbs"))?;
        registry.register_template_string("dashboard", include_str!("./static/dashboard.hbs"))?;
        Ok(Views { registry })
    }

    pub fn login(&self, warnings: &[String]) -> Result<String, RenderError> {
        self.registry
            .render("login", &json!({ "warnings": warnings }))
    }

    pub fn error(&self, message: &str) -> Result<String, RenderError> {
        self.registry.render("error", &json!({ "message": message }))
    }

    /// Render whichever screen the session is on.
    pub fn dashboard(
        &self,
        session: &DashboardSession,
        table: &Table,
        warnings: &[String],
    ) -> Result<String, RenderError> {
        let mut context = json!({
            "warnings": warnings,
            "sidebar": sidebar(session, table),
        });

        let content = match session.screen() {
            Screen::SearchResults => ("search", search_context(session)),
            Screen::CompanyAnalysis => match session.analysis() {
                Some(profile) => ("analysis", analysis_context(profile)),
                None => ("overview", overview_context(&analysis::overview(table))),
            },
            _ => ("overview", overview_context(&analysis::overview(table))),
        };
        context[content.0] = content.1;

        self.registry.render("dashboard", &context)
    }
}

/// Format a count with thousands separators.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl TableView {
    /// Lay out a ranked summary. `party` names the role `name` columns refer to.
    pub fn from_summary(summary: &RankedSummary, party: Party) -> Self {
        let headers = summary.headers(party);
        let rows = summary
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.rank.to_string()];
                cells.extend(row.keys.iter().cloned());
                cells.push(thousands(row.containers));
                if let Some(share) = row.share {
                    cells.push(format!("{:.1}", share));
                }
                cells
            })
            .collect();

        TableView { headers, rows }
    }
}

fn options<I>(values: I, selected: &str) -> Vec<SelectOption>
where
    I: IntoIterator<Item = (String, String)>,
{
    values
        .into_iter()
        .map(|(value, label)| SelectOption {
            selected: value == selected,
            value,
            label,
        })
        .collect()
}

fn sidebar(session: &DashboardSession, table: &Table) -> Value {
    let criteria = session.criteria();
    let party = criteria.analysis_type;

    let types = options(
        [Party::Exporter, Party::Importer]
            .into_iter()
            .map(|p| (p.label().to_string(), p.title().to_string())),
        party.label(),
    );

    let categories = options(
        std::iter::once(ALL.to_string())
            .chain(analysis::categories(table, party))
            .map(|c| (c.clone(), c)),
        &criteria.category,
    );

    let thresholds = options(
        CONTAINER_THRESHOLDS
            .iter()
            .map(|n| (n.to_string(), thousands(*n))),
        &criteria.min_containers.to_string(),
    );

    let companies = options(
        analysis::companies(table, party, &criteria.category)
            .into_iter()
            .map(|c| (c.clone(), c)),
        session.selected_company().unwrap_or_default(),
    );

    json!({
        "party": party.title(),
        "analysis_type": party.label(),
        "types": types,
        "categories": categories,
        "thresholds": thresholds,
        "companies": companies,
    })
}

fn overview_context(overview: &Overview) -> Value {
    json!({
        "records": thousands(overview.records as u64),
        "exporters": thousands(overview.exporters as u64),
        "importers": thousands(overview.importers as u64),
        "containers": thousands(overview.containers),
        "container_lines": overview.container_lines,
        "lines": TableView::from_summary(&overview.line_ranking, Party::Exporter),
    })
}

fn search_context(session: &DashboardSession) -> Value {
    let criteria = session.criteria();
    let party = criteria.analysis_type;
    let empty = RankedSummary {
        columns: Vec::new(),
        rows: Vec::new(),
    };
    let summary = session.search_results().unwrap_or(&empty);

    let businesses = options(
        std::iter::once(ALL.to_string())
            .chain(analysis::business_descriptions(summary))
            .map(|b| (b.clone(), b)),
        &criteria.business,
    );

    let business = session.business_results().map(|filtered| {
        json!({
            "name": criteria.business,
            "count": filtered.len(),
            "containers": thousands(filtered.total_containers()),
            "table": TableView::from_summary(&filtered, party),
            "empty": filtered.is_empty(),
        })
    });

    let category = if criteria.category == ALL {
        "All"
    } else {
        criteria.category.as_str()
    };

    json!({
        "party": party.title(),
        "category": category,
        "min_containers": thousands(criteria.min_containers),
        "count": summary.len(),
        "containers": thousands(summary.total_containers()),
        "empty": summary.is_empty(),
        "table": TableView::from_summary(summary, party),
        "businesses": businesses,
        "business": business,
    })
}

fn analysis_context(profile: &CompanyProfile) -> Value {
    let party = profile.party;
    json!({
        "company": profile.company,
        "party": party.title(),
        "partner": party.partner().title(),
        "category": profile.category,
        "business": profile.business,
        "records": thousands(profile.records as u64),
        "containers": thousands(profile.containers),
        "partners": profile.partners,
        "container_lines": profile.container_lines,
        "partner_table": TableView::from_summary(&profile.partner_summary, party),
        "route_table": TableView::from_summary(&profile.route_summary, party),
        "line_table": TableView::from_summary(&profile.line_summary, party),
    })
}
