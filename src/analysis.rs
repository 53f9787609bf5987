//! Rankings and drill-downs over the shipment table.
//!
//! Everything here is a pure function of its inputs: calling any of them twice
//! with the same table and parameters gives identical results.

use crate::error::{DashboardError, Result};
use crate::record::{ALL, Party, ShipmentRecord, Table, distinct_values, is_missing};
use serde::Serialize;
use std::collections::BTreeMap;

/// Minimum-container thresholds offered by the search form.
pub const CONTAINER_THRESHOLDS: [u64; 8] = [0, 10, 50, 100, 500, 1000, 5000, 10000];

/// Key column labels used by the summaries below.
pub mod key {
    pub const NAME: &str = "name";
    pub const CATEGORY: &str = "category";
    pub const BUSINESS: &str = "business";
    pub const PARTNER: &str = "partner";
    pub const ORIGIN_PORT: &str = "origin_port";
    pub const DESTINATION_PORT: &str = "destination_port";
    pub const CONTAINER_LINE: &str = "container_line";
}

/// Human-readable heading for a key column. `name` columns refer to `party`,
/// `partner` columns to its counterpart.
pub fn column_title(column: &str, party: Party) -> String {
    match column {
        key::NAME => party.title().to_string(),
        key::PARTNER => party.partner().title().to_string(),
        key::CATEGORY => "Category".to_string(),
        key::BUSINESS => "Business".to_string(),
        key::ORIGIN_PORT => "Origin port".to_string(),
        key::DESTINATION_PORT => "Destination port".to_string(),
        key::CONTAINER_LINE => "Container line".to_string(),
        other => other.to_string(),
    }
}

/// One ranked group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    /// 1-based position in descending container order
    pub rank: usize,
    /// Group key values, aligned with `RankedSummary::columns`
    pub keys: Vec<String>,
    pub containers: u64,
    /// Percentage of the summary's container total, one decimal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<f64>,
}

/// Grouped container totals sorted by volume, with a rank column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSummary {
    pub columns: Vec<&'static str>,
    pub rows: Vec<RankedRow>,
}

impl RankedSummary {
    fn new(columns: &[&'static str], rows: Vec<RankedRow>) -> Self {
        RankedSummary {
            columns: columns.to_vec(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_containers(&self) -> u64 {
        total(self.rows.iter().map(|r| r.containers))
    }

    /// Whether any row carries a share value.
    pub fn has_shares(&self) -> bool {
        self.rows.iter().any(|r| r.share.is_some())
    }

    /// Display headings: rank, the key columns, containers and, when present,
    /// the share column.
    pub fn headers(&self, party: Party) -> Vec<String> {
        let mut headers = vec!["Rank".to_string()];
        headers.extend(self.columns.iter().map(|c| column_title(c, party)));
        headers.push("Containers".to_string());
        if self.has_shares() {
            headers.push("Share (%)".to_string());
        }
        headers
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == label)
    }

    /// Values of one key column in rank order.
    pub fn column_values(&self, label: &str) -> Vec<&str> {
        match self.column_index(label) {
            Some(idx) => self
                .rows
                .iter()
                .filter_map(|r| r.keys.get(idx).map(String::as_str))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Fill the share column from the summary's own total.
    fn with_shares(mut self) -> Self {
        let total = self.total_containers();
        for row in &mut self.rows {
            row.share = Some(percentage(row.containers, total));
        }
        self
    }
}

/// `part / total * 100`, rounded to one decimal with ties to even. A zero
/// total gives 0.0.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = part as f64 / total as f64 * 100.0;
    (pct * 10.0).round_ties_even() / 10.0
}

/// Container total that stops at `u64::MAX` instead of overflowing.
pub fn total<I: IntoIterator<Item = u64>>(counts: I) -> u64 {
    counts.into_iter().fold(0u64, u64::saturating_add)
}

/// Group `records` by `key`, sum containers, drop groups below `min_containers`,
/// and rank the rest.
///
/// Groups are formed in key order and the sort is stable, so equal totals keep
/// key order. A `None` key (some component missing) drops the record.
fn group_and_rank<'a, I, K>(records: I, key: K, min_containers: u64) -> Vec<RankedRow>
where
    I: IntoIterator<Item = &'a ShipmentRecord>,
    K: Fn(&ShipmentRecord) -> Option<Vec<String>>,
{
    let mut groups: BTreeMap<Vec<String>, u64> = BTreeMap::new();
    for record in records {
        if let Some(k) = key(record) {
            let sum = groups.entry(k).or_insert(0);
            *sum = sum.saturating_add(record.containers);
        }
    }

    let mut rows: Vec<(Vec<String>, u64)> = groups
        .into_iter()
        .filter(|(_, containers)| *containers >= min_containers)
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    rows.into_iter()
        .enumerate()
        .map(|(i, (keys, containers))| RankedRow {
            rank: i + 1,
            keys,
            containers,
            share: None,
        })
        .collect()
}

fn present(values: &[&str]) -> Option<Vec<String>> {
    if values.iter().any(|v| is_missing(v)) {
        None
    } else {
        Some(values.iter().map(|v| v.to_string()).collect())
    }
}

fn party_key(party: Party) -> impl Fn(&ShipmentRecord) -> Option<Vec<String>> {
    move |r: &ShipmentRecord| present(&[r.name(party), r.category(party), r.business(party)])
}

/// Rank every company of one role by total containers.
///
/// Restricts to `category` unless it is `"ALL"`, groups by (name, category,
/// business description) and keeps groups with at least `min_containers`.
/// An empty result is not an error.
pub fn rank(table: &Table, party: Party, min_containers: u64, category: &str) -> RankedSummary {
    let rows = group_and_rank(
        table
            .iter()
            .filter(|r| category == ALL || r.category(party) == category),
        party_key(party),
        min_containers,
    );
    RankedSummary::new(&[key::NAME, key::CATEGORY, key::BUSINESS], rows)
}

/// Restrict a company ranking to one business description.
///
/// Ranks are kept as the parent summary assigned them. `"ALL"` returns the
/// summary unchanged.
pub fn business_filter(summary: &RankedSummary, business: &str) -> RankedSummary {
    if business == ALL {
        return summary.clone();
    }
    let rows = match summary.column_index(key::BUSINESS) {
        Some(idx) => summary
            .rows
            .iter()
            .filter(|r| r.keys.get(idx).map(String::as_str) == Some(business))
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    RankedSummary {
        columns: summary.columns.clone(),
        rows,
    }
}

/// Drill-down for one company.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyProfile {
    pub party: Party,
    pub company: String,
    /// Taken from the first matching record in file order
    pub category: String,
    pub business: String,
    pub records: usize,
    pub containers: u64,
    pub partners: usize,
    pub container_lines: usize,
    /// Counterparts ranked by containers, with share column
    pub partner_summary: RankedSummary,
    /// (partner, origin port, destination port) ranked by containers
    pub route_summary: RankedSummary,
    /// Container lines ranked by containers, with share column
    pub line_summary: RankedSummary,
    pub shipments: Vec<ShipmentRecord>,
}

pub fn company_profile(table: &Table, party: Party, company: &str) -> Result<CompanyProfile> {
    // A blank name is a missing value and never identifies a company
    let shipments: Vec<ShipmentRecord> = if is_missing(company) {
        Vec::new()
    } else {
        table
            .iter()
            .filter(|r| r.name(party) == company)
            .cloned()
            .collect()
    };

    let Some(first) = shipments.first() else {
        return Err(DashboardError::NotFound {
            party,
            company: company.to_string(),
        });
    };
    let partner = party.partner();

    let partner_summary = RankedSummary::new(
        &[key::PARTNER, key::CATEGORY, key::BUSINESS],
        group_and_rank(&shipments, party_key(partner), 0),
    )
    .with_shares();

    let route_summary = RankedSummary::new(
        &[key::PARTNER, key::ORIGIN_PORT, key::DESTINATION_PORT],
        group_and_rank(
            &shipments,
            |r| present(&[r.name(partner), r.origin_port.as_str(), r.destination_port.as_str()]),
            0,
        ),
    );

    let line_summary = RankedSummary::new(
        &[key::CONTAINER_LINE],
        group_and_rank(&shipments, |r| present(&[r.container_line.as_str()]), 0),
    )
    .with_shares();

    Ok(CompanyProfile {
        party,
        company: company.to_string(),
        category: first.category(party).to_string(),
        business: first.business(party).to_string(),
        records: shipments.len(),
        containers: total(shipments.iter().map(|r| r.containers)),
        partners: distinct_values(shipments.iter().map(|r| r.name(partner))).len(),
        container_lines: distinct_values(shipments.iter().map(|r| r.container_line.as_str())).len(),
        partner_summary,
        route_summary,
        line_summary,
        shipments,
    })
}

/// Dataset-wide headline numbers shown after login.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub records: usize,
    pub exporters: usize,
    pub importers: usize,
    pub containers: u64,
    pub container_lines: usize,
    pub line_ranking: RankedSummary,
}

pub fn overview(table: &Table) -> Overview {
    let line_ranking = RankedSummary::new(
        &[key::CONTAINER_LINE],
        group_and_rank(table.iter(), |r| present(&[r.container_line.as_str()]), 0),
    );

    Overview {
        records: table.len(),
        exporters: table.distinct(|r| r.exporter.as_str()).len(),
        importers: table.distinct(|r| r.importer.as_str()).len(),
        containers: total(table.iter().map(|r| r.containers)),
        container_lines: line_ranking.len(),
        line_ranking,
    }
}

/// Categories available for a role, sorted.
pub fn categories(table: &Table, party: Party) -> Vec<String> {
    distinct_values(table.iter().map(|r| r.category(party)))
}

/// Company names of a role, sorted, optionally restricted to a category.
pub fn companies(table: &Table, party: Party, category: &str) -> Vec<String> {
    distinct_values(
        table
            .iter()
            .filter(|r| category == ALL || r.category(party) == category)
            .map(|r| r.name(party)),
    )
}

/// Business descriptions present in a company ranking, sorted.
pub fn business_descriptions(summary: &RankedSummary) -> Vec<String> {
    distinct_values(summary.column_values(key::BUSINESS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ship(exporter: &str, importer: &str, line: &str, containers: u64) -> ShipmentRecord {
        ShipmentRecord {
            exporter: exporter.to_string(),
            exporter_category: "Steel".to_string(),
            exporter_business: "Coil".to_string(),
            importer: importer.to_string(),
            importer_category: "Trade".to_string(),
            importer_business: "Retail".to_string(),
            container_line: line.to_string(),
            containers,
            origin_port: "Busan".to_string(),
            destination_port: "Jakarta".to_string(),
        }
    }

    fn assert_ranked(summary: &RankedSummary) {
        for (i, row) in summary.rows.iter().enumerate() {
            assert_eq!(row.rank, i + 1);
        }
        for pair in summary.rows.windows(2) {
            assert!(pair[0].containers >= pair[1].containers);
        }
    }

    #[test]
    fn threshold_is_inclusive_and_excludes_small_groups() {
        let table = Table::new(vec![
            ship("A", "X", "HMM", 10),
            ship("A", "X", "HMM", 20),
            ship("A", "Y", "ONE", 5),
            ship("B", "X", "HMM", 5),
        ]);

        let summary = rank(&table, Party::Exporter, 10, ALL);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.rows[0].rank, 1);
        assert_eq!(summary.rows[0].keys[0], "A");
        assert_eq!(summary.rows[0].containers, 35);

        let exact = rank(&table, Party::Exporter, 35, ALL);
        assert_eq!(exact.len(), 1);
        assert!(rank(&table, Party::Exporter, 36, ALL).is_empty());
    }

    #[test]
    fn category_filter_uses_the_selected_role() {
        let mut other = ship("C", "Z", "HMM", 50);
        other.exporter_category = "Food".to_string();
        other.importer_category = "Food".to_string();
        let table = Table::new(vec![ship("A", "X", "HMM", 10), other]);

        let steel = rank(&table, Party::Exporter, 0, "Steel");
        assert_eq!(steel.column_values(key::NAME), vec!["A"]);

        let food_importers = rank(&table, Party::Importer, 0, "Food");
        assert_eq!(food_importers.column_values(key::NAME), vec!["Z"]);
        assert!(rank(&table, Party::Importer, 0, "Steel").is_empty());
    }

    #[test]
    fn ties_keep_group_order_and_ranks_stay_contiguous() {
        let table = Table::new(vec![
            ship("C", "X", "HMM", 7),
            ship("B", "X", "HMM", 7),
            ship("A", "X", "HMM", 7),
            ship("D", "X", "HMM", 1),
            ship("E", "X", "HMM", 9),
        ]);

        let summary = rank(&table, Party::Exporter, 2, ALL);
        assert_eq!(summary.column_values(key::NAME), vec!["E", "A", "B", "C"]);
        assert_ranked(&summary);
        assert_eq!(summary, rank(&table, Party::Exporter, 2, ALL));
    }

    #[test]
    fn records_with_missing_keys_are_not_grouped() {
        let mut blank = ship("F", "X", "HMM", 100);
        blank.exporter_business = String::new();
        let table = Table::new(vec![ship("A", "X", "HMM", 1), blank]);

        let summary = rank(&table, Party::Exporter, 0, ALL);
        assert_eq!(summary.column_values(key::NAME), vec!["A"]);
    }

    #[test]
    fn empty_table_ranks_to_empty_summary() {
        let summary = rank(&Table::default(), Party::Importer, 0, ALL);
        assert!(summary.is_empty());
        assert_eq!(summary.columns, vec![key::NAME, key::CATEGORY, key::BUSINESS]);
    }

    #[test]
    fn business_filter_keeps_parent_ranks() {
        let mut food = ship("B", "X", "HMM", 50);
        food.exporter_business = "Snacks".to_string();
        let table = Table::new(vec![food, ship("A", "X", "HMM", 10)]);

        let summary = rank(&table, Party::Exporter, 0, ALL);
        let coil = business_filter(&summary, "Coil");
        assert_eq!(coil.len(), 1);
        assert_eq!(coil.rows[0].rank, 2);
        assert!(business_filter(&summary, "Nothing").is_empty());
        assert_eq!(business_filter(&summary, ALL), summary);
        assert_eq!(business_descriptions(&summary), vec!["Coil", "Snacks"]);
    }

    #[test]
    fn profile_ranks_partners_with_shares() {
        let table = Table::new(vec![
            ship("A", "X", "HMM", 10),
            ship("A", "Y", "ONE", 30),
            ship("B", "X", "HMM", 99),
        ]);

        let profile = company_profile(&table, Party::Exporter, "A").unwrap();
        assert_eq!(profile.records, 2);
        assert_eq!(profile.containers, 40);
        assert_eq!(profile.partners, 2);
        assert_eq!(profile.container_lines, 2);
        assert_eq!(profile.category, "Steel");

        let partners = &profile.partner_summary.rows;
        assert_eq!(partners[0].keys[0], "Y");
        assert_eq!(partners[0].containers, 30);
        assert_eq!(partners[0].share, Some(75.0));
        assert_eq!(partners[1].keys[0], "X");
        assert_eq!(partners[1].share, Some(25.0));

        assert_eq!(profile.route_summary.rows[0].keys, vec!["Y", "Busan", "Jakarta"]);
        assert!(profile.route_summary.rows[0].share.is_none());
        assert_eq!(profile.line_summary.column_values(key::CONTAINER_LINE), vec!["ONE", "HMM"]);
    }

    #[test]
    fn shares_sum_to_one_hundred_within_rounding() {
        let table = Table::new(vec![
            ship("A", "X", "L1", 1),
            ship("A", "Y", "L2", 1),
            ship("A", "Z", "L3", 1),
        ]);

        let profile = company_profile(&table, Party::Exporter, "A").unwrap();
        let rows = &profile.line_summary.rows;
        let sum: f64 = rows.iter().filter_map(|r| r.share).sum();
        assert!((sum - 100.0).abs() <= 0.1 * rows.len() as f64);
        assert_eq!(rows[0].share, Some(33.3));
    }

    #[test]
    fn unknown_company_is_not_found() {
        let table = Table::new(vec![ship("A", "X", "HMM", 1)]);
        match company_profile(&table, Party::Importer, "A") {
            Err(DashboardError::NotFound { party, company }) => {
                assert_eq!(party, Party::Importer);
                assert_eq!(company, "A");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn overview_counts_and_line_ranking() {
        let table = Table::new(vec![
            ship("A", "X", "HMM", 10),
            ship("B", "X", "ONE", 30),
            ship("B", "Y", "HMM", 5),
        ]);

        let ov = overview(&table);
        assert_eq!(ov.records, 3);
        assert_eq!(ov.exporters, 2);
        assert_eq!(ov.importers, 2);
        assert_eq!(ov.containers, 45);
        assert_eq!(ov.container_lines, 2);
        assert_eq!(ov.line_ranking.column_values(key::CONTAINER_LINE), vec!["ONE", "HMM"]);
    }

    #[test]
    fn pickers_are_sorted_and_filtered() {
        let mut food = ship("Z", "X", "HMM", 1);
        food.exporter_category = "Food".to_string();
        let table = Table::new(vec![ship("B", "X", "HMM", 1), ship("A", "Y", "HMM", 1), food]);

        assert_eq!(categories(&table, Party::Exporter), vec!["Food", "Steel"]);
        assert_eq!(companies(&table, Party::Exporter, ALL), vec!["A", "B", "Z"]);
        assert_eq!(companies(&table, Party::Exporter, "Food"), vec!["Z"]);
        assert_eq!(companies(&table, Party::Importer, "Trade"), vec!["X", "Y"]);
    }

    #[test]
    fn percentage_handles_zero_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
    }

    #[test]
    fn percentage_ties_round_to_even() {
        // 6.25 and 18.75 sit exactly on the tie
        assert_eq!(percentage(1, 16), 6.2);
        assert_eq!(percentage(3, 16), 18.8);
        assert_eq!(percentage(1, 8), 12.5);
    }

    #[test]
    fn huge_counts_saturate_instead_of_overflowing() {
        let table = Table::new(vec![
            ship("A", "X", "HMM", u64::MAX),
            ship("A", "X", "HMM", 1),
            ship("B", "X", "HMM", 5),
        ]);

        let summary = rank(&table, Party::Exporter, 0, ALL);
        assert_eq!(summary.rows[0].containers, u64::MAX);
        assert_eq!(summary.total_containers(), u64::MAX);
        assert_eq!(overview(&table).containers, u64::MAX);
        let profile = company_profile(&table, Party::Importer, "X").unwrap();
        assert_eq!(profile.containers, u64::MAX);
    }

    #[test]
    fn blank_company_is_not_found() {
        let table = Table::new(vec![ship("", "X", "HMM", 1), ship("  ", "X", "HMM", 3)]);

        for company in ["", "  "] {
            assert!(matches!(
                company_profile(&table, Party::Exporter, company),
                Err(DashboardError::NotFound { .. })
            ));
        }
    }

    #[test]
    fn headers_follow_columns_and_shares() {
        let table = Table::new(vec![ship("A", "X", "HMM", 1)]);
        let summary = rank(&table, Party::Importer, 0, ALL);
        assert_eq!(
            summary.headers(Party::Importer),
            vec!["Rank", "Importer", "Category", "Business", "Containers"]
        );

        let profile = company_profile(&table, Party::Exporter, "A").unwrap();
        assert_eq!(
            profile.line_summary.headers(Party::Exporter),
            vec!["Rank", "Container line", "Containers", "Share (%)"]
        );
    }
}
