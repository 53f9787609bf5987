use crate::analysis::RankedSummary;
use crate::error::DashboardError;
use crate::record::Party;

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert a ranked summary to CSV
///
/// The first line holds the column headings; fields containing commas,
/// quotes or newlines are quoted.
///
/// # Arguments
/// * `summary` - The ranking to export
/// * `party` - Role the `name` column refers to, used for the headings
///
/// # Returns
/// * `String` - CSV content
pub fn to_csv(summary: &RankedSummary, party: Party) -> String {
    let headers = summary.headers(party);
    let with_share = summary.has_shares();
    let mut csv_content = headers
        .iter()
        .map(|h| escape_csv(h))
        .collect::<Vec<_>>()
        .join(",");
    csv_content.push('\n');

    for row in &summary.rows {
        let mut fields = vec![row.rank.to_string()];
        fields.extend(row.keys.iter().map(|k| escape_csv(k)));
        fields.push(row.containers.to_string());
        if with_share {
            fields.push(row.share.map(|s| format!("{:.1}", s)).unwrap_or_default());
        }
        csv_content.push_str(&fields.join(","));
        csv_content.push('\n');
    }

    csv_content
}

/// Convert a ranked summary to XLSX
///
/// Rank, container and share columns are written as numbers so the sheet
/// can be re-sorted and summed in Excel.
///
/// # Arguments
/// * `summary` - The ranking to export
/// * `party` - Role the `name` column refers to, used for the headings
///
/// # Returns
/// * `Result<Vec<u8>, DashboardError>` - Workbook bytes or an error
pub fn to_xlsx(summary: &RankedSummary, party: Party) -> Result<Vec<u8>, DashboardError> {
    use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

    let xlsx_err = |e: XlsxError| DashboardError::Export(e.to_string());
    let headers = summary.headers(party);

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (c, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, c as u16, header.as_str())
            .map_err(xlsx_err)?;
    }

    for (r, row) in summary.rows.iter().enumerate() {
        let line = (r + 1) as u32;
        worksheet
            .write_number(line, 0, row.rank as f64)
            .map_err(xlsx_err)?;
        for (c, key) in row.keys.iter().enumerate() {
            worksheet
                .write_string(line, (c + 1) as u16, key.as_str())
                .map_err(xlsx_err)?;
        }
        let col = (row.keys.len() + 1) as u16;
        worksheet
            .write_number(line, col, row.containers as f64)
            .map_err(xlsx_err)?;
        if let Some(share) = row.share {
            worksheet
                .write_number(line, col + 1, share)
                .map_err(xlsx_err)?;
        }
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().map_err(xlsx_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{self, RankedRow, key};

    fn summary() -> RankedSummary {
        RankedSummary {
            columns: vec![key::NAME, key::CATEGORY, key::BUSINESS],
            rows: vec![
                RankedRow {
                    rank: 1,
                    keys: vec!["Hanil, Co".into(), "Steel".into(), "Coil \"A\"".into()],
                    containers: 1200,
                    share: None,
                },
                RankedRow {
                    rank: 2,
                    keys: vec!["Daesung".into(), "Steel".into(), "Pipe".into()],
                    containers: 30,
                    share: None,
                },
            ],
        }
    }

    #[test]
    fn csv_quotes_awkward_fields() {
        let csv = to_csv(&summary(), Party::Exporter);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Rank,Exporter,Category,Business,Containers");
        assert_eq!(lines[1], "1,\"Hanil, Co\",Steel,\"Coil \"\"A\"\"\",1200");
        assert_eq!(lines[2], "2,Daesung,Steel,Pipe,30");
    }

    #[test]
    fn csv_includes_share_when_present() {
        let mut s = summary();
        for row in &mut s.rows {
            row.share = Some(analysis::percentage(row.containers, 1230));
        }
        let csv = to_csv(&s, Party::Importer);
        assert!(csv.starts_with("Rank,Importer,Category,Business,Containers,Share (%)\n"));
        assert!(csv.contains(",1200,97.6\n"));
    }

    #[test]
    fn xlsx_round_trips_through_calamine() {
        use calamine::{Data, Reader, Xlsx};
        use std::io::Cursor;

        let bytes = to_xlsx(&summary(), Party::Exporter).unwrap();
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        let name = workbook.sheet_names()[0].clone();
        let range = workbook.worksheet_range(&name).unwrap();

        assert_eq!(range.get_size(), (3, 5));
        assert_eq!(range.get((0, 1)), Some(&Data::String("Exporter".to_string())));
        assert_eq!(range.get((1, 4)), Some(&Data::Float(1200.0)));
    }
}
