use crate::error::DataLoadError;
use crate::record::{ShipmentRecord, Table, columns};
use std::path::Path;

/// Column positions of the required headers within a header row.
#[derive(Debug, Clone)]
struct HeaderIndex {
    positions: [usize; 10],
}

impl HeaderIndex {
    /// Locate every required header, or report all of the missing ones.
    fn from_headers<S: AsRef<str>>(headers: &[S]) -> Result<Self, DataLoadError> {
        let mut positions = [0usize; 10];
        let mut missing = Vec::new();

        for (slot, name) in columns::REQUIRED.iter().enumerate() {
            match headers.iter().position(|h| h.as_ref().trim() == *name) {
                Some(pos) => positions[slot] = pos,
                None => missing.push(name.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(HeaderIndex { positions })
        } else {
            Err(DataLoadError::MissingColumns(missing))
        }
    }

    /// Build a record from one data row. `row` is the 1-based sheet row number.
    fn record<S: AsRef<str>>(
        &self,
        cells: &[S],
        row: usize,
    ) -> Result<ShipmentRecord, DataLoadError> {
        let text = |slot: usize| -> String {
            cells
                .get(self.positions[slot])
                .map(|c| c.as_ref().trim().to_string())
                .unwrap_or_default()
        };

        let raw_count = text(7);
        let containers = parse_container_count(&raw_count).ok_or_else(|| {
            DataLoadError::InvalidValue {
                row,
                column: columns::CONTAINER_COUNT.to_string(),
                value: raw_count.clone(),
            }
        })?;

        Ok(ShipmentRecord {
            exporter: text(0),
            exporter_category: text(1),
            exporter_business: text(2),
            importer: text(3),
            importer_category: text(4),
            importer_business: text(5),
            container_line: text(6),
            containers,
            origin_port: text(8),
            destination_port: text(9),
        })
    }
}

/// Parse a container count cell rendered as text.
///
/// Blank means zero. Thousands separators are accepted, as are integral
/// decimals such as `"12.0"` that spreadsheets produce for numeric cells.
fn parse_container_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Some(0);
    }
    if let Ok(n) = cleaned.parse::<u64>() {
        return Some(n);
    }
    match cleaned.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Some(f as u64),
        _ => None,
    }
}

/// Turn a header row plus data rows into a table.
///
/// Rows in which every cell is blank are skipped. A row with fewer cells than
/// the header is rejected rather than padded with blanks.
fn build_table<I, R, S>(header: &[S], rows: I) -> Result<Table, DataLoadError>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let index = HeaderIndex::from_headers(header)?;
    let mut records = Vec::new();

    // Header is sheet row 1, so data starts at row 2.
    for (offset, row) in rows.into_iter().enumerate() {
        let cells = row.as_ref();
        if cells.iter().all(|c| c.as_ref().trim().is_empty()) {
            continue;
        }
        let row = offset + 2;
        if cells.len() < header.len() {
            return Err(DataLoadError::ShortRow {
                row,
                expected: header.len(),
                found: cells.len(),
            });
        }
        records.push(index.record(cells, row)?);
    }

    Ok(Table::new(records))
}

/// Load a shipment table from a CSV file
///
/// The first record must be the header row carrying the fixed column names.
/// Quoted fields may contain commas, doubled quotes and line breaks.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `Result<Table, DataLoadError>` - The loaded table or the reason it could not be read
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Table, DataLoadError> {
    let path = filepath.as_ref();
    let csv_err = |e: csv::Error| {
        let reason = e.to_string();
        match e.into_kind() {
            csv::ErrorKind::Io(source) => DataLoadError::Io {
                path: path.to_path_buf(),
                source,
            },
            _ => DataLoadError::Csv {
                path: path.to_path_buf(),
                reason,
            },
        }
    };

    // Width is checked against the header in `build_table`
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    let mut rows = rows.into_iter();
    let mut header = rows.next().ok_or(DataLoadError::Empty)?;
    // Excel writes a UTF-8 BOM in front of the first header.
    if let Some(first) = header.first_mut() {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }

    build_table(header.as_slice(), rows)
}

/// Load a shipment table from an Excel workbook
///
/// Reads the first worksheet; its first row is the header row.
///
/// # Arguments
/// * `filepath` - Path to the workbook (xlsx, xlsm, xls or ods)
///
/// # Returns
/// * `Result<Table, DataLoadError>` - The loaded table or the reason it could not be read
pub fn from_excel(filepath: impl AsRef<Path>) -> Result<Table, DataLoadError> {
    use calamine::{Reader, open_workbook_auto};

    let path = filepath.as_ref();
    if !path.exists() {
        return Err(DataLoadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        });
    }

    let workbook_err = |e: calamine::Error| DataLoadError::Workbook {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;

    // Get the first worksheet
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| DataLoadError::NoWorksheet(path.to_path_buf()))?;

    let range = workbook.worksheet_range(&sheet_name).map_err(workbook_err)?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
    let header = rows.next().ok_or(DataLoadError::Empty)?;

    build_table(header.as_slice(), rows)
}

/// Render a workbook cell as the text the record builder expects.
fn cell_text(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // Numeric cells come back as floats even when integral
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Detect file type and load the appropriate format
///
/// # Arguments
/// * `filepath` - Path to the dataset (`.xlsx`, `.xlsm`, `.xls`, `.ods` or `.csv`)
///
/// # Returns
/// * `Result<Table, DataLoadError>` - The loaded table or an error
pub fn load_dataset(filepath: impl AsRef<Path>) -> Result<Table, DataLoadError> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => from_csv(path),
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => from_excel(path),
        Some(ext) => Err(DataLoadError::UnsupportedFormat(ext.to_string())),
        None => Err(DataLoadError::UnsupportedFormat(
            path.display().to_string(),
        )),
    }
}
