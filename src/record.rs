use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Sentinel used by filters and pickers for "no restriction".
pub const ALL: &str = "ALL";

/// Column headers of the source spreadsheet.
///
/// These are an external contract with the data provider and must match the
/// workbook's header row exactly (after trimming).
pub mod columns {
    pub const EXPORTER: &str = "수출자";
    pub const EXPORTER_CATEGORY: &str = "수출자 대분류";
    pub const EXPORTER_BUSINESS: &str = "수출자 사업내용";
    pub const IMPORTER: &str = "수입자";
    pub const IMPORTER_CATEGORY: &str = "수입자 대분류";
    pub const IMPORTER_BUSINESS: &str = "수입자 사업내용";
    pub const CONTAINER_LINE: &str = "컨테이너선사";
    pub const CONTAINER_COUNT: &str = "컨테이너수";
    pub const ORIGIN_PORT: &str = "선적항";
    pub const DESTINATION_PORT: &str = "도착항";

    /// Every header the loader requires, in record field order.
    pub const REQUIRED: [&str; 10] = [
        EXPORTER,
        EXPORTER_CATEGORY,
        EXPORTER_BUSINESS,
        IMPORTER,
        IMPORTER_CATEGORY,
        IMPORTER_BUSINESS,
        CONTAINER_LINE,
        CONTAINER_COUNT,
        ORIGIN_PORT,
        DESTINATION_PORT,
    ];
}

/// Trading role a ranking or drill-down is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    #[default]
    Exporter,
    Importer,
}

impl Party {
    /// The other side of a shipment.
    pub fn partner(self) -> Party {
        match self {
            Party::Exporter => Party::Importer,
            Party::Importer => Party::Exporter,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Party::Exporter => "exporter",
            Party::Importer => "importer",
        }
    }

    /// Capitalised label for headings.
    pub fn title(self) -> &'static str {
        match self {
            Party::Exporter => "Exporter",
            Party::Importer => "Importer",
        }
    }

    pub fn parse(value: &str) -> Option<Party> {
        match value.trim().to_lowercase().as_str() {
            "exporter" | "수출자" => Some(Party::Exporter),
            "importer" | "수입자" => Some(Party::Importer),
            _ => None,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One shipment row of the dataset. Blank text cells are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub exporter: String,
    pub exporter_category: String,
    pub exporter_business: String,
    pub importer: String,
    pub importer_category: String,
    pub importer_business: String,
    pub container_line: String,
    pub containers: u64,
    pub origin_port: String,
    pub destination_port: String,
}

impl ShipmentRecord {
    pub fn name(&self, party: Party) -> &str {
        match party {
            Party::Exporter => &self.exporter,
            Party::Importer => &self.importer,
        }
    }

    pub fn category(&self, party: Party) -> &str {
        match party {
            Party::Exporter => &self.exporter_category,
            Party::Importer => &self.importer_category,
        }
    }

    pub fn business(&self, party: Party) -> &str {
        match party {
            Party::Exporter => &self.exporter_business,
            Party::Importer => &self.importer_business,
        }
    }
}

/// The loaded dataset. Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct Table {
    records: Vec<ShipmentRecord>,
}

impl Table {
    pub fn new(records: Vec<ShipmentRecord>) -> Self {
        Table { records }
    }

    pub fn records(&self) -> &[ShipmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShipmentRecord> {
        self.records.iter()
    }

    /// Sorted distinct values of one text field, skipping blanks.
    pub fn distinct<'a, F>(&'a self, field: F) -> Vec<String>
    where
        F: Fn(&'a ShipmentRecord) -> &'a str,
    {
        distinct_values(self.records.iter().map(field))
    }
}

impl FromIterator<ShipmentRecord> for Table {
    fn from_iter<I: IntoIterator<Item = ShipmentRecord>>(iter: I) -> Self {
        Table::new(iter.into_iter().collect())
    }
}

/// Sorted, de-duplicated, non-blank values.
pub fn distinct_values<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .filter(|v| !is_missing(v))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn is_missing(value: &str) -> bool {
    value.trim().is_empty()
}
