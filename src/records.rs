//! Record loader – reads the attendee table into an [`AttendeeBatch`].
//!
//! The table is comma-separated text with a header row. Every header becomes
//! a field name; cells that are absent on short rows are filled with `""`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ForgeError;

/// Columns every attendee table must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "FirstName",
    "LastName",
    "EmailAddress",
    "EventTitle",
    "EventDate",
];

/// One attendee row. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendeeRecord {
    row: usize,
    fields: BTreeMap<String, String>,
}

impl AttendeeRecord {
    /// Build a record directly from field pairs.
    pub fn from_fields<K, V>(row: usize, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            row,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 1-based data row number (the header is row 0).
    pub fn row(&self) -> usize {
        self.row
    }

    /// Field value, or `""` when the field does not exist.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn first_name(&self) -> &str {
        self.get("FirstName")
    }

    pub fn last_name(&self) -> &str {
        self.get("LastName")
    }

    pub fn event_title(&self) -> &str {
        self.get("EventTitle")
    }

    pub fn event_date(&self) -> &str {
        self.get("EventDate")
    }

    /// Human-readable label for messages, e.g. `"Ana Lee (row 3)"`.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name(), self.last_name());
        let name = name.trim();
        if name.is_empty() {
            format!("row {}", self.row)
        } else {
            format!("{name} (row {})", self.row)
        }
    }
}

/// The ordered, validated set of records sharing one schema.
#[derive(Debug, Clone)]
pub struct AttendeeBatch {
    columns: Vec<String>,
    records: Vec<AttendeeRecord>,
}

impl AttendeeBatch {
    #[cfg(test)]
    pub(crate) fn from_parts(columns: Vec<String>, records: Vec<AttendeeRecord>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn records(&self) -> &[AttendeeRecord] {
        &self.records
    }

    /// `Some` for every batch produced by the loader.
    pub fn first(&self) -> Option<&AttendeeRecord> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load and validate the attendee table at `path`.
pub fn load_batch(path: &Path) -> Result<AttendeeBatch, ForgeError> {
    let file = File::open(path).map_err(|e| ForgeError::SourceRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    read_batch(file, path)
}

/// Load and validate a table from any reader. `origin` is only used in
/// error messages.
pub fn read_batch<R: Read>(reader: R, origin: &Path) -> Result<AttendeeBatch, ForgeError> {
    let read_err = |reason: String| ForgeError::SourceRead {
        path: origin.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| read_err(e.to_string()))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|req| !columns.iter().any(|c| c == *req))
        .map(|req| req.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ForgeError::Schema {
            missing,
            available: columns,
        });
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = result.map_err(|e| read_err(e.to_string()))?;
        if row.len() > columns.len() {
            return Err(read_err(format!(
                "expected {} fields in data row {}, saw {}",
                columns.len(),
                idx + 1,
                row.len()
            )));
        }
        let fields = columns.iter().enumerate().map(|(i, name)| {
            let value = row.get(i).unwrap_or("");
            (name.clone(), value.to_string())
        });
        records.push(AttendeeRecord::from_fields(idx + 1, fields));
    }

    if records.is_empty() {
        return Err(ForgeError::EmptyInput {
            path: origin.to_path_buf(),
        });
    }

    log::debug!(
        "loaded {} attendee rows with columns {:?}",
        records.len(),
        columns
    );

    Ok(AttendeeBatch { columns, records })
}
