// File: crates/bcbooking_erp/src/grid.rs
//! Server-side processing for DataTables grids: filter, sort, then page.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::models::UpstreamRecord;

/// Columns searched by the filter, in the order the grid numbers them.
pub const GRID_COLUMNS: [&str; 3] = ["Code", "Description", "Location"];

pub const DEFAULT_PAGE_LENGTH: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `DESC` in any case selects descending, anything else ascending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(dir) if dir.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

/// The form fields DataTables posts, as sent.
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GridForm {
    pub draw: Option<String>,
    pub start: Option<String>,
    pub length: Option<String>,
    #[serde(rename = "search[value]")]
    pub search: Option<String>,
    #[serde(rename = "order[0][column]")]
    pub order_column: Option<String>,
    #[serde(rename = "order[0][dir]")]
    pub order_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRequest {
    pub draw: i64,
    pub start: i64,
    /// Rows per page; negative means all rows.
    pub length: i64,
    /// Already trimmed and lower-cased.
    pub search_term: String,
    pub order_column_index: Option<i64>,
    pub order_direction: SortDirection,
}

impl Default for GridRequest {
    fn default() -> Self {
        Self {
            draw: 0,
            start: 0,
            length: DEFAULT_PAGE_LENGTH,
            search_term: String::new(),
            order_column_index: None,
            order_direction: SortDirection::Asc,
        }
    }
}

impl From<GridForm> for GridRequest {
    fn from(form: GridForm) -> Self {
        Self {
            draw: parse_leading_int(form.draw.as_deref()).unwrap_or(0),
            start: parse_leading_int(form.start.as_deref()).unwrap_or(0),
            length: parse_leading_int(form.length.as_deref())
                .filter(|len| *len != 0)
                .unwrap_or(DEFAULT_PAGE_LENGTH),
            search_term: form
                .search
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_default(),
            order_column_index: parse_leading_int(form.order_column.as_deref()),
            order_direction: SortDirection::parse(form.order_dir.as_deref()),
        }
    }
}

impl GridRequest {
    /// The column to sort by; `Code` when the index is absent or out of range.
    pub fn sort_column(&self) -> &'static str {
        self.order_column_index
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| GRID_COLUMNS.get(i).copied())
            .unwrap_or(GRID_COLUMNS[0])
    }
}

/// Parses an optional sign followed by digits, ignoring anything after them,
/// so `"25px"` is 25 and `"abc"` is nothing.
fn parse_leading_int(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let n: i64 = digits[..end].parse().ok()?;
    Some(if negative { -n } else { n })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GridResponse {
    pub draw: i64,
    pub records_total: usize,
    pub records_filtered: usize,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub data: Vec<UpstreamRecord>,
}

/// Text used for matching and ordering. Missing and non-scalar fields are "".
fn field_text(record: &UpstreamRecord, column: &str) -> String {
    match record.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn matches_search(record: &UpstreamRecord, term: &str) -> bool {
    GRID_COLUMNS
        .iter()
        .any(|column| field_text(record, column).to_lowercase().contains(term))
}

/// Filters, sorts and slices `records` for one grid draw.
pub fn apply_grid(request: &GridRequest, records: Vec<UpstreamRecord>) -> GridResponse {
    let records_total = records.len();

    let mut filtered: Vec<UpstreamRecord> = if request.search_term.is_empty() {
        records
    } else {
        records
            .into_iter()
            .filter(|record| matches_search(record, &request.search_term))
            .collect()
    };
    let records_filtered = filtered.len();

    let column = request.sort_column();
    // sort_by is stable, equal keys keep their upstream order
    filtered.sort_by(|a, b| {
        let ordering: Ordering = field_text(a, column).cmp(&field_text(b, column));
        match request.order_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    let start = usize::try_from(request.start).unwrap_or(0);
    let data: Vec<UpstreamRecord> = match usize::try_from(request.length) {
        Ok(length) => filtered.into_iter().skip(start).take(length).collect(),
        Err(_) => filtered.into_iter().skip(start).collect(),
    };

    GridResponse {
        draw: request.draw,
        records_total,
        records_filtered,
        data,
    }
}
