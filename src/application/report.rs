//! Report building and QA annotation
//!
//! [`Report::build`] takes the complete record set of a run and computes every
//! quality annotation as a pure function of those records. Rendering is left
//! to a [`ReportSink`]; the sink only maps annotations to fills.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::domain::record::{FieldValue, NormalizedRecord};
use crate::domain::schema::{ColumnKind, ColumnSpec, DomainSchema, QaRules};

/// Fill colour class of an annotated cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Highlight {
    /// Missing or uninformative value (yellow)
    Missing,
    /// Error, duplicate or suspicious constant (red)
    Error,
}

impl Highlight {
    /// Solid fill colour as `0xRRGGBB`
    #[must_use]
    pub const fn rgb(self) -> u32 {
        match self {
            Self::Missing => 0x00FF_FF00,
            Self::Error => 0x00FF_0000,
        }
    }
}

/// Why a cell or header is annotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QaFlag {
    /// Every informative value of the column is identical
    ConstantColumn,
    /// The column holds no informative value at all
    BlankColumn,
    BlankCell,
    InvalidUrl,
    /// Status cell of a row whose fetch did not return 200
    ErrorStatus,
    DuplicateKey,
    UnexpectedValue,
    /// Mapping with a null or empty entry
    IncompleteCompound,
}

impl QaFlag {
    #[must_use]
    pub const fn highlight(self) -> Highlight {
        match self {
            Self::ConstantColumn | Self::ErrorStatus | Self::DuplicateKey => Highlight::Error,
            Self::BlankColumn
            | Self::BlankCell
            | Self::InvalidUrl
            | Self::UnexpectedValue
            | Self::IncompleteCompound => Highlight::Missing,
        }
    }
}

/// Header cell or data cell; rows and columns are 0-based over the records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellRef {
    Header { column: usize },
    Cell { row: usize, column: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Annotation {
    pub target: CellRef,
    pub flag: QaFlag,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("report does not fit in a worksheet: {0}")]
    TooLarge(String),
}

/// Renders a finished report to a destination
pub trait ReportSink: Send + Sync {
    fn write(&self, report: &Report, path: &Path) -> Result<(), ReportError>;
}

/// Tabular result of a run with its annotations
#[derive(Debug, Clone)]
pub struct Report {
    sheet_title: &'static str,
    columns: &'static [ColumnSpec],
    status_column: Option<usize>,
    records: Vec<NormalizedRecord>,
    annotations: Vec<Annotation>,
    highlights: HashMap<CellRef, Highlight>,
}

impl Report {
    /// Fills derived columns and annotates the complete record set
    #[must_use]
    pub fn build(schema: &dyn DomainSchema, mut records: Vec<NormalizedRecord>) -> Self {
        let columns = schema.columns();
        let rules = schema.qa_rules();

        let duplicates = duplicate_rows(&mut records, columns, &rules);
        let annotations = annotate(columns, &rules, &records, &duplicates);

        let mut highlights: HashMap<CellRef, Highlight> = HashMap::new();
        for annotation in &annotations {
            let highlight = annotation.flag.highlight();
            highlights
                .entry(annotation.target)
                .and_modify(|current| *current = (*current).max(highlight))
                .or_insert(highlight);
        }
        debug!(
            "Report '{}': {} rows, {} annotations",
            schema.sheet_title(),
            records.len(),
            annotations.len()
        );

        Self {
            sheet_title: schema.sheet_title(),
            columns,
            status_column: column_index(columns, schema.status_column()),
            records,
            annotations,
            highlights,
        }
    }

    #[must_use]
    pub const fn sheet_title(&self) -> &'static str {
        self.sheet_title
    }

    #[must_use]
    pub const fn columns(&self) -> &'static [ColumnSpec] {
        self.columns
    }

    #[must_use]
    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Fill of a header or cell; red wins when both apply
    #[must_use]
    pub fn highlight(&self, target: CellRef) -> Option<Highlight> {
        self.highlights.get(&target).copied()
    }

    /// Every flag attached to `target`
    #[must_use]
    pub fn flags_at(&self, target: CellRef) -> Vec<QaFlag> {
        self.annotations
            .iter()
            .filter(|a| a.target == target)
            .map(|a| a.flag)
            .collect()
    }

    /// Index of a declared column
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Rows whose fetch returned 200
    #[must_use]
    pub fn successful_rows(&self) -> usize {
        let Some(status) = self.status_column else {
            return self.records.len();
        };
        self.records
            .iter()
            .filter(|r| r.value_at(status).is_some_and(is_ok_status))
            .count()
    }
}

fn column_index(columns: &[ColumnSpec], name: Option<&str>) -> Option<usize> {
    name.and_then(|name| columns.iter().position(|c| c.name == name))
}

fn is_ok_status(value: &FieldValue) -> bool {
    value.as_text() == "200"
}

/// Rows whose key repeats; also writes the `"True"`/`"False"` marker column
fn duplicate_rows(
    records: &mut [NormalizedRecord],
    columns: &[ColumnSpec],
    rules: &QaRules,
) -> Vec<bool> {
    let mut duplicated = vec![false; records.len()];
    let Some(rule) = rules.duplicate_key else {
        return duplicated;
    };
    let Some(key_index) = column_index(columns, Some(rule.key_column)) else {
        return duplicated;
    };

    let keys: Vec<Option<String>> = records
        .iter()
        .map(|r| {
            r.value_at(key_index)
                .map(|v| v.as_text().trim().to_string())
                .filter(|k| !k.is_empty())
        })
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys.iter().flatten() {
        *counts.entry(key.as_str()).or_default() += 1;
    }

    for (row, key) in keys.iter().enumerate() {
        let Some(key) = key else { continue };
        let is_duplicate = counts.get(key.as_str()).copied().unwrap_or_default() > 1;
        duplicated[row] = is_duplicate;
        if let Some(marker) = rule.marker_column {
            records[row].set(marker, if is_duplicate { "True" } else { "False" });
        }
    }
    duplicated
}

/// Non-empty value that is not an HTTP(S) link; lists are checked per element
fn is_invalid_url(value: &FieldValue) -> bool {
    match value {
        FieldValue::Compound(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|url| !url.is_empty() && !url.starts_with("http")),
        other if other.is_sentinel() => false,
        other => !other.as_text().starts_with("http"),
    }
}

fn is_incomplete_mapping(value: &FieldValue) -> bool {
    match value {
        FieldValue::Compound(Value::Object(map)) => map
            .values()
            .any(|v| v.is_null() || v.as_str().is_some_and(str::is_empty)),
        _ => false,
    }
}

/// Column-constant rule: literal equality over the informative values
fn is_constant(values: &[&FieldValue]) -> bool {
    let mut informative = values.iter().filter(|v| !v.is_sentinel());
    let Some(first) = informative.next() else {
        return false;
    };
    informative.all(|v| v == first)
}

fn annotate(
    columns: &[ColumnSpec],
    rules: &QaRules,
    records: &[NormalizedRecord],
    duplicates: &[bool],
) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    let mut push = |target, flag| annotations.push(Annotation { target, flag });

    let marker_column = rules.duplicate_key.and_then(|rule| rule.marker_column);
    let key_column = rules.duplicate_key.map(|rule| rule.key_column);

    for (column, spec) in columns.iter().enumerate() {
        let values: Vec<&FieldValue> = records
            .iter()
            .map(|r| r.value_at(column).unwrap_or(&FieldValue::Null))
            .collect();

        if is_constant(&values) {
            push(CellRef::Header { column }, QaFlag::ConstantColumn);
        }
        if !values.is_empty() && values.iter().all(|v| v.is_sentinel()) {
            push(CellRef::Header { column }, QaFlag::BlankColumn);
        }

        let expectation = rules.expectations.iter().find(|e| e.column == spec.name);
        let complete_mapping = rules.complete_mappings.contains(&spec.name);
        let is_marker = marker_column == Some(spec.name);
        let is_key = key_column == Some(spec.name);

        for (row, value) in values.iter().enumerate() {
            let cell = CellRef::Cell { row, column };

            match expectation {
                Some(expectation) => {
                    if expectation.expected.deviates(value) {
                        push(cell, QaFlag::UnexpectedValue);
                    }
                }
                None if !is_marker && value.is_sentinel() => push(cell, QaFlag::BlankCell),
                None => {}
            }

            if spec.kind == ColumnKind::Url && is_invalid_url(value) {
                push(cell, QaFlag::InvalidUrl);
            }
            if spec.kind == ColumnKind::Status && !is_ok_status(value) {
                push(cell, QaFlag::ErrorStatus);
            }
            if complete_mapping && is_incomplete_mapping(value) {
                push(cell, QaFlag::IncompleteCompound);
            }
            if (is_key || is_marker) && duplicates[row] {
                push(cell, QaFlag::DuplicateKey);
            }
        }
    }

    annotations
}
