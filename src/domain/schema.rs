//! Per-domain schema descriptors
//!
//! One generic pipeline serves every domain. What differs between product,
//! search and review runs (endpoint, ordered column list, field extraction and
//! QA rules) lives behind the [`DomainSchema`] strategy trait.

use serde_json::Value;

use super::outcome::{FetchFailure, TRANSPORT_FAILURE_STATUS};
use super::record::{FieldValue, NormalizedRecord};
use super::task::Domain;

/// Semantic role of a column; drives defaults, metadata stamping and QA rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free text, defaults to `""`
    Text,
    /// Numbers and other scalar values, defaults to null
    Numeric,
    /// Boolean computed by the normalizer
    Flag,
    /// Holds a URL or a list of URLs
    Url,
    /// List or mapping, kept structured
    Compound,
    /// HTTP status of the fetch that produced the row
    Status,
    ErrorMessage,
    Timestamp,
    ProcessName,
    /// The task key (SKU or search term)
    Key,
    Page,
    /// Filled in when the report is built, not by the normalizer
    Derived,
}

impl ColumnKind {
    #[must_use]
    pub fn default_value(self) -> FieldValue {
        match self {
            Self::Text | Self::Url | Self::Key => FieldValue::text(""),
            _ => FieldValue::Null,
        }
    }
}

/// One declared report column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    #[must_use]
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Endpoint shape of a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Path appended to the API base URL
    pub path: &'static str,
    /// Query parameter carrying the task key
    pub key_param: &'static str,
    /// Whether a `page` query parameter is sent
    pub paged: bool,
}

/// Rows sharing a non-empty key are all flagged when the key repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateKeyRule {
    pub key_column: &'static str,
    /// Optional column receiving `"True"`/`"False"` for rows with a key
    pub marker_column: Option<&'static str>,
}

/// Value a column is expected to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedValue {
    /// Flag unless the value's text form is one of these
    TextIn(&'static [&'static str]),
    /// Flag when the value is exactly this boolean
    NotBool(bool),
}

impl ExpectedValue {
    #[must_use]
    pub fn deviates(self, value: &FieldValue) -> bool {
        match self {
            Self::TextIn(accepted) => !accepted.contains(&value.as_text().as_str()),
            Self::NotBool(unwanted) => *value == FieldValue::Bool(unwanted),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    pub column: &'static str,
    pub expected: ExpectedValue,
}

impl Expectation {
    #[must_use]
    pub const fn new(column: &'static str, expected: ExpectedValue) -> Self {
        Self { column, expected }
    }
}

/// Domain-specific QA rules; generic rules (blank cells, constant columns,
/// status codes, URL columns) are derived from the column kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QaRules {
    pub duplicate_key: Option<DuplicateKeyRule>,
    /// These columns are judged by their expectation instead of the blank-cell rule
    pub expectations: &'static [Expectation],
    /// Mapping columns flagged when any entry is null or empty
    pub complete_mappings: &'static [&'static str],
}

/// Per-record context handed to schema extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContext<'a> {
    pub key: &'a str,
    pub page: Option<u32>,
    pub process_name: &'a str,
    /// ISO-8601 local timestamp of normalization
    pub timestamp: String,
}

/// Strategy object describing one record domain
pub trait DomainSchema: Send + Sync {
    fn domain(&self) -> Domain;

    /// Worksheet title of the report
    fn sheet_title(&self) -> &'static str;

    /// Ordered, closed column list
    fn columns(&self) -> &'static [ColumnSpec];

    fn endpoint(&self) -> Endpoint;

    fn qa_rules(&self) -> QaRules;

    /// Items of one result page; `None` for unpaginated domains
    fn page_items<'a>(&self, _payload: &'a Value) -> Option<&'a [Value]> {
        None
    }

    /// Records extracted from one successful payload
    fn records_from_payload(&self, ctx: &RecordContext<'_>, payload: &Value) -> Vec<NormalizedRecord>;

    /// Error text of a failed fetch
    fn failure_message(&self, failure: &FetchFailure, _attempts: u32) -> String {
        failure.message().to_string()
    }

    /// Report file name used when no output path is configured
    fn default_file_name(&self, root_domain: &str) -> String;

    /// Single error row for a failed fetch
    fn failure_record(
        &self,
        ctx: &RecordContext<'_>,
        failure: &FetchFailure,
        attempts: u32,
    ) -> NormalizedRecord {
        let mut record = self.stamped_record(ctx);
        let status = failure
            .status_code()
            .map_or_else(|| FieldValue::text(TRANSPORT_FAILURE_STATUS), FieldValue::from);
        let message = self.failure_message(failure, attempts);
        for column in self.columns() {
            match column.kind {
                ColumnKind::Status => {
                    record.set(column.name, status.clone());
                }
                ColumnKind::ErrorMessage => {
                    record.set(column.name, message.as_str());
                }
                _ => {}
            }
        }
        record
    }

    /// Defaults plus metadata columns (key, page, process, timestamp)
    fn stamped_record(&self, ctx: &RecordContext<'_>) -> NormalizedRecord {
        let columns = self.columns();
        let mut record = NormalizedRecord::with_defaults(columns);
        for column in columns {
            match column.kind {
                ColumnKind::Key => {
                    record.set(column.name, ctx.key);
                }
                ColumnKind::Page => {
                    if let Some(page) = ctx.page {
                        record.set(column.name, page);
                    }
                }
                ColumnKind::ProcessName => {
                    record.set(column.name, ctx.process_name);
                }
                ColumnKind::Timestamp => {
                    record.set(column.name, ctx.timestamp.as_str());
                }
                _ => {}
            }
        }
        record
    }

    /// Name of the status column
    fn status_column(&self) -> Option<&'static str> {
        self.columns()
            .iter()
            .find(|c| c.kind == ColumnKind::Status)
            .map(|c| c.name)
    }
}

/// Defensive nested lookup; a missing or null step yields `None`
#[must_use]
pub fn pluck<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .filter(|v| !v.is_null())
}

/// Report file stem derived from a root domain (`hp.com/us` becomes `hp-com-us`)
#[must_use]
pub fn root_domain_slug(root_domain: &str) -> String {
    root_domain.replace(['.', '/'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pluck_is_defensive() {
        let payload = json!({"a": {"b": {"c": 1}}, "n": null, "s": "x"});
        assert_eq!(pluck(&payload, &["a", "b", "c"]), Some(&json!(1)));
        assert_eq!(pluck(&payload, &["a", "missing", "c"]), None);
        assert_eq!(pluck(&payload, &["n", "c"]), None);
        assert_eq!(pluck(&payload, &["s", "c"]), None);
        assert_eq!(pluck(&payload, &["n"]), None);
    }

    #[test]
    fn test_expected_values() {
        let one = ExpectedValue::TextIn(&["1"]);
        assert!(!one.deviates(&FieldValue::Int(1)));
        assert!(!one.deviates(&FieldValue::text("1")));
        assert!(one.deviates(&FieldValue::Int(0)));
        assert!(one.deviates(&FieldValue::Null));

        let not_true = ExpectedValue::NotBool(true);
        assert!(not_true.deviates(&FieldValue::Bool(true)));
        assert!(!not_true.deviates(&FieldValue::Bool(false)));
        assert!(!not_true.deviates(&FieldValue::Null));
    }

    #[test]
    fn test_root_domain_slug() {
        assert_eq!(root_domain_slug("hp.com/us"), "hp-com-us");
    }
}
