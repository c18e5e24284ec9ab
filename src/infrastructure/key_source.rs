//! Key input: inline lists, spreadsheets and plain text files
//!
//! Keys are read completely before any task is scheduled. Spreadsheet cells
//! keep their numeric type so `KeyInput::normalize` can strip the `.0` that
//! spreadsheet tools add to numeric SKUs.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info};

use crate::domain::task::KeyInput;
use crate::infrastructure::config::InputConfig;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, thiserror::Error)]
pub enum KeySourceError {
    #[error("failed to read key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read spreadsheet {path}: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("spreadsheet {0} has no worksheet")]
    NoWorksheet(PathBuf),

    #[error("column '{column}' not found in the header row of {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("no keys found in {0}")]
    Empty(String),
}

/// Where the keys of a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Inline(Vec<String>),
    /// First worksheet, values of the named header column
    Spreadsheet { path: PathBuf, column: String },
    /// One key per line; blank lines and `#` comments are skipped
    TextFile(PathBuf),
}

impl KeySource {
    #[must_use]
    pub fn from_config(input: &InputConfig) -> Self {
        match &input.path {
            Some(path) if is_spreadsheet(path) => Self::Spreadsheet {
                path: path.clone(),
                column: input.column.clone(),
            },
            Some(path) => Self::TextFile(path.clone()),
            None => Self::Inline(input.keys.clone()),
        }
    }

    /// Read every key; an empty result is an error
    pub fn load(&self) -> Result<Vec<KeyInput>, KeySourceError> {
        let keys = match self {
            Self::Inline(keys) => keys
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(KeyInput::from)
                .collect(),
            Self::Spreadsheet { path, column } => read_spreadsheet(path, column)?,
            Self::TextFile(path) => read_text_file(path)?,
        };

        if keys.is_empty() {
            return Err(KeySourceError::Empty(self.to_string()));
        }
        info!("📥 Loaded {} keys from {}", keys.len(), self);
        Ok(keys)
    }
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(_) => write!(f, "inline key list"),
            Self::Spreadsheet { path, column } => write!(f, "{} (column '{}')", path.display(), column),
            Self::TextFile(path) => write!(f, "{}", path.display()),
        }
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn read_text_file(path: &Path) -> Result<Vec<KeyInput>, KeySourceError> {
    let content = std::fs::read_to_string(path).map_err(|source| KeySourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(KeyInput::from)
        .collect())
}

fn cell_key(cell: &Data) -> Option<KeyInput> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::Float(f) => Some(KeyInput::Number(*f)),
        #[allow(clippy::cast_precision_loss)]
        Data::Int(i) => Some(KeyInput::Number(*i as f64)),
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| KeyInput::from(s))
        }
        other => Some(KeyInput::Text(other.to_string())),
    }
}

fn read_spreadsheet(path: &Path, column: &str) -> Result<Vec<KeyInput>, KeySourceError> {
    let spreadsheet_error = |source| KeySourceError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| KeySourceError::NoWorksheet(path.to_path_buf()))?
        .map_err(spreadsheet_error)?;

    let mut rows = range.rows();
    let header = rows.next().unwrap_or_default();
    let index = header
        .iter()
        .position(|cell| matches!(cell, Data::String(name) if name.trim() == column))
        .ok_or_else(|| KeySourceError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })?;
    debug!("Key column '{}' found at index {}", column, index);

    Ok(rows
        .filter_map(|row| row.get(index).and_then(cell_key))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_source_selection() {
        let mut input = InputConfig::default();
        assert!(matches!(KeySource::from_config(&input), KeySource::Inline(_)));

        input.path = Some(PathBuf::from("keys.XLSX"));
        assert!(matches!(KeySource::from_config(&input), KeySource::Spreadsheet { .. }));

        input.path = Some(PathBuf::from("keys.txt"));
        assert!(matches!(KeySource::from_config(&input), KeySource::TextFile(_)));
    }

    #[test]
    fn test_inline_keys_skip_blanks() {
        let source = KeySource::Inline(vec!["A1".into(), "  ".into(), " b2 ".into()]);
        let keys = source.load().unwrap();
        assert_eq!(keys, vec![KeyInput::from("A1"), KeyInput::from("b2")]);
    }

    #[test]
    fn test_empty_source_is_an_error() {
        assert!(matches!(
            KeySource::Inline(Vec::new()).load(),
            Err(KeySourceError::Empty(_))
        ));
    }

    #[test]
    fn test_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.txt");
        std::fs::write(&path, "# search terms\nlaptop\n\n  Gaming Mouse \n").unwrap();

        let keys = KeySource::TextFile(path).load().unwrap();
        let normalized: Vec<String> = keys.iter().map(KeyInput::normalize).collect();
        assert_eq!(normalized, vec!["laptop", "gaming mouse"]);
    }

    #[test]
    fn test_spreadsheet_column_keeps_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skus.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "name").unwrap();
        sheet.write_string(0, 1, "sku").unwrap();
        sheet.write_string(1, 0, "first").unwrap();
        sheet.write_number(1, 1, 123.0).unwrap();
        sheet.write_string(2, 1, "6X3A8UA").unwrap();
        sheet.write_string(4, 1, "last").unwrap();
        workbook.save(&path).unwrap();

        let keys = KeySource::Spreadsheet {
            path,
            column: "sku".to_string(),
        }
        .load()
        .unwrap();
        let normalized: Vec<String> = keys.iter().map(KeyInput::normalize).collect();
        assert_eq!(normalized, vec!["123", "6x3a8ua", "last"]);
    }

    #[test]
    fn test_spreadsheet_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skus.xlsx");
        let mut workbook = Workbook::new();
        workbook.add_worksheet().write_string(0, 0, "id").unwrap();
        workbook.save(&path).unwrap();

        let result = KeySource::Spreadsheet {
            path,
            column: "sku".to_string(),
        }
        .load();
        assert!(matches!(result, Err(KeySourceError::MissingColumn { .. })));
    }
}
