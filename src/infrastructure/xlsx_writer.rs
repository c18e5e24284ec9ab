//! Spreadsheet report writer
//!
//! One worksheet per report: a header row followed by one row per record, in
//! declared column order. Annotated cells get a solid fill of their highlight
//! colour.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::application::report::{CellRef, Highlight, Report, ReportError, ReportSink};
use crate::domain::record::FieldValue;

/// Longest string a worksheet cell accepts
const MAX_CELL_TEXT: usize = 32_767;

/// Writes `.xlsx` reports with `rust_xlsxwriter`
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxReportWriter;

impl XlsxReportWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

struct Formats {
    plain: Format,
    header: Format,
    missing: Format,
    error: Format,
}

impl Formats {
    fn new() -> Self {
        let fill = |highlight: Highlight| {
            Format::new()
                .set_pattern(FormatPattern::Solid)
                .set_background_color(Color::RGB(highlight.rgb()))
        };
        Self {
            plain: Format::new(),
            header: Format::new().set_bold(),
            missing: fill(Highlight::Missing),
            error: fill(Highlight::Error),
        }
    }

    fn cell(&self, highlight: Option<Highlight>) -> &Format {
        match highlight {
            None => &self.plain,
            Some(Highlight::Missing) => &self.missing,
            Some(Highlight::Error) => &self.error,
        }
    }

    fn header(&self, highlight: Option<Highlight>) -> Format {
        match highlight {
            None => self.header.clone(),
            Some(highlight) => self.cell(Some(highlight)).clone().set_bold(),
        }
    }
}

fn truncate_cell_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_TEXT) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn write_value(
    sheet: &mut Worksheet,
    row: u32,
    column: u16,
    value: &FieldValue,
    format: &Format,
) -> Result<(), XlsxError> {
    match value {
        FieldValue::Null => sheet.write_blank(row, column, format)?,
        FieldValue::Bool(b) => sheet.write_boolean_with_format(row, column, *b, format)?,
        #[allow(clippy::cast_precision_loss)]
        FieldValue::Int(n) => sheet.write_number_with_format(row, column, *n as f64, format)?,
        FieldValue::Float(f) => sheet.write_number_with_format(row, column, *f, format)?,
        FieldValue::Text(s) => {
            sheet.write_string_with_format(row, column, truncate_cell_text(s), format)?
        }
        FieldValue::Compound(_) => {
            let text = value.as_text();
            sheet.write_string_with_format(row, column, truncate_cell_text(&text), format)?
        }
    };
    Ok(())
}

fn grid_index<T: TryFrom<usize>>(index: usize, what: &str) -> Result<T, ReportError> {
    T::try_from(index).map_err(|_| ReportError::TooLarge(format!("{what} {index}")))
}

impl XlsxReportWriter {
    fn fill_sheet(&self, sheet: &mut Worksheet, report: &Report) -> Result<(), ReportError> {
        let formats = Formats::new();
        let xlsx = |e: XlsxError| ReportError::Write {
            path: report.sheet_title().to_string(),
            source: Box::new(e),
        };

        sheet.set_name(report.sheet_title()).map_err(xlsx)?;

        for (index, column) in report.columns().iter().enumerate() {
            let col: u16 = grid_index(index, "column")?;
            let format = formats.header(report.highlight(CellRef::Header { column: index }));
            sheet
                .write_string_with_format(0, col, column.name, &format)
                .map_err(xlsx)?;
        }

        for (row_index, record) in report.records().iter().enumerate() {
            let row: u32 = grid_index(row_index + 1, "row")?;
            for (index, value) in record.values().enumerate() {
                let col: u16 = grid_index(index, "column")?;
                let highlight = report.highlight(CellRef::Cell {
                    row: row_index,
                    column: index,
                });
                write_value(sheet, row, col, value, formats.cell(highlight)).map_err(xlsx)?;
            }
        }
        Ok(())
    }
}

impl ReportSink for XlsxReportWriter {
    fn write(&self, report: &Report, path: &Path) -> Result<(), ReportError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        self.fill_sheet(sheet, report)?;

        workbook.save(path).map_err(|e| ReportError::Write {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        info!(
            "💾 Report saved to {} ({} rows)",
            path.display(),
            report.records().len()
        );
        Ok(())
    }
}
