//! Workbook builder for a single export
//!
//! [`ExportWorkbook`] owns one worksheet and fills it in a fixed order:
//! header row, header style, transformed body rows, column widths. A workbook
//! is built for one request and discarded afterwards.
//!
//! ```
//! use easyexcel::query::MemoryTable;
//! use easyexcel::transform::RowTransform;
//! use easyexcel::workbook::ExportWorkbook;
//!
//! # fn main() -> easyexcel::Result<()> {
//! let mut table = MemoryTable::new(["id", "name"]);
//! table.insert(vec![1.into(), "Ana".into()])?;
//!
//! let fields = vec!["id".to_string(), "name".to_string()];
//! let header = vec!["ID".to_string(), "Name".to_string()];
//! let mut workbook = ExportWorkbook::new("People", fields, header, RowTransform::identity());
//! workbook.compile(&table)?;
//!
//! assert_eq!(workbook.row_count(), 2);
//! let bytes = workbook.to_bytes()?;
//! assert_eq!(&bytes[..2], b"PK");
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::query::{FilterSet, RowSource};
use crate::transform::RowTransform;
use crate::types::{CellStyle, CellValue, StyledCell};
use crate::xlsx::{HeaderStyle, Worksheet, XlsxPackage};
use std::path::Path;
use std::sync::Arc;

/// Characters added to the longest value of a column
pub const COLUMN_PADDING: usize = 2;

pub const DEFAULT_COMPRESSION_LEVEL: i64 = 6;

pub struct ExportWorkbook {
    worksheet: Worksheet,
    fields: Vec<String>,
    header: Vec<String>,
    transform: Arc<RowTransform>,
    filters: Option<FilterSet>,
    header_style: HeaderStyle,
    compression_level: i64,
}

impl ExportWorkbook {
    pub fn new(
        sheet_name: &str,
        fields: Vec<String>,
        header: Vec<String>,
        transform: impl Into<Arc<RowTransform>>,
    ) -> Self {
        ExportWorkbook {
            worksheet: Worksheet::new(sheet_name),
            fields,
            header,
            transform: transform.into(),
            filters: None,
            header_style: HeaderStyle::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    pub fn with_header_style(mut self, style: HeaderStyle) -> Self {
        self.header_style = style;
        self
    }

    /// Deflate level of the package, 1 (fastest) to 9
    pub fn with_compression_level(mut self, level: i64) -> Self {
        self.compression_level = level.clamp(1, 9);
        self
    }

    pub fn compression_level(&self) -> i64 {
        self.compression_level
    }

    /// Restrict the exported rows to those matching `filters`
    pub fn add_custom_data(&mut self, filters: FilterSet) {
        self.filters = Some(filters);
    }

    /// Append the header as the first row
    pub fn set_header(&mut self) {
        self.worksheet
            .append_row(self.header.iter().map(|h| CellValue::from(h.as_str())));
    }

    /// Apply the header style to every header cell
    pub fn set_style_header(&mut self) {
        for col in 0..self.header.len() {
            if let Some(cell) = self.worksheet.cell_mut(0, col) {
                cell.style = CellStyle::Header;
            }
        }
    }

    /// Fetch, transform and append the body rows in fetch order
    pub fn set_body_data<S: RowSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        let all = FilterSet::new();
        let filters = self.filters.as_ref().unwrap_or(&all);
        let rows = source.fetch(&self.fields, filters)?;
        tracing::debug!(rows = rows.len(), filters = filters.len(), "fetched export rows");

        let first = self.worksheet.row_count() as u32 + 1;
        let transformed = rows
            .iter()
            .enumerate()
            .map(|(i, row)| self.transform.apply(row, first + i as u32))
            .collect::<Result<Vec<_>>>()?;

        for row in transformed {
            self.worksheet
                .append_row(row.cells.into_iter().map(StyledCell::from));
        }
        Ok(())
    }

    /// Set every column's width to its longest value plus the padding
    pub fn set_adjust_column_width(&mut self) {
        for col in 0..self.worksheet.column_count() {
            let longest = self
                .worksheet
                .column(col)
                .map(CellValue::display_len)
                .max()
                .unwrap_or(0);
            self.worksheet
                .set_column_width(col as u32, (longest + COLUMN_PADDING) as f64);
        }
    }

    /// Run header, header style, body and width fitting in that order
    pub fn compile<S: RowSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        self.set_header();
        self.set_style_header();
        self.set_body_data(source)?;
        self.set_adjust_column_width();

        tracing::info!(
            sheet = %self.worksheet.name(),
            rows = self.worksheet.row_count(),
            columns = self.worksheet.column_count(),
            "compiled workbook"
        );
        Ok(())
    }

    pub fn worksheet(&self) -> &Worksheet {
        &self.worksheet
    }

    pub fn sheet_name(&self) -> &str {
        self.worksheet.name()
    }

    /// Rows written so far, header included
    pub fn row_count(&self) -> usize {
        self.worksheet.row_count()
    }

    /// Render the workbook as `.xlsx` bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.package().to_bytes()
    }

    /// Write the workbook to an `.xlsx` file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.package().save(path)
    }

    fn package(&self) -> XlsxPackage<'_> {
        XlsxPackage::new(&self.worksheet)
            .header_style(self.header_style.clone())
            .compression_level(self.compression_level)
    }
}
