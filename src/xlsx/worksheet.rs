//! In-memory worksheet and its `sheetN.xml` rendering

use super::shared_strings::SharedStrings;
use super::xml_writer::XmlWriter;
use crate::error::Result;
use crate::types::{cell_reference, CellStyle, CellValue, StyledCell};
use std::collections::BTreeMap;
use std::io::Write;

/// Longest sheet name Excel accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Replace characters Excel forbids in sheet names and cut to 31 characters
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let trimmed = cleaned.trim_matches('\'');
    if trimmed.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A worksheet kept entirely in memory until the package is written
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    rows: Vec<Vec<StyledCell>>,
    column_widths: BTreeMap<u32, f64>,
}

impl Worksheet {
    pub fn new(name: &str) -> Self {
        Worksheet {
            name: sanitize_sheet_name(name),
            rows: Vec::new(),
            column_widths: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a row below the last one
    pub fn append_row<I>(&mut self, cells: I)
    where
        I: IntoIterator,
        I::Item: Into<StyledCell>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row, in cells
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<StyledCell>] {
        &self.rows
    }

    /// Cell at 0-based coordinates
    pub fn cell(&self, row: usize, col: usize) -> Option<&StyledCell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut StyledCell> {
        self.rows.get_mut(row).and_then(|r| r.get_mut(col))
    }

    /// Values of one column, top to bottom, skipping rows too short to reach it
    pub fn column(&self, col: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().filter_map(move |r| r.get(col).map(|c| &c.value))
    }

    /// Set a column's display width in characters
    pub fn set_column_width(&mut self, col: u32, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// Render the worksheet part, registering strings in `shared_strings`
    pub fn write_xml<W: Write>(
        &self,
        xml: &mut XmlWriter<W>,
        shared_strings: &mut SharedStrings,
    ) -> Result<()> {
        xml.declaration()?;
        xml.start_element("worksheet")?;
        xml.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        xml.attribute(
            "xmlns:r",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
        )?;
        xml.close_start_tag()?;

        let columns = self.column_count();
        if columns > 0 && !self.rows.is_empty() {
            xml.start_element("dimension")?;
            let last = cell_reference(self.rows.len() as u32 - 1, columns as u32 - 1);
            xml.attribute("ref", &format!("A1:{}", last))?;
            xml.close_empty()?;
        }

        if !self.column_widths.is_empty() {
            xml.start_element("cols")?;
            xml.close_start_tag()?;
            for (&col, &width) in &self.column_widths {
                xml.start_element("col")?;
                xml.attribute_int("min", col as i64 + 1)?;
                xml.attribute_int("max", col as i64 + 1)?;
                xml.attribute("width", &width.to_string())?;
                xml.attribute("customWidth", "1")?;
                xml.close_empty()?;
            }
            xml.end_element("cols")?;
        }

        xml.start_element("sheetData")?;
        xml.close_start_tag()?;
        for (row_idx, row) in self.rows.iter().enumerate() {
            xml.start_element("row")?;
            xml.attribute_int("r", row_idx as i64 + 1)?;
            xml.close_start_tag()?;
            for (col_idx, cell) in row.iter().enumerate() {
                let reference = cell_reference(row_idx as u32, col_idx as u32);
                write_cell(xml, shared_strings, &reference, cell)?;
            }
            xml.end_element("row")?;
        }
        xml.end_element("sheetData")?;

        xml.end_element("worksheet")?;
        xml.flush()
    }
}

fn write_cell<W: Write>(
    xml: &mut XmlWriter<W>,
    shared_strings: &mut SharedStrings,
    reference: &str,
    cell: &StyledCell,
) -> Result<()> {
    let style = cell.style;
    let open = |xml: &mut XmlWriter<W>, cell_type: Option<&str>| -> Result<()> {
        xml.start_element("c")?;
        xml.attribute("r", reference)?;
        if style != CellStyle::Default {
            xml.attribute_int("s", style.index() as i64)?;
        }
        if let Some(t) = cell_type {
            xml.attribute("t", t)?;
        }
        Ok(())
    };
    let value = |xml: &mut XmlWriter<W>, v: &str| -> Result<()> {
        xml.close_start_tag()?;
        xml.start_element("v")?;
        xml.close_start_tag()?;
        xml.write_str(v)?;
        xml.end_element("v")?;
        xml.end_element("c")
    };

    match &cell.value {
        CellValue::Empty => {
            // Styled blanks keep their formatting (header borders)
            if style != CellStyle::Default {
                open(xml, None)?;
                xml.close_empty()?;
            }
            Ok(())
        }
        CellValue::String(s) => {
            let index = shared_strings.add_string(s);
            open(xml, Some("s"))?;
            value(xml, &index.to_string())
        }
        CellValue::Int(i) => {
            open(xml, None)?;
            value(xml, &i.to_string())
        }
        CellValue::Float(f) if f.is_finite() => {
            open(xml, None)?;
            value(xml, &f.to_string())
        }
        CellValue::Float(f) => {
            let index = shared_strings.add_string(&f.to_string());
            open(xml, Some("s"))?;
            value(xml, &index.to_string())
        }
        CellValue::Bool(b) => {
            open(xml, Some("b"))?;
            value(xml, if *b { "1" } else { "0" })
        }
        CellValue::Date(_) | CellValue::DateTime(_) => {
            let serial = cell.value.excel_serial().unwrap_or_default();
            open(xml, None)?;
            value(xml, &serial.to_string())
        }
    }
}
