//! Shared strings table for string deduplication

use super::xml_writer::XmlWriter;
use crate::error::Result;
use std::collections::HashMap;
use std::io::Write;

/// Shared strings table that deduplicates strings across the workbook
#[derive(Debug, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
    string_map: HashMap<String, u32>,
    references: usize,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string and get its index
    pub fn add_string(&mut self, s: &str) -> u32 {
        self.references += 1;
        if let Some(&index) = self.string_map.get(s) {
            return index;
        }

        let index = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.string_map.insert(s.to_string(), index);
        index
    }

    /// Get number of unique strings
    pub fn count(&self) -> usize {
        self.strings.len()
    }

    /// Number of cells referencing the table
    pub fn references(&self) -> usize {
        self.references
    }

    /// Write `xl/sharedStrings.xml`
    pub fn write_xml<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()> {
        writer.declaration()?;
        writer.start_element("sst")?;
        writer.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        writer.attribute_int("count", self.references as i64)?;
        writer.attribute_int("uniqueCount", self.strings.len() as i64)?;
        writer.close_start_tag()?;

        for s in &self.strings {
            writer.start_element("si")?;
            writer.close_start_tag()?;

            writer.start_element("t")?;
            // Leading/trailing spaces are dropped by Excel unless preserved
            if s.starts_with(' ') || s.ends_with(' ') {
                writer.attribute("xml:space", "preserve")?;
            }
            writer.close_start_tag()?;
            writer.write_escaped(s)?;
            writer.end_element("t")?;

            writer.end_element("si")?;
        }

        writer.end_element("sst")?;
        writer.flush()?;
        Ok(())
    }
}
