//! OOXML package (the ZIP container) for a single-sheet workbook

use super::shared_strings::SharedStrings;
use super::styles::{write_styles, HeaderStyle};
use super::worksheet::Worksheet;
use super::xml_writer::XmlWriter;
use crate::error::Result;
use chrono::Utc;
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

const APP_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>easyexcel</Application>
<DocSecurity>0</DocSecurity>
<ScaleCrop>false</ScaleCrop>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
<AppVersion>1.0</AppVersion>
</Properties>"#;

/// Serialises one worksheet into a complete `.xlsx` package
pub struct XlsxPackage<'a> {
    sheet: &'a Worksheet,
    header_style: HeaderStyle,
    compression_level: i64,
}

impl<'a> XlsxPackage<'a> {
    pub fn new(sheet: &'a Worksheet) -> Self {
        XlsxPackage {
            sheet,
            header_style: HeaderStyle::default(),
            compression_level: 6,
        }
    }

    pub fn header_style(mut self, style: HeaderStyle) -> Self {
        self.header_style = style;
        self
    }

    /// Deflate level, clamped to 1..=9
    pub fn compression_level(mut self, level: i64) -> Self {
        self.compression_level = level.clamp(1, 9);
        self
    }

    /// Render the package into memory
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let cursor = self.write_to(Cursor::new(Vec::with_capacity(16 * 1024)))?;
        Ok(cursor.into_inner())
    }

    /// Write the package to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = self.write_to(BufWriter::with_capacity(64 * 1024, file))?;
        writer.flush()?;
        Ok(())
    }

    /// Write every part of the package and return the finished writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(ROOT_RELS.as_bytes())?;

        zip.start_file("docProps/core.xml", options)?;
        Self::write_core_props(&mut zip)?;

        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(APP_PROPS.as_bytes())?;

        // The sheet goes before the shared strings so the table is complete
        let mut shared_strings = SharedStrings::new();
        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        self.sheet
            .write_xml(&mut XmlWriter::new(&mut zip), &mut shared_strings)?;

        zip.start_file("xl/sharedStrings.xml", options)?;
        shared_strings.write_xml(&mut XmlWriter::new(&mut zip))?;

        zip.start_file("xl/workbook.xml", options)?;
        self.write_workbook_xml(&mut XmlWriter::new(&mut zip))?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(WORKBOOK_RELS.as_bytes())?;

        zip.start_file("xl/styles.xml", options)?;
        write_styles(&mut XmlWriter::new(&mut zip), &self.header_style)?;

        Ok(zip.finish()?)
    }

    fn write_core_props<W: Write>(writer: &mut W) -> Result<()> {
        let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:creator>easyexcel</dc:creator>
<cp:lastModifiedBy>easyexcel</cp:lastModifiedBy>
<dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created>
<dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified>
</cp:coreProperties>"#
        );
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml<W: Write>(&self, xml: &mut XmlWriter<W>) -> Result<()> {
        xml.declaration()?;
        xml.start_element("workbook")?;
        xml.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        xml.attribute(
            "xmlns:r",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
        )?;
        xml.close_start_tag()?;

        xml.start_element("sheets")?;
        xml.close_start_tag()?;
        xml.start_element("sheet")?;
        xml.attribute("name", self.sheet.name())?;
        xml.attribute_int("sheetId", 1)?;
        xml.attribute("r:id", "rId1")?;
        xml.close_empty()?;
        xml.end_element("sheets")?;

        xml.end_element("workbook")?;
        xml.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_package_parts() {
        let mut ws = Worksheet::new("Clientes & Co");
        ws.append_row([CellValue::from("Nombre")]);
        ws.append_row([CellValue::from("Ana")]);

        let bytes = XlsxPackage::new(&ws).to_bytes().unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<_> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/sharedStrings.xml",
            "xl/worksheets/sheet1.xml",
        ] {
            assert!(names.contains(&part), "missing {part}");
        }

        assert!(read_part(&bytes, "xl/workbook.xml").contains("name=\"Clientes &amp; Co\""));
        assert!(read_part(&bytes, "xl/sharedStrings.xml").contains("<t>Ana</t>"));
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.xlsx");

        let ws = Worksheet::new("Vacía");
        XlsxPackage::new(&ws).compression_level(12).save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(read_part(&bytes, "xl/worksheets/sheet1.xml").contains("<sheetData></sheetData>"));
    }
}
