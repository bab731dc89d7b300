//! Style sheet (`xl/styles.xml`)
//!
//! The cell formats are laid out so that their `cellXfs` index matches
//! [`CellStyle::index`](crate::types::CellStyle::index).

use super::xml_writer::XmlWriter;
use crate::error::Result;
use std::io::Write;

/// Colours of the header row (hex RGB without `#`)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderStyle {
    pub font_color: String,
    pub border_color: String,
    pub fill_color: String,
}

impl Default for HeaderStyle {
    fn default() -> Self {
        HeaderStyle {
            font_color: "0A0A1E".to_string(),
            border_color: "0A0A1E".to_string(),
            fill_color: "EEF7FF".to_string(),
        }
    }
}

/// ARGB value for an RGB hex string
fn argb(rgb: &str) -> String {
    format!("FF{}", rgb.trim_start_matches('#').to_ascii_uppercase())
}

/// Write the style sheet for the given header colours
pub fn write_styles<W: Write>(xml: &mut XmlWriter<W>, header: &HeaderStyle) -> Result<()> {
    xml.declaration()?;
    xml.start_element("styleSheet")?;
    xml.attribute(
        "xmlns",
        "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
    )?;
    xml.close_start_tag()?;

    xml.write_str(
        "<numFmts count=\"1\"><numFmt numFmtId=\"164\" formatCode=\"dd/mm/yyyy hh:mm:ss\"/></numFmts>",
    )?;

    // fonts: 0 = default, 1 = header
    xml.write_str("<fonts count=\"2\">")?;
    xml.write_str("<font><sz val=\"11\"/><name val=\"Calibri\"/><family val=\"2\"/></font>")?;
    xml.write_str("<font><b/><sz val=\"11\"/>")?;
    xml.start_element("color")?;
    xml.attribute("rgb", &argb(&header.font_color))?;
    xml.close_empty()?;
    xml.write_str("<name val=\"Calibri\"/><family val=\"2\"/></font>")?;
    xml.end_element("fonts")?;

    // fills: 0 and 1 are reserved by Excel, 2 = header
    xml.write_str("<fills count=\"3\">")?;
    xml.write_str("<fill><patternFill patternType=\"none\"/></fill>")?;
    xml.write_str("<fill><patternFill patternType=\"gray125\"/></fill>")?;
    xml.write_str("<fill><patternFill patternType=\"solid\">")?;
    let fill = argb(&header.fill_color);
    xml.start_element("fgColor")?;
    xml.attribute("rgb", &fill)?;
    xml.close_empty()?;
    xml.start_element("bgColor")?;
    xml.attribute("rgb", &fill)?;
    xml.close_empty()?;
    xml.write_str("</patternFill></fill>")?;
    xml.end_element("fills")?;

    // borders: 0 = none, 1 = thin on all four sides
    xml.write_str("<borders count=\"2\">")?;
    xml.write_str("<border><left/><right/><top/><bottom/><diagonal/></border>")?;
    xml.write_str("<border>")?;
    let border = argb(&header.border_color);
    for side in ["left", "right", "top", "bottom"] {
        xml.start_element(side)?;
        xml.attribute("style", "thin")?;
        xml.close_start_tag()?;
        xml.start_element("color")?;
        xml.attribute("rgb", &border)?;
        xml.close_empty()?;
        xml.end_element(side)?;
    }
    xml.write_str("<diagonal/></border>")?;
    xml.end_element("borders")?;

    xml.write_str(
        "<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>",
    )?;

    xml.write_str("<cellXfs count=\"4\">")?;
    xml.write_str("<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>")?;
    xml.write_str(
        "<xf numFmtId=\"0\" fontId=\"1\" fillId=\"2\" borderId=\"1\" xfId=\"0\" applyFont=\"1\" applyFill=\"1\" applyBorder=\"1\" applyAlignment=\"1\">\
<alignment horizontal=\"center\" vertical=\"center\"/></xf>",
    )?;
    xml.write_str(
        "<xf numFmtId=\"14\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyNumberFormat=\"1\"/>",
    )?;
    xml.write_str(
        "<xf numFmtId=\"164\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyNumberFormat=\"1\"/>",
    )?;
    xml.end_element("cellXfs")?;

    xml.write_str(
        "<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>",
    )?;
    xml.end_element("styleSheet")?;
    xml.flush()
}
