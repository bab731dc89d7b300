//! Minimal XLSX writer
//!
//! A single worksheet is built in memory (so it can be styled and resized
//! after rows are written) and then serialised to an OOXML package:
//! - Direct XML generation through a buffered writer
//! - Shared strings deduplication
//! - A fixed style sheet with a configurable header style
//! - ZIP packaging into memory or a file

pub mod package;
pub mod shared_strings;
pub mod styles;
pub mod worksheet;
pub mod xml_writer;

pub use package::XlsxPackage;
pub use shared_strings::SharedStrings;
pub use styles::HeaderStyle;
pub use worksheet::{sanitize_sheet_name, Worksheet};
pub use xml_writer::XmlWriter;
