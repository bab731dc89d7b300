//! # easyexcel
//!
//! Export the rows of a model to a downloadable Excel workbook.
//!
//! ## Features
//!
//! - **Declarative views**: describe a model once, export it on every request
//! - **Query filters**: request parameters become equality filters
//! - **Row transforms**: replace values in place or append derived columns
//! - **Styled output**: coloured bold header, fitted column widths
//! - **Fail fast**: header and transform mismatches are rejected at construction
//! - **Row sources**: in-memory tables, PostgreSQL (`postgres` feature)
//! - **HTTP**: axum handler and router (`http` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use easyexcel::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = ModelSchema::new("Cliente")
//!     .verbose_name_plural("clientes")
//!     .field(FieldDescriptor::new("id").primary_key())
//!     .field(FieldDescriptor::new("nombre"))
//!     .field(FieldDescriptor::new("ciudad"));
//!
//! let mut table = MemoryTable::new(["id", "nombre", "ciudad"]);
//! table.insert(vec![1.into(), "Ana".into(), "Lima".into()])?;
//! table.insert(vec![2.into(), "Luis".into(), "Quito".into()])?;
//!
//! let view = ExportView::new(ExportConfig::new(model), table)?;
//!
//! // GET /clientes/export?ciudad=Lima
//! let request = ExportRequest::new(FilterSet::from_query_str("ciudad=Lima"));
//! let response = view.export(&request)?;
//!
//! assert!(response.filename().starts_with("Clientes2_"));
//! std::fs::write(response.filename(), response.body())?;
//! # std::fs::remove_file(response.filename())?;
//! # Ok(())
//! # }
//! ```

pub mod error;
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;
pub mod response;
pub mod schema;
pub mod transform;
pub mod types;
pub mod view;
pub mod workbook;
pub mod xlsx;

pub use error::{ExportError, Result};
pub use query::{ExportRequest, FilterSet, MemoryTable, RowSource};
pub use response::ExcelResponse;
pub use schema::{FieldDescriptor, ModelSchema};
pub use transform::{ColumnTransform, Derived, RowTransform};
pub use types::{CellStyle, CellValue, Row, StyledCell};
pub use view::{AllowAny, ExportConfig, ExportView, Permission};
pub use workbook::ExportWorkbook;

/// Everything needed to declare and serve an export
pub mod prelude {
    pub use crate::error::ExportError;
    pub use crate::query::{ExportRequest, FilterSet, MemoryTable, RowSource};
    pub use crate::response::ExcelResponse;
    pub use crate::schema::{FieldDescriptor, ModelSchema};
    pub use crate::transform::{ColumnTransform, Derived, RowTransform};
    pub use crate::types::{CellValue, Row};
    pub use crate::view::{AllowAny, ExportConfig, ExportView, Permission};
    pub use crate::workbook::ExportWorkbook;
    pub use crate::xlsx::HeaderStyle;
}
