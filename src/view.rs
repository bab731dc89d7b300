//! Export view: configuration, validation and the per-request export
//!
//! An [`ExportView`] is built once from an [`ExportConfig`] and a
//! [`RowSource`]. Everything that can be checked without touching the data is
//! resolved in [`ExportView::new`], so a misconfigured view fails before it
//! serves a single request.
//!
//! ```
//! use easyexcel::prelude::*;
//!
//! # fn main() -> easyexcel::Result<()> {
//! let model = ModelSchema::new("Cliente")
//!     .verbose_name_plural("clientes")
//!     .field(FieldDescriptor::new("id").primary_key())
//!     .field(FieldDescriptor::new("nombre"));
//!
//! let mut table = MemoryTable::new(["id", "nombre"]);
//! table.insert(vec![1.into(), "Ana".into()])?;
//!
//! let config = ExportConfig::new(model)
//!     .header_extra(["Nombre (mayúsculas)"])
//!     .transform(ColumnTransform::append("nombre", |v: &CellValue| {
//!         v.as_string().to_uppercase()
//!     }));
//! let view = ExportView::new(config, table)?;
//!
//! let response = view.export(&ExportRequest::default())?;
//! assert!(response.filename().starts_with("Clientes1_"));
//! # Ok(())
//! # }
//! ```

use crate::error::{ExportError, Result};
use crate::query::{ExportRequest, FilterSet, RowSource};
use crate::response::ExcelResponse;
use crate::schema::{resolve_fields, resolve_header, validate_header, ModelSchema};
use crate::transform::{ColumnTransform, Derived, RowTransform, TransformFn};
use crate::types::CellValue;
use crate::workbook::{ExportWorkbook, DEFAULT_COMPRESSION_LEVEL};
use crate::xlsx::{sanitize_sheet_name, HeaderStyle};
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::sync::Arc;

/// Access check run before any export work
pub trait Permission: Send + Sync {
    fn has_permission(&self, request: &ExportRequest) -> bool;

    fn message(&self) -> String {
        "You do not have permission to perform this action.".to_string()
    }
}

impl<F> Permission for F
where
    F: Fn(&ExportRequest) -> bool + Send + Sync,
{
    fn has_permission(&self, request: &ExportRequest) -> bool {
        self(request)
    }
}

/// Permission that lets every request through
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAny;

impl Permission for AllowAny {
    fn has_permission(&self, _request: &ExportRequest) -> bool {
        true
    }
}

/// Configuration surface of an export view
#[derive(Clone)]
pub struct ExportConfig {
    model: ModelSchema,
    fields: Option<Vec<String>>,
    filename: Option<String>,
    sheet_name: Option<String>,
    header: Option<Vec<String>>,
    header_extra: Option<Vec<String>>,
    with_relations: bool,
    transforms: Vec<TransformEntry>,
    permissions: Vec<Arc<dyn Permission>>,
    header_style: HeaderStyle,
    compression_level: i64,
}

/// A configured transform, keyed ones resolved once the fields are known
#[derive(Clone)]
enum TransformEntry {
    Typed(ColumnTransform),
    Keyed {
        key: String,
        width: usize,
        f: TransformFn,
    },
}

fn owned<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl ExportConfig {
    pub fn new(model: ModelSchema) -> Self {
        ExportConfig {
            model,
            fields: None,
            filename: None,
            sheet_name: None,
            header: None,
            header_extra: None,
            with_relations: false,
            transforms: Vec::new(),
            permissions: Vec::new(),
            header_style: HeaderStyle::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Fields to export; defaults to the model's plain fields
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(owned(fields));
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet_name.into());
        self
    }

    /// Labels for the exported fields
    pub fn header<I, S>(mut self, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = Some(owned(header));
        self
    }

    /// Labels for the appended columns
    pub fn header_extra<I, S>(mut self, header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header_extra = Some(owned(header));
        self
    }

    /// Also export relational fields, starting at the primary key
    pub fn with_relations(mut self, with_relations: bool) -> Self {
        self.with_relations = with_relations;
        self
    }

    pub fn transform(mut self, transform: ColumnTransform) -> Self {
        self.transforms.push(TransformEntry::Typed(transform));
        self
    }

    /// Transform addressed by a `field` or `<prefix>_<field>` key, resolved
    /// against the final field list when the view is built
    pub fn transform_key<F, T>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&CellValue) -> T + Send + Sync + 'static,
        T: Into<Derived>,
    {
        self.transform_key_columns(key, 1, f)
    }

    /// Keyed transform appending `width` columns from a sequence result
    pub fn transform_key_columns<F, T>(mut self, key: impl Into<String>, width: usize, f: F) -> Self
    where
        F: Fn(&CellValue) -> T + Send + Sync + 'static,
        T: Into<Derived>,
    {
        let callback: TransformFn =
            Arc::new(move |value: &CellValue| -> Derived { f(value).into() });
        self.transforms.push(TransformEntry::Keyed {
            key: key.into(),
            width,
            f: callback,
        });
        self
    }

    pub fn permission(mut self, permission: impl Permission + 'static) -> Self {
        self.permissions.push(Arc::new(permission));
        self
    }

    pub fn header_style(mut self, style: HeaderStyle) -> Self {
        self.header_style = style;
        self
    }

    /// Deflate level of the generated file
    pub fn compression_level(mut self, level: i64) -> Self {
        self.compression_level = level;
        self
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("model", &self.model.name)
            .field("fields", &self.fields)
            .field("filename", &self.filename)
            .field("sheet_name", &self.sheet_name)
            .field("header", &self.header)
            .field("header_extra", &self.header_extra)
            .field("with_relations", &self.with_relations)
            .field("transforms", &self.transforms)
            .field("permissions", &self.permissions.len())
            .field("compression_level", &self.compression_level)
            .finish()
    }
}

impl fmt::Debug for TransformEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformEntry::Typed(transform) => fmt::Debug::fmt(transform, f),
            TransformEntry::Keyed { key, width, .. } => f
                .debug_struct("Keyed")
                .field("key", key)
                .field("width", width)
                .finish(),
        }
    }
}

/// `<sheetName><lastRecordId>_<DD-MM-YYYY_HH-MM>.xlsx`
pub fn default_filename(sheet_name: &str, last_id: Option<i64>, now: NaiveDateTime) -> String {
    let id = last_id.map(|id| id.to_string()).unwrap_or_default();
    format!("{}{}_{}.xlsx", sheet_name, id, now.format("%d-%m-%Y_%H-%M"))
}

/// A validated export over a row source
pub struct ExportView<S> {
    source: S,
    model: ModelSchema,
    fields: Vec<String>,
    header: Vec<String>,
    sheet_name: String,
    filename: Option<String>,
    transform: Arc<RowTransform>,
    permissions: Vec<Arc<dyn Permission>>,
    header_style: HeaderStyle,
    compression_level: i64,
}

impl<S: RowSource> ExportView<S> {
    /// Resolve fields, header, sheet name and transforms, failing on any
    /// configuration mismatch.
    pub fn new(config: ExportConfig, source: S) -> Result<Self> {
        let ExportConfig {
            model,
            fields,
            filename,
            sheet_name,
            header,
            header_extra,
            with_relations,
            transforms,
            permissions,
            header_style,
            compression_level,
        } = config;

        let fields = resolve_fields(&model, fields.as_deref(), with_relations)?;
        if fields.is_empty() {
            return Err(ExportError::config(format!(
                "model '{}' has no exportable fields",
                model.name
            )));
        }

        let transforms = transforms
            .into_iter()
            .map(|entry| match entry {
                TransformEntry::Typed(transform) => Ok(transform),
                TransformEntry::Keyed { key, width, f } => {
                    ColumnTransform::keyed(&key, width, &fields, f)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let transform = RowTransform::build(&transforms, &fields)?;

        let header = resolve_header(&model, &fields, header.as_deref(), header_extra.as_deref());
        validate_header(&fields, &header, transform.appended_columns())?;

        let sheet_name = sheet_name.unwrap_or_else(|| model.display_title());

        tracing::debug!(
            model = %model.name,
            sheet = %sheet_name,
            fields = ?fields,
            header = ?header,
            transforms = ?transform,
            "configured export view"
        );

        Ok(ExportView {
            source,
            model,
            fields,
            header,
            sheet_name,
            filename,
            transform: Arc::new(transform),
            permissions,
            header_style,
            compression_level,
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn model(&self) -> &ModelSchema {
        &self.model
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Configured filename, else one derived from the sheet name, the last
    /// record id and the current local time
    pub fn filename(&self) -> Result<String> {
        self.filename_at(Local::now().naive_local())
    }

    pub fn filename_at(&self, now: NaiveDateTime) -> Result<String> {
        match &self.filename {
            Some(filename) => Ok(filename.clone()),
            None => Ok(default_filename(
                &sanitize_sheet_name(&self.sheet_name),
                self.source.last_id()?,
                now,
            )),
        }
    }

    /// Run every permission; the first denial wins
    pub fn check_permissions(&self, request: &ExportRequest) -> Result<()> {
        for permission in &self.permissions {
            if !permission.has_permission(request) {
                let message = permission.message();
                tracing::warn!(model = %self.model.name, %message, "export denied");
                return Err(ExportError::PermissionDenied(message));
            }
        }
        Ok(())
    }

    /// Equality filters taken verbatim from the request's query parameters
    pub fn filters_from_request(&self, request: &ExportRequest) -> FilterSet {
        request.query.clone()
    }

    /// A fresh, empty workbook for this view
    pub fn workbook(&self) -> ExportWorkbook {
        ExportWorkbook::new(
            &self.sheet_name,
            self.fields.clone(),
            self.header.clone(),
            Arc::clone(&self.transform),
        )
        .with_header_style(self.header_style.clone())
        .with_compression_level(self.compression_level)
    }

    /// Build the spreadsheet for one request
    pub fn export(&self, request: &ExportRequest) -> Result<ExcelResponse> {
        self.check_permissions(request)?;

        let mut workbook = self.workbook();
        let filters = self.filters_from_request(request);
        if !filters.is_empty() {
            tracing::debug!(filters = ?filters, "filtering export");
            workbook.add_custom_data(filters);
        }
        workbook.compile(&self.source)?;

        let filename = self.filename()?;
        let body = workbook.to_bytes()?;
        tracing::info!(
            %filename,
            rows = workbook.row_count().saturating_sub(1),
            bytes = body.len(),
            "export ready"
        );
        Ok(ExcelResponse::new(filename, body))
    }
}

impl<S> fmt::Debug for ExportView<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportView")
            .field("model", &self.model.name)
            .field("fields", &self.fields)
            .field("header", &self.header)
            .field("sheet_name", &self.sheet_name)
            .field("filename", &self.filename)
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::MemoryTable;
    use crate::schema::FieldDescriptor;
    use chrono::NaiveDate;
    use std::cell::Cell;

    fn model() -> ModelSchema {
        ModelSchema::new("Cliente")
            .verbose_name("cliente")
            .verbose_name_plural("clientes")
            .field(FieldDescriptor::new("uuid").identifier())
            .field(FieldDescriptor::new("id").primary_key())
            .field(FieldDescriptor::new("nombre"))
            .field(FieldDescriptor::new("ciudad").relation())
    }

    fn table() -> MemoryTable {
        let mut t = MemoryTable::new(["uuid", "id", "nombre", "ciudad"]);
        t.insert(vec!["a1".into(), 1.into(), "Ana".into(), "Lima".into()])
            .unwrap();
        t.insert(vec!["b2".into(), 7.into(), "Luis".into(), "Quito".into()])
            .unwrap();
        t
    }

    /// Row source that counts fetches
    struct Counting {
        inner: MemoryTable,
        fetches: Cell<usize>,
    }

    impl RowSource for Counting {
        fn fetch(&self, fields: &[String], filters: &FilterSet) -> Result<Vec<crate::types::Row>> {
            self.fetches.set(self.fetches.get() + 1);
            self.inner.fetch(fields, filters)
        }

        fn last_id(&self) -> Result<Option<i64>> {
            self.inner.last_id()
        }
    }

    #[test]
    fn test_defaults_resolved_from_model() {
        let view = ExportView::new(ExportConfig::new(model()), table()).unwrap();
        assert_eq!(view.fields(), ["id", "nombre"]);
        assert_eq!(view.header(), ["Id", "Nombre"]);
        assert_eq!(view.sheet_name(), "Clientes");
    }

    #[test]
    fn test_default_filename_pattern() {
        let view = ExportView::new(ExportConfig::new(model()), table()).unwrap();
        let now = NaiveDate::from_ymd_opt(2026, 3, 5)
            .unwrap()
            .and_hms_opt(8, 4, 0)
            .unwrap();
        assert_eq!(view.filename_at(now).unwrap(), "Clientes7_05-03-2026_08-04.xlsx");
    }

    #[test]
    fn test_explicit_filename_wins() {
        let view = ExportView::new(
            ExportConfig::new(model()).filename("clientes.xlsx"),
            table(),
        )
        .unwrap();
        assert_eq!(view.filename().unwrap(), "clientes.xlsx");
    }

    #[test]
    fn test_header_mismatch_fails_before_fetch() {
        let source = Counting {
            inner: table(),
            fetches: Cell::new(0),
        };
        let config = ExportConfig::new(model())
            .fields(["id", "nombre", "ciudad"])
            .header(["ID", "Nombre"]);
        let err = ExportView::new(config, &source).unwrap_err();
        assert!(matches!(err, ExportError::Config(_)));
        assert_eq!(source.fetches.get(), 0);
    }

    #[test]
    fn test_extra_header_must_match_appended_columns() {
        let config = ExportConfig::new(model())
            .transform_key("extra1_nombre", |v: &CellValue| v.as_string().len() as i64);
        assert!(matches!(
            ExportView::new(config, table()),
            Err(ExportError::Config(_))
        ));

        let config = ExportConfig::new(model())
            .header_extra(["Largo"])
            .transform_key("extra1_nombre", |v: &CellValue| v.as_string().len() as i64);
        let view = ExportView::new(config, table()).unwrap();
        assert_eq!(view.header(), ["Id", "Nombre", "Largo"]);
    }

    #[test]
    fn test_mixed_transforms_keep_insertion_order() {
        let config = ExportConfig::new(model())
            .header_extra(["Primero", "Segundo"])
            .transform_key("a_nombre", |_: &CellValue| "first")
            .transform(ColumnTransform::append("nombre", |_: &CellValue| "second"));
        let view = ExportView::new(config, table()).unwrap();

        let mut workbook = view.workbook();
        workbook.compile(view.source()).unwrap();
        let row: Vec<_> = workbook.worksheet().rows()[1]
            .iter()
            .map(|c| c.value.as_string())
            .collect();
        assert_eq!(row, vec!["1", "Ana", "first", "second"]);
    }

    #[test]
    fn test_keyed_sequence_appends_every_element() {
        let config = ExportConfig::new(model())
            .header_extra(["Upper", "Lower"])
            .transform_key_columns("extra1_nombre", 2, |v: &CellValue| {
                vec![
                    CellValue::String(v.as_string().to_uppercase()),
                    CellValue::String(v.as_string().to_lowercase()),
                ]
            });
        let view = ExportView::new(config, table()).unwrap();
        assert_eq!(view.header(), ["Id", "Nombre", "Upper", "Lower"]);

        let mut workbook = view.workbook();
        workbook.compile(view.source()).unwrap();
        let row: Vec<_> = workbook.worksheet().rows()[2]
            .iter()
            .map(|c| c.value.as_string())
            .collect();
        assert_eq!(row, vec!["7", "Luis", "LUIS", "luis"]);
    }

    #[test]
    fn test_default_filename_uses_sanitised_sheet_name() {
        let view = ExportView::new(
            ExportConfig::new(model()).sheet_name("Ventas 2024/Q1"),
            table(),
        )
        .unwrap();
        let now = NaiveDate::from_ymd_opt(2026, 3, 5)
            .unwrap()
            .and_hms_opt(8, 4, 0)
            .unwrap();
        assert_eq!(
            view.filename_at(now).unwrap(),
            "Ventas 2024_Q17_05-03-2026_08-04.xlsx"
        );
        assert_eq!(view.workbook().sheet_name(), "Ventas 2024_Q1");
    }

    #[test]
    fn test_compression_level_reaches_workbook() {
        let view = ExportView::new(
            ExportConfig::new(model()).compression_level(1),
            table(),
        )
        .unwrap();
        assert_eq!(view.workbook().compression_level(), 1);
    }

    #[test]
    fn test_unresolvable_key_is_config_error() {
        let config = ExportConfig::new(model())
            .header_extra(["X"])
            .transform_key("extra1_ciudad", |v: &CellValue| v.clone());
        assert!(matches!(
            ExportView::new(config, table()),
            Err(ExportError::Config(_))
        ));
    }

    #[test]
    fn test_permission_denied_before_fetch() {
        let source = Counting {
            inner: table(),
            fetches: Cell::new(0),
        };
        let view = ExportView::new(
            ExportConfig::new(model())
                .permission(AllowAny)
                .permission(|req: &ExportRequest| req.header("x-api-key") == Some("secret")),
            &source,
        )
        .unwrap();

        let err = view.export(&ExportRequest::default()).unwrap_err();
        assert!(matches!(err, ExportError::PermissionDenied(_)));
        assert_eq!(source.fetches.get(), 0);

        let request = ExportRequest::default().with_header("X-Api-Key", "secret");
        assert!(view.export(&request).is_ok());
        assert_eq!(source.fetches.get(), 1);
    }

    #[test]
    fn test_export_with_query_filters() {
        let view = ExportView::new(
            ExportConfig::new(model()).with_relations(true),
            table(),
        )
        .unwrap();
        assert_eq!(view.fields(), ["id", "nombre", "ciudad"]);

        let request = ExportRequest::new(FilterSet::from_query_str("ciudad=Quito"));
        let mut workbook = view.workbook();
        workbook.add_custom_data(view.filters_from_request(&request));
        workbook.compile(view.source()).unwrap();
        assert_eq!(workbook.row_count(), 2);

        let response = view.export(&request).unwrap();
        assert_eq!(&response.body()[..2], b"PK");
    }
}
