//! Integration tests for easyexcel

use chrono::NaiveDate;
use easyexcel::prelude::*;
use std::io::{Cursor, Read};
use tempfile::TempDir;

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

fn clientes() -> ModelSchema {
    ModelSchema::new("Cliente")
        .verbose_name("cliente")
        .verbose_name_plural("clientes")
        .field(FieldDescriptor::new("id").primary_key())
        .field(FieldDescriptor::new("nombre").label("nombre completo"))
        .field(FieldDescriptor::new("ciudad"))
        .field(FieldDescriptor::new("alta"))
        .field(FieldDescriptor::new("vendedor").relation())
}

fn table() -> MemoryTable {
    let mut table = MemoryTable::new(["id", "nombre", "ciudad", "alta", "vendedor"]);
    let alta = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    table
        .insert(vec![1.into(), "Ana Torres".into(), "Lima".into(), alta.into(), 7.into()])
        .unwrap();
    table
        .insert(vec![2.into(), "Luis".into(), "Quito".into(), alta.into(), 7.into()])
        .unwrap();
    table
        .insert(vec![3.into(), "Marta".into(), "Lima".into(), CellValue::Empty, 8.into()])
        .unwrap();
    table
}

#[test]
fn test_export_default_view() {
    let view = ExportView::new(ExportConfig::new(clientes()), table()).unwrap();
    assert_eq!(view.fields(), ["id", "nombre", "ciudad", "alta"]);
    assert_eq!(view.header(), ["Id", "Nombre Completo", "Ciudad", "Alta"]);
    assert_eq!(view.sheet_name(), "Clientes");

    let response = view.export(&ExportRequest::default()).unwrap();
    assert!(response.filename().starts_with("Clientes3_"));
    assert!(response.filename().ends_with(".xlsx"));

    let sheet = read_part(response.body(), "xl/worksheets/sheet1.xml");
    assert_eq!(sheet.matches("<row ").count(), 4);
    assert!(sheet.contains("<dimension ref=\"A1:D4\"/>"));

    let strings = read_part(response.body(), "xl/sharedStrings.xml");
    for expected in ["Nombre Completo", "Ana Torres", "Quito"] {
        assert!(strings.contains(expected), "missing {}", expected);
    }

    let workbook = read_part(response.body(), "xl/workbook.xml");
    assert!(workbook.contains("name=\"Clientes\""));
}

#[test]
fn test_query_parameters_filter_rows() {
    let view = ExportView::new(ExportConfig::new(clientes()), table()).unwrap();
    let request = ExportRequest::new(FilterSet::from_query_str("?ciudad=Lima"));

    let mut workbook = view.workbook();
    workbook.add_custom_data(view.filters_from_request(&request));
    workbook.compile(view.source()).unwrap();
    assert_eq!(workbook.row_count(), 3);

    let response = view.export(&request).unwrap();
    let strings = read_part(response.body(), "xl/sharedStrings.xml");
    assert!(strings.contains("Marta"));
    assert!(!strings.contains("Quito"));
}

#[test]
fn test_unknown_filter_is_query_error() {
    let view = ExportView::new(ExportConfig::new(clientes()), table()).unwrap();
    let request = ExportRequest::new(FilterSet::from_query_str("pais=PE"));
    assert!(matches!(view.export(&request), Err(ExportError::Query(_))));
}

#[test]
fn test_transforms_and_extra_header() {
    let config = ExportConfig::new(clientes())
        .fields(["id", "nombre"])
        .header(["Código", "Nombre"])
        .header_extra(["Iniciales", "Letras"])
        .transform(ColumnTransform::replace("id", |v: &CellValue| {
            format!("C-{:03}", v.as_i64().unwrap_or_default())
        }))
        .transform_key("extra_nombre", |v: &CellValue| {
            v.as_string()
                .split_whitespace()
                .filter_map(|w| w.chars().next())
                .collect::<String>()
        })
        .transform(ColumnTransform::append("nombre", |v: &CellValue| {
            v.display_len() as i64
        }));
    let view = ExportView::new(config, table()).unwrap();
    assert_eq!(view.header(), ["Código", "Nombre", "Iniciales", "Letras"]);

    let mut workbook = view.workbook();
    workbook.compile(view.source()).unwrap();
    let sheet = workbook.worksheet();
    assert_eq!(sheet.column_count(), 4);

    let first: Vec<String> = sheet.rows()[1].iter().map(|c| c.value.as_string()).collect();
    assert_eq!(first, vec!["C-001", "Ana Torres", "AT", "10"]);
}

#[test]
fn test_header_mismatch_rejected_at_construction() {
    let config = ExportConfig::new(clientes())
        .fields(["id", "nombre"])
        .transform(ColumnTransform::append("nombre", |v: &CellValue| v.clone()));
    assert!(matches!(
        ExportView::new(config, table()),
        Err(ExportError::Config(_))
    ));

    let config = ExportConfig::new(clientes()).header(["Id"]);
    assert!(matches!(
        ExportView::new(config, table()),
        Err(ExportError::Config(_))
    ));
}

#[test]
fn test_relations_and_explicit_filename() {
    let config = ExportConfig::new(clientes())
        .with_relations(true)
        .filename("clientes.xlsx")
        .sheet_name("Cartera");
    let view = ExportView::new(config, table()).unwrap();
    assert_eq!(view.fields(), ["id", "nombre", "ciudad", "alta", "vendedor"]);

    let response = view.export(&ExportRequest::default()).unwrap();
    assert_eq!(response.filename(), "clientes.xlsx");
    assert_eq!(
        response.content_disposition(),
        "attachment; filename=clientes.xlsx"
    );
    let workbook = read_part(response.body(), "xl/workbook.xml");
    assert!(workbook.contains("name=\"Cartera\""));
}

#[test]
fn test_permission_denied_before_fetch() {
    let config = ExportConfig::new(clientes())
        .permission(|req: &ExportRequest| req.header("Authorization") == Some("Token ok"));
    let view = ExportView::new(config, table()).unwrap();

    let err = view.export(&ExportRequest::default()).unwrap_err();
    assert!(matches!(err, ExportError::PermissionDenied(_)));

    let request = ExportRequest::default().with_header("Authorization", "Token ok");
    assert!(view.export(&request).is_ok());
}

#[test]
fn test_column_widths_fit_content() {
    let view = ExportView::new(
        ExportConfig::new(clientes()).fields(["id", "nombre"]),
        table(),
    )
    .unwrap();
    let mut workbook = view.workbook();
    workbook.compile(view.source()).unwrap();

    // "Id" header is the longest value in column A
    assert_eq!(workbook.worksheet().column_width(0), Some(4.0));
    // "Nombre Completo" has 15 characters
    assert_eq!(workbook.worksheet().column_width(1), Some(17.0));
}

#[test]
fn test_empty_table_exports_header_only() {
    let view = ExportView::new(
        ExportConfig::new(clientes()),
        MemoryTable::new(["id", "nombre", "ciudad", "alta"]),
    )
    .unwrap();
    let at = NaiveDate::from_ymd_opt(2026, 10, 16)
        .unwrap()
        .and_hms_opt(9, 5, 0)
        .unwrap();
    assert_eq!(view.filename_at(at).unwrap(), "Clientes_16-10-2026_09-05.xlsx");

    let response = view.export(&ExportRequest::default()).unwrap();
    let sheet = read_part(response.body(), "xl/worksheets/sheet1.xml");
    assert_eq!(sheet.matches("<row ").count(), 1);
}

#[test]
fn test_save_workbook_to_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clientes.xlsx");

    let view = ExportView::new(ExportConfig::new(clientes()), table()).unwrap();
    let mut workbook = view.workbook();
    workbook.compile(view.source()).unwrap();
    workbook.save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], b"PK");
    assert_eq!(read_part(&bytes, "xl/worksheets/sheet1.xml").matches("<row ").count(), 4);
    assert!(read_part(&bytes, "xl/styles.xml").contains("<b/>"));
}

#[test]
fn test_prelude_with_boxed_errors() -> Result<(), Box<dyn std::error::Error>> {
    let view = ExportView::new(ExportConfig::new(clientes()), table())?;
    let response = view.export(&ExportRequest::default())?;
    assert_eq!(&response.body()[..2], b"PK");
    Ok(())
}
