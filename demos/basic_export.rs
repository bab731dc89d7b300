//! Example: export an in-memory table to an Excel file
//!
//! Builds a view with an explicit header, one replacing transform and two
//! appended columns, then writes the filtered export to disk.

use chrono::NaiveDate;
use easyexcel::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Basic Export ===\n");

    let model = ModelSchema::new("Cliente")
        .table("clientes")
        .verbose_name("cliente")
        .verbose_name_plural("clientes")
        .field(FieldDescriptor::new("id").primary_key())
        .field(FieldDescriptor::new("nombre"))
        .field(FieldDescriptor::new("email"))
        .field(FieldDescriptor::new("ciudad"))
        .field(FieldDescriptor::new("fecha_alta"))
        .field(FieldDescriptor::new("activo"));

    let mut table = MemoryTable::new(["id", "nombre", "email", "ciudad", "fecha_alta", "activo"]);
    let cities = ["Lima", "Quito", "Bogotá"];
    for i in 1..=30i64 {
        let alta = NaiveDate::from_ymd_opt(2024, 1 + (i % 12) as u32, 1 + (i % 28) as u32)
            .ok_or("invalid date")?;
        table.insert(vec![
            i.into(),
            format!("cliente {}", i).into(),
            format!("cliente{}@example.com", i).into(),
            cities[(i % 3) as usize].into(),
            alta.into(),
            (i % 4 != 0).into(),
        ])?;
    }

    let config = ExportConfig::new(model)
        .header_extra(["Dominio", "Año de alta"])
        .transform(ColumnTransform::replace("nombre", |v: &CellValue| {
            easyexcel::schema::title_case(&v.as_string())
        }))
        .transform_key("dominio_email", |v: &CellValue| {
            v.as_string()
                .split_once('@')
                .map(|(_, domain)| domain.to_string())
                .unwrap_or_default()
        })
        .transform_key("anio_fecha_alta", |v: &CellValue| match v {
            CellValue::Date(d) => CellValue::Int(chrono::Datelike::year(d) as i64),
            _ => CellValue::Empty,
        });

    let view = ExportView::new(config, table)?;
    println!("Fields: {:?}", view.fields());
    println!("Header: {:?}", view.header());

    // Same as GET /clientes/export?ciudad=Lima
    let request = ExportRequest::new(FilterSet::from_query_str("ciudad=Lima"));
    let response = view.export(&request)?;
    std::fs::write(response.filename(), response.body())?;

    println!(
        "\n✅ Wrote {} ({} bytes)",
        response.filename(),
        response.body().len()
    );
    for (name, value) in response.headers() {
        println!("   {}: {}", name, value);
    }
    Ok(())
}
