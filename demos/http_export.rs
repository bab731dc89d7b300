//! Example: serve an export over HTTP
//!
//! ```bash
//! RUST_LOG=easyexcel=debug cargo run --example http_export --features http
//! curl -OJ "http://127.0.0.1:3000/clientes/export?ciudad=Lima" -H "Authorization: Token demo"
//! ```

use easyexcel::http::router;
use easyexcel::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct TokenAuth;

impl Permission for TokenAuth {
    fn has_permission(&self, request: &ExportRequest) -> bool {
        request
            .header("authorization")
            .is_some_and(|value| value.starts_with("Token "))
    }

    fn message(&self) -> String {
        "Authentication credentials were not provided.".to_string()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("easyexcel=info")),
        )
        .init();

    let model = ModelSchema::new("Cliente")
        .verbose_name_plural("clientes")
        .field(FieldDescriptor::new("id").primary_key())
        .field(FieldDescriptor::new("nombre"))
        .field(FieldDescriptor::new("ciudad"));

    let mut table = MemoryTable::new(["id", "nombre", "ciudad"]);
    for (i, (name, city)) in [("Ana", "Lima"), ("Luis", "Quito"), ("Marta", "Lima")]
        .into_iter()
        .enumerate()
    {
        table.insert(vec![(i as i64 + 1).into(), name.into(), city.into()])?;
    }

    let config = ExportConfig::new(model)
        .permission(TokenAuth)
        .header_style(HeaderStyle {
            fill_color: "FFF2CC".to_string(),
            ..HeaderStyle::default()
        });
    let view = Arc::new(ExportView::new(config, table)?);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "serving /clientes/export");
    axum::serve(listener, router("/clientes/export", view)).await?;
    Ok(())
}
