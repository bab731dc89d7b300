//! axum integration
//!
//! ```no_run
//! use easyexcel::http::router;
//! use easyexcel::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let model = ModelSchema::new("Cliente").field(FieldDescriptor::new("id"));
//! let view = ExportView::new(ExportConfig::new(model), MemoryTable::new(["id"]))?;
//!
//! let app = router("/clientes/export", Arc::new(view));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::ExportError;
use crate::query::{ExportRequest, FilterSet, RowSource};
use crate::response::ExcelResponse;
use crate::view::ExportView;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = match &self {
            ExportError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ExportError::Query(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "export failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// Build the request the view sees from the query pairs and headers
pub fn export_request(params: Vec<(String, String)>, headers: &HeaderMap) -> ExportRequest {
    let mut request = ExportRequest::new(FilterSet::from_pairs(params));
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }
    request
}

/// GET handler: every query pair becomes an equality filter
pub async fn export_handler<S>(
    State(view): State<Arc<ExportView<S>>>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<ExcelResponse, ExportError>
where
    S: RowSource + Send + Sync + 'static,
{
    let request = export_request(params, &headers);
    // Fetching and packaging are blocking
    tokio::task::spawn_blocking(move || view.export(&request))
        .await
        .map_err(|e| ExportError::Task(e.to_string()))?
}

/// Router serving the export at `path`
pub fn router<S>(path: &str, view: Arc<ExportView<S>>) -> Router
where
    S: RowSource + Send + Sync + 'static,
{
    Router::new()
        .route(path, get(export_handler::<S>))
        .with_state(view)
}
