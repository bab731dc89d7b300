//! Downloadable spreadsheet response

/// MIME type of `.xlsx` files
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A finished workbook packaged as a file download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcelResponse {
    filename: String,
    body: Vec<u8>,
}

impl ExcelResponse {
    pub fn new(filename: impl Into<String>, body: Vec<u8>) -> Self {
        ExcelResponse {
            filename: filename.into(),
            body,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Always 200: a response only exists for a completed workbook
    pub fn status(&self) -> u16 {
        200
    }

    pub fn content_type(&self) -> &'static str {
        XLSX_CONTENT_TYPE
    }

    /// `attachment; filename=<name>`
    pub fn content_disposition(&self) -> String {
        // Quotes and control characters are not valid in the header value
        let name: String = self
            .filename
            .chars()
            .filter(|c| *c != '"' && !c.is_control())
            .collect();
        format!("attachment; filename={}", name)
    }

    /// Header name/value pairs to send with the body
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("content-type", self.content_type().to_string()),
            ("content-disposition", self.content_disposition()),
            ("charset", "utf-8".to_string()),
            ("content-length", self.body.len().to_string()),
        ]
    }
}

#[cfg(feature = "http")]
mod http_impl {
    use super::ExcelResponse;
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum::response::{IntoResponse, Response};

    impl IntoResponse for ExcelResponse {
        fn into_response(self) -> Response {
            let headers = self.headers();
            let mut response = (StatusCode::OK, self.body).into_response();
            for (name, value) in headers {
                // Non-ASCII filenames are sent as raw UTF-8 bytes
                let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) else {
                    continue;
                };
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(name), value);
            }
            response
        }
    }
}
