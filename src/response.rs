//! Response values returned by actions: HTML, redirects, JSON.

use crate::view::ErrorPage;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";
const JSON: &str = "application/json";

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

impl Response {
    fn with_type(status: StatusCode, content_type: &'static str, body: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response { status, headers, body }
    }

    pub fn html(body: String) -> Self {
        Self::with_type(StatusCode::OK, HTML, body)
    }

    pub fn html_status(status: StatusCode, body: String) -> Self {
        Self::with_type(status, HTML, body)
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::with_type(status, TEXT, body.into())
    }

    /// 302 to `location`. A location that is not a valid header value falls back to `/`.
    pub fn redirect(location: &str) -> Self {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"));
        headers.insert(header::LOCATION, value);
        Response {
            status: StatusCode::FOUND,
            headers,
            body: String::new(),
        }
    }

    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::with_type(status, JSON, body),
            Err(e) => {
                tracing::error!(error = %e, "json response serialization failed");
                Self::with_type(StatusCode::INTERNAL_SERVER_ERROR, JSON, r#"{"error":"internal"}"#.into())
            }
        }
    }

    /// `{"data": value}`.
    pub fn json_one<T: Serialize>(status: StatusCode, data: T) -> Self {
        Self::json(status, &SuccessOne { data })
    }

    /// `{"data": [...], "meta": {"count": n}}`.
    pub fn json_many<T: Serialize>(data: Vec<T>) -> Self {
        let count = data.len() as u64;
        Self::json(StatusCode::OK, &SuccessMany { data, meta: MetaCount { count } })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl From<ErrorPage> for Response {
    fn from(page: ErrorPage) -> Self {
        if page.fallback {
            Response::text(page.status, page.body)
        } else {
            Response::html_status(page.status, page.body)
        }
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut res = axum::response::Response::new(Body::from(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redirect_sets_location() {
        let r = Response::redirect("/students/4");
        assert_eq!(r.status(), StatusCode::FOUND);
        assert_eq!(r.header("location"), Some("/students/4"));
    }

    #[test]
    fn json_many_wraps_with_count() {
        let r = Response::json_many(vec![json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(r.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(r.body()).unwrap();
        assert_eq!(body["meta"]["count"], 2);
    }

    #[test]
    fn fallback_error_pages_are_plain_text() {
        let r = Response::from(ErrorPage {
            status: StatusCode::NOT_FOUND,
            body: "404 Not Found".into(),
            fallback: true,
        });
        assert_eq!(r.status(), StatusCode::NOT_FOUND);
        assert!(r.header("content-type").unwrap().starts_with("text/plain"));
    }
}
