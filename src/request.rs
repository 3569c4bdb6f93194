//! Incoming request as actions see it: method, path, query and form input.

use crate::db::Fields;
use axum::http::{header, HeaderMap, Method, Uri};
use serde_json::Value;
use std::collections::HashMap;

/// Form field that lets a POST stand in for PUT, PATCH or DELETE.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

#[derive(Clone, Debug)]
pub struct Request {
    id: String,
    method: Method,
    path: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    headers: HeaderMap,
}

impl Request {
    /// `target` may carry a query string.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, parse_pairs(q.as_bytes())),
            None => (target, HashMap::new()),
        };
        Request {
            id: uuid::Uuid::new_v4().to_string(),
            method,
            path: path.to_string(),
            query,
            form: HashMap::new(),
            headers: HeaderMap::new(),
        }
    }

    /// Build from HTTP parts. The body is read as a form only when urlencoded.
    pub fn from_parts(method: Method, uri: &Uri, headers: HeaderMap, body: &[u8]) -> Self {
        let is_form = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        Request {
            id: uuid::Uuid::new_v4().to_string(),
            method,
            path: uri.path().to_string(),
            query: uri.query().map(|q| parse_pairs(q.as_bytes())).unwrap_or_default(),
            form: if is_form { parse_pairs(body) } else { HashMap::new() },
            headers,
        }
    }

    pub fn with_form(mut self, pairs: &[(&str, &str)]) -> Self {
        for (k, v) in pairs {
            self.form.insert(k.to_string(), v.to_string());
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The verb routing uses: a POST carrying `_method` of PUT/PATCH/DELETE counts as that verb.
    pub fn effective_method(&self) -> Method {
        if self.method != Method::POST {
            return self.method.clone();
        }
        match self
            .form
            .get(METHOD_OVERRIDE_FIELD)
            .map(|m| m.trim().to_ascii_uppercase())
            .as_deref()
        {
            Some("PUT") => Method::PUT,
            Some("PATCH") => Method::PATCH,
            Some("DELETE") => Method::DELETE,
            _ => Method::POST,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn form(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(String::as_str)
    }

    /// Form value first, then query string.
    pub fn input(&self, key: &str) -> Option<&str> {
        self.form(key).or_else(|| self.query(key))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Submitted form values for the listed columns only. Blank inputs become null.
    pub fn form_fields(&self, allowed: &[&str]) -> Fields {
        allowed
            .iter()
            .filter_map(|col| {
                let raw = self.form.get(*col)?;
                let v = if raw.trim().is_empty() {
                    Value::Null
                } else {
                    Value::String(raw.clone())
                };
                Some((col.to_string(), v))
            })
            .collect()
    }
}

/// Repeated keys: last one wins.
fn parse_pairs(input: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(input).into_owned().collect()
}
