//! Request view handed to every step.
//!
//! Built once per request by the dispatch layer: the body is already decoded
//! into [`FormData`] and [`UploadedFile`]s so steps never touch raw bytes.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::routing::{Method, PathParams};
use crate::services::Services;
use crate::store::{Role, User};

/// Ordered multi-map of decoded form or query fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

#[derive(Debug, thiserror::Error)]
#[error("JSON body must be an object")]
pub struct JsonShapeError;

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `application/x-www-form-urlencoded` bytes (also used for query strings).
    pub fn from_urlencoded(input: &[u8]) -> Self {
        Self {
            fields: url::form_urlencoded::parse(input).into_owned().collect(),
        }
    }

    /// Flatten a JSON object into string fields. Scalars become their text,
    /// arrays become repeated fields, `null` is dropped and nested objects are
    /// kept as JSON text.
    pub fn from_json(value: &Value) -> Result<Self, JsonShapeError> {
        let object = value.as_object().ok_or(JsonShapeError)?;
        let mut form = Self::new();
        for (key, value) in object {
            match value {
                Value::Array(items) => {
                    for item in items {
                        if let Some(text) = scalar_text(item) {
                            form.push(key, text);
                        }
                    }
                }
                other => {
                    if let Some(text) = scalar_text(other) {
                        form.push(key, text);
                    }
                }
            }
        }
        Ok(form)
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// First value for `name`, trimmed, if it is not blank.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Last value wins; used to echo a submitted form back into a view.
    pub fn to_json(&self) -> Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// The signed-in user as seen by steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        }
    }
}

/// Everything a step may read about the current request.
#[derive(Debug, Clone)]
pub struct StepRequest {
    pub method: Method,
    pub path: String,
    pub params: PathParams,
    pub query: FormData,
    pub form: FormData,
    pub files: Vec<UploadedFile>,
    pub headers: HeaderMap,
    pub current_user: Option<CurrentUser>,
    pub session_id: Option<String>,
    pub services: Arc<Services>,
}

impl StepRequest {
    pub fn new(method: Method, path: impl Into<String>, services: Arc<Services>) -> Self {
        Self {
            method,
            path: path.into(),
            params: PathParams::new(),
            query: FormData::new(),
            form: FormData::new(),
            files: Vec::new(),
            headers: HeaderMap::new(),
            current_user: None,
            session_id: None,
            services,
        }
    }

    pub fn with_params(mut self, params: PathParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_query(mut self, query: FormData) -> Self {
        self.query = query;
        self
    }

    pub fn with_form(mut self, form: FormData) -> Self {
        self.form = form;
        self
    }

    pub fn with_user(mut self, user: Option<CurrentUser>) -> Self {
        self.current_user = user;
        self
    }

    /// Path parameter by name. Missing parameters read as empty, which no
    /// stored slug or id can equal.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or("")
    }

    /// `?page=` style positive integer, defaulting to 1.
    pub fn page(&self) -> usize {
        self.query
            .get("page")
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }

    /// File part uploaded under `field`.
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_urlencoded_repeated_fields() {
        let form = FormData::from_urlencoded(b"title=Hello+World&tagIds=a&tagIds=b&empty=");
        assert_eq!(form.get("title"), Some("Hello World"));
        assert_eq!(form.get_all("tagIds"), vec!["a", "b"]);
        assert_eq!(form.non_empty("empty"), None);
        assert_eq!(form.non_empty("missing"), None);
    }

    #[test]
    fn test_utf8_form_values() {
        let form = FormData::from_urlencoded("name=%ED%95%9C%EA%B8%80".as_bytes());
        assert_eq!(form.get("name"), Some("한글"));
    }

    #[test]
    fn test_json_flattening() {
        let form = FormData::from_json(&json!({
            "authorName": "  Kim ",
            "published": true,
            "tagIds": ["t1", "t2"],
            "authorEmail": null,
            "order": 3
        }))
        .unwrap();
        assert_eq!(form.get("authorName"), Some("  Kim "));
        assert_eq!(form.non_empty("authorName"), Some("Kim"));
        assert_eq!(form.get("published"), Some("true"));
        assert_eq!(form.get_all("tagIds"), vec!["t1", "t2"]);
        assert!(!form.contains("authorEmail"));
        assert_eq!(form.get("order"), Some("3"));

        assert!(FormData::from_json(&json!([1, 2])).is_err());
    }
}
