//! Response object handed to every step.
//!
//! Any method that commits a body (`html`, `json`, `text`, `xml`,
//! `redirect`) marks the writer finished and returns [`Flow::Halt`]. The
//! executor consults [`ResponseWriter::is_finished`] before every step, so a
//! step that forgets to return the sentinel still stops the pipeline.

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use super::step::Flow;

#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    finished: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            finished: false,
        }
    }

    /// Set the status for the response that will be committed next.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        if self.finished {
            tracing::warn!(%status, "Status change after response was committed; ignoring");
        } else {
            self.status = status;
        }
        self
    }

    /// Set a header, replacing any previous value with the same name.
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        if self.finished {
            tracing::warn!(header = %name, "Header change after response was committed; ignoring");
        } else {
            self.headers.insert(name, value);
        }
        self
    }

    /// Append a `Set-Cookie` header.
    pub fn set_cookie(&mut self, cookie: &str) -> &mut Self {
        match HeaderValue::from_str(cookie) {
            Ok(value) if !self.finished => {
                self.headers.append(header::SET_COOKIE, value);
            }
            Ok(_) => tracing::warn!("Cookie set after response was committed; ignoring"),
            Err(e) => tracing::warn!(error = %e, "Invalid cookie header value"),
        }
        self
    }

    pub fn html(&mut self, body: impl Into<String>) -> Flow {
        self.commit("text/html; charset=utf-8", body.into())
    }

    pub fn json(&mut self, value: Value) -> Flow {
        self.commit("application/json", value.to_string())
    }

    pub fn text(&mut self, body: impl Into<String>) -> Flow {
        self.commit("text/plain; charset=utf-8", body.into())
    }

    pub fn xml(&mut self, body: impl Into<String>) -> Flow {
        self.commit("application/xml; charset=utf-8", body.into())
    }

    /// 302 redirect to `location`.
    pub fn redirect(&mut self, location: &str) -> Flow {
        if self.finished {
            tracing::warn!(location, "Redirect after response was committed; ignoring");
            return Flow::Halt;
        }
        let value = HeaderValue::from_str(location).unwrap_or_else(|_| {
            tracing::warn!(location, "Redirect target is not a valid header value; using /");
            HeaderValue::from_static("/")
        });
        self.status = StatusCode::FOUND;
        self.headers.insert(header::LOCATION, value);
        self.finished = true;
        Flow::Halt
    }

    fn commit(&mut self, content_type: &'static str, body: String) -> Flow {
        if self.finished {
            tracing::warn!(status = %self.status, "Response already committed; ignoring write");
            return Flow::Halt;
        }
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body = Bytes::from(body);
        self.finished = true;
        Flow::Halt
    }

    /// Whether a response has been committed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl IntoResponse for ResponseWriter {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
