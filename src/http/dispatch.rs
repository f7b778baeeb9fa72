//! Request dispatch into the step pipeline.
//!
//! # Responsibilities
//! - Decode query and body (urlencoded, JSON, multipart) into [`FormData`]
//! - Apply the `_method` override on POST requests
//! - Match the route, run its pipeline and convert the result to a response
//!
//! # Design Decisions
//! - The body is decoded before matching because the override may live in it
//! - A pipeline that writes nothing answers 204 and is logged as a defect
//! - Step failures become a generic 500; details go to the log only

use std::time::Instant;

use axum::{
    body::{self, Body},
    extract::{FromRequest, Multipart, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::observability::metrics;
use crate::pipeline::{execute, FormData, ResponseWriter, StepRequest, UploadedFile};
use crate::routing::Method;
use crate::views;

use super::middleware::Viewer;
use super::server::AppState;

const METHOD_OVERRIDE: &str = "_method";

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("failed to read body: {0}")]
    Read(#[from] axum::Error),
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    JsonShape(#[from] crate::pipeline::request::JsonShapeError),
    #[error("invalid multipart body: {0}")]
    Multipart(String),
}

/// Decoded request body.
#[derive(Debug, Default)]
pub struct DecodedBody {
    pub form: FormData,
    pub files: Vec<UploadedFile>,
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}

pub async fn decode_body(
    request: Request<Body>,
    state: &AppState,
    limit: usize,
) -> Result<DecodedBody, BodyError> {
    let kind = content_type(request.headers());

    if kind.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| BodyError::Multipart(e.body_text()))?;
        let mut decoded = DecodedBody::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| BodyError::Multipart(e.body_text()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| BodyError::Multipart(e.body_text()))?;
                    decoded.files.push(UploadedFile {
                        field: name,
                        file_name: Some(file_name),
                        content_type,
                        bytes,
                    });
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| BodyError::Multipart(e.body_text()))?;
                    decoded.form.push(name, text);
                }
            }
        }
        return Ok(decoded);
    }

    let bytes = body::to_bytes(request.into_body(), limit).await?;
    if bytes.is_empty() {
        return Ok(DecodedBody::default());
    }
    let form = if kind.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        FormData::from_json(&value)?
    } else {
        FormData::from_urlencoded(&bytes)
    };
    Ok(DecodedBody {
        form,
        files: Vec::new(),
    })
}

/// POST requests may tunnel PUT/PATCH/DELETE through `_method` in the query
/// string or the form body.
pub fn effective_method(method: Method, query: &FormData, form: &FormData) -> Method {
    if method != Method::Post {
        return method;
    }
    query
        .get(METHOD_OVERRIDE)
        .or_else(|| form.get(METHOD_OVERRIDE))
        .and_then(Method::from_override)
        .unwrap_or(method)
}

fn wants_json(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn error_response(path: &str, status: StatusCode, message: &str) -> Response {
    if wants_json(path) {
        let body = json!({ "success": false, "error": message });
        (status, axum::Json(body)).into_response()
    } else {
        let html = views::error_page(status.as_u16(), message).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to render error page");
            message.to_string()
        });
        (
            status,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response()
    }
}

/// Fallback handler: every request not served by a static directory ends up
/// here.
pub async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();
    let http_method = request.method().clone();
    let query = FormData::from_urlencoded(request.uri().query().unwrap_or("").as_bytes());
    let headers = request.headers().clone();
    let viewer = request.extensions().get::<Viewer>().cloned().unwrap_or_default();

    let Some(method) = Method::from_http(&http_method) else {
        metrics::record_unmatched(http_method.as_str());
        return error_response(&path, StatusCode::NOT_FOUND, "Page not found");
    };

    let limit = state.services.config.security.max_body_size;
    let decoded = match decode_body(request, &state, limit).await {
        Ok(decoded) => decoded,
        Err(e) if !state.table.has_path(&path) => {
            tracing::debug!(%path, error = %e, "No route matched; body ignored");
            metrics::record_unmatched(method.as_str());
            return error_response(&path, StatusCode::NOT_FOUND, "Page not found");
        }
        Err(e) => {
            tracing::debug!(%path, error = %e, "Rejected request body");
            return error_response(&path, StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };
    let method = effective_method(method, &query, &decoded.form);

    let Some(matched) = state.table.lookup(method, &path) else {
        tracing::debug!(%method, %path, "No route matched");
        metrics::record_unmatched(method.as_str());
        return error_response(&path, StatusCode::NOT_FOUND, "Page not found");
    };
    let route = matched.route;
    let label = route.template().to_string();

    let mut req = StepRequest::new(method, path.clone(), state.services.clone())
        .with_params(matched.params)
        .with_query(query)
        .with_form(decoded.form)
        .with_user(viewer.user);
    req.files = decoded.files;
    req.headers = headers;
    req.session_id = viewer.session_id;

    let mut res = ResponseWriter::new();
    let response = match execute(route, &req, &mut res).await {
        Ok(outcome) => {
            if res.is_finished() {
                tracing::debug!(%method, route = %label, steps_run = outcome.steps_run(), "Pipeline finished");
                res.into_response()
            } else {
                tracing::warn!(%method, route = %label, "Pipeline completed without writing a response");
                StatusCode::NO_CONTENT.into_response()
            }
        }
        Err(e) => {
            tracing::error!(%method, route = %label, error = ?e, "Pipeline failed");
            error_response(&path, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    };

    metrics::record_request(method.as_str(), &label, response.status().as_u16(), start);
    response
}
