//! Per-request handler context.
//!
//! # Responsibilities
//! - Query-string lookup and path parameter access
//! - Request-scoped key/value storage
//! - JSON body decoding and JSON response encoding
//! - Correlation id access
//!
//! # Design Decisions
//! - One context per request, owned by the dispatcher and lent to the handler
//!   as `&mut`; nothing is shared across requests, so no locking
//! - Path parameters live in the same store as user values and are one-shot:
//!   reading one through [`RequestContext::param`] removes it
//! - The core never writes error bodies on its own; handlers decide

use std::collections::HashMap;

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::Response;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::http::request::{RequestIdExt, X_REQUEST_ID};
use crate::routing::Params;

/// Content type written by [`RequestContext::json`].
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF8";

/// Failure to decode a request body with [`RequestContext::bind`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body could not be read from the connection.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// The body names a field the target type does not declare.
    #[error("json: unknown field \"{0}\"")]
    UnknownField(String),

    /// Malformed JSON or a type mismatch.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Response under construction; turned into a real response after the
/// handler returns.
#[derive(Debug, Default)]
struct PendingResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// The façade a handler receives for one request.
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    body: Result<Bytes, String>,
    store: HashMap<String, Value>,
    session: String,
    response: PendingResponse,
}

impl RequestContext {
    /// Build a context around a fully buffered request.
    pub fn new(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts, Ok(body))
    }

    /// Build a context from request parts and the outcome of reading the body.
    pub fn from_parts(parts: Parts, body: Result<Bytes, String>) -> Self {
        let session = parts.request_id().unwrap_or_default().to_owned();
        let mut store = HashMap::new();
        if !session.is_empty() {
            store.insert(X_REQUEST_ID.to_string(), Value::String(session.clone()));
        }

        Self {
            parts,
            body,
            store,
            session,
            response: PendingResponse::default(),
        }
    }

    /// Copy extracted path parameters into the request-scoped store.
    pub fn bind_params(&mut self, params: Params) {
        for (name, value) in params {
            self.store.insert(name, Value::String(value));
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// A request header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// First decoded query-string value for `name`, or `""` when absent.
    pub fn query(&self, name: &str) -> String {
        let Some(query) = self.parts.uri.query() else {
            return String::new();
        };
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default()
    }

    /// Read and clear the string stored under `key`.
    ///
    /// Non-string values read as `""`. Either way the entry is gone
    /// afterwards, so a second call returns `""`.
    pub fn param(&mut self, key: &str) -> String {
        match self.store.remove(key) {
            Some(Value::String(value)) => value,
            _ => String::new(),
        }
    }

    /// Value stored under `key`, without clearing it.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    /// Store `value` under `key` for the rest of this request.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.store.insert(key.into(), value.into());
    }

    /// Decode the request body as JSON into `T`.
    ///
    /// Fields not declared by `T` are rejected. Numbers are parsed from their
    /// textual form, never through a float round trip.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let body = self.body.as_ref().map_err(|e| DecodeError::Body(e.clone()))?;

        let mut unknown = Vec::new();
        let mut deserializer = serde_json::Deserializer::from_slice(body);
        let value: T = serde_ignored::deserialize(&mut deserializer, |path| {
            unknown.push(path.to_string());
        })?;
        deserializer.end()?;

        match unknown.into_iter().next() {
            Some(field) => Err(DecodeError::UnknownField(field)),
            None => Ok(value),
        }
    }

    /// Write `payload` as JSON with status `code`.
    ///
    /// The body is followed by a newline. The first status written wins;
    /// further calls append to the body. Encoding failures are logged and
    /// otherwise ignored.
    pub fn json<T: Serialize + ?Sized>(&mut self, code: StatusCode, payload: &T) {
        self.response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        self.response.status.get_or_insert(code);

        let mark = self.response.body.len();
        match serde_json::to_writer(&mut self.response.body, payload) {
            Ok(()) => self.response.body.push(b'\n'),
            Err(err) => {
                self.response.body.truncate(mark);
                tracing::warn!(error = %err, "failed to encode JSON response");
            }
        }
    }

    /// Set a response header.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response.headers.insert(name, value);
    }

    /// The correlation id assigned to this request.
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Status written so far (`200` if the handler wrote nothing).
    pub fn status(&self) -> StatusCode {
        self.response.status.unwrap_or(StatusCode::OK)
    }

    /// Response body written so far.
    pub fn response_body(&self) -> &[u8] {
        &self.response.body
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response.headers
    }

    /// Finish the request and produce the response.
    pub fn into_response(self) -> Response {
        let status = self.status();
        let mut response = Response::new(Body::from(self.response.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.response.headers;
        response
    }
}
