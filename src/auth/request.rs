use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap, Method, Uri};
use serde_json::{Map, Value};

use crate::api::middleware::JsonBody;

/// The slice of an inbound request that strategies and verifiers can see.
#[derive(Clone, Debug)]
pub struct AuthRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// JSON body as parsed by the body stage, `{}` when there was none.
    pub body: Value,
}

impl Default for AuthRequest {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::default(),
            headers: HeaderMap::new(),
            body: Value::Object(Map::new()),
        }
    }
}

impl AuthRequest {
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        let body = parts
            .extensions
            .get::<JsonBody>()
            .map_or_else(|| Value::Object(Map::new()), |body| body.0.clone());

        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            body,
        }
    }

    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Non-empty string field of the JSON body.
    #[must_use]
    pub fn body_field(&self, name: &str) -> Option<String> {
        self.body
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Non-empty query string parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    /// Body field, falling back to the query string.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<String> {
        self.body_field(name).or_else(|| self.query_param(name))
    }
}
