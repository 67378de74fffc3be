//! Action results and their rendering into HTTP responses.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{Response, StatusCode};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DaedalusError, DaedalusResult};

/// A cookie queued for the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
}

/// What an action produced: an optional body plus response shaping
/// (status, headers, cookies, redirect).
///
/// Status defaulting happens at render time: a body without an
/// explicit status renders as 200, no body renders as 204, and a
/// redirect without an explicit status renders as 302.
#[derive(Debug, Clone, Default)]
pub struct ActionResult {
    body: Option<Value>,
    status: Option<StatusCode>,
    headers: IndexMap<String, String>,
    cookies: Vec<Cookie>,
    redirect: Option<String>,
}

impl ActionResult {
    /// An empty result (renders as 204 unless a status is set).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A result carrying the given JSON body.
    #[must_use]
    pub fn from_body(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }

    /// Serializes a value into the result body.
    ///
    /// # Errors
    ///
    /// Returns an internal error when serialization fails.
    pub fn json<T: Serialize>(value: &T) -> DaedalusResult<Self> {
        let body = serde_json::to_value(value).map_err(|e| DaedalusError::Internal {
            message: "failed to serialize response body".to_string(),
            source: Some(e.into()),
        })?;
        Ok(Self::from_body(body))
    }

    /// A redirect to the given location.
    #[must_use]
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            redirect: Some(location.into()),
            ..Self::default()
        }
    }

    /// Sets an explicit response status.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Queues a response cookie.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push(Cookie {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// The body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// The explicit status, if any.
    #[must_use]
    pub fn status_override(&self) -> Option<StatusCode> {
        self.status
    }

    /// Renders the result into an HTTP response.
    ///
    /// # Errors
    ///
    /// Returns an internal error when a header or location value is
    /// not a valid HTTP header value.
    pub fn into_response(self) -> DaedalusResult<Response<Bytes>> {
        let mut builder = Response::builder();

        if let Some(location) = &self.redirect {
            builder = builder
                .status(self.status.unwrap_or(StatusCode::FOUND))
                .header(LOCATION, location.as_str());
        } else {
            let status = self.status.unwrap_or(if self.body.is_some() {
                StatusCode::OK
            } else {
                StatusCode::NO_CONTENT
            });
            builder = builder.status(status);
        }

        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for cookie in &self.cookies {
            builder = builder.header(SET_COOKIE, format!("{}={}", cookie.name, cookie.value));
        }

        let bytes = match &self.body {
            Some(body) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Bytes::from(serde_json::to_vec(body).map_err(|e| DaedalusError::Internal {
                    message: "failed to encode response body".to_string(),
                    source: Some(e.into()),
                })?)
            }
            None => Bytes::new(),
        };

        builder.body(bytes).map_err(|e| DaedalusError::Internal {
            message: "failed to build response".to_string(),
            source: Some(e.into()),
        })
    }
}

impl From<Value> for ActionResult {
    fn from(body: Value) -> Self {
        Self::from_body(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_defaults_to_ok() {
        let response = ActionResult::from_body(serde_json::json!({"id": 1}))
            .into_response()
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(b"application/json".as_ref())
        );
    }

    #[test]
    fn test_empty_defaults_to_no_content() {
        let response = ActionResult::new().into_response().expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_redirect_defaults_to_found() {
        let response = ActionResult::redirect("/login")
            .into_response()
            .expect("response");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).map(|v| v.as_bytes()),
            Some(b"/login".as_ref())
        );
    }

    #[test]
    fn test_explicit_status_wins() {
        let response = ActionResult::from_body(serde_json::json!({}))
            .status(StatusCode::CREATED)
            .into_response()
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_cookies_become_set_cookie_headers() {
        let response = ActionResult::new()
            .cookie("session", "abc")
            .cookie("theme", "dark")
            .into_response()
            .expect("response");
        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].as_bytes(), b"session=abc");
    }
}
