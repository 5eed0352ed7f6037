//! Request descriptors supplied by gateway callers.

use std::fmt;

use reqwest::Method;
use reqwest::multipart::Form;
use serde::Serialize;

use crate::error::ClientError;

/// Body of a gateway request.
#[derive(Default)]
pub enum RequestBody {
    /// No body. A JSON content type is still declared.
    #[default]
    None,
    /// Structured payload, serialized as JSON.
    Json(serde_json::Value),
    /// Pre-built multipart form. No content type is added by the gateway.
    Form(Form),
}

impl RequestBody {
    /// Returns `true` for multipart form bodies.
    pub const fn is_form(&self) -> bool {
        matches!(self, Self::Form(_))
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Form(_) => write!(f, "Form(..)"),
        }
    }
}

/// One outbound call: target, method, optional body and headers.
///
/// The gateway sends `method` and `url` exactly as given.
///
/// # Examples
///
/// ```
/// use staffsync_client::RequestDescriptor;
///
/// let request = RequestDescriptor::post("http://localhost:3001/courses")
///     .with_json_value(serde_json::json!({"name": "Rust 101"}))
///     .with_header("X-Request-Source", "cli")
///     .with_collection("courses");
///
/// assert_eq!(request.method, reqwest::Method::POST);
/// assert!(!request.body.is_form());
/// ```
#[derive(Debug)]
pub struct RequestDescriptor {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request body.
    pub body: RequestBody,
    /// Caller headers, applied in order before the gateway's own headers.
    pub headers: Vec<(String, String)>,
    /// Collection name for the fallback payload. Overrides the configured default.
    pub collection: Option<String>,
}

impl RequestDescriptor {
    /// Creates a descriptor with no body or headers.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: RequestBody::None,
            headers: Vec::new(),
            collection: None,
        }
    }

    /// `GET url`
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// `POST url`
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// `PUT url`
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// `PATCH url`
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    /// `DELETE url`
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Sets a structured body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ClientError> {
        Ok(self.with_json_value(serde_json::to_value(body)?))
    }

    /// Sets a structured body.
    #[must_use]
    pub fn with_json_value(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Sets a multipart form body.
    #[must_use]
    pub fn with_form(mut self, form: Form) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    /// Adds a caller header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the collection name used for the fallback payload.
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct NewCourse<'a> {
        name: &'a str,
        hours: u32,
    }

    #[test]
    fn test_constructors_set_method() {
        assert_eq!(RequestDescriptor::get("u").method, Method::GET);
        assert_eq!(RequestDescriptor::post("u").method, Method::POST);
        assert_eq!(RequestDescriptor::put("u").method, Method::PUT);
        assert_eq!(RequestDescriptor::patch("u").method, Method::PATCH);
        assert_eq!(RequestDescriptor::delete("u").method, Method::DELETE);
    }

    #[test]
    fn test_with_json_serializes_struct() {
        let request = RequestDescriptor::post("http://localhost/courses")
            .with_json(&NewCourse {
                name: "Rust",
                hours: 12,
            })
            .unwrap();

        match request.body {
            RequestBody::Json(value) => assert_eq!(value, json!({"name": "Rust", "hours": 12})),
            other => unreachable!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn test_form_body_is_form() {
        let request = RequestDescriptor::post("http://localhost/upload")
            .with_form(Form::new().text("name", "cv.pdf"));
        assert!(request.body.is_form());
        assert_eq!(format!("{:?}", request.body), "Form(..)");
    }

    #[test]
    fn test_headers_keep_order() {
        let request = RequestDescriptor::get("u")
            .with_header("X-A", "1")
            .with_header("X-B", "2");
        assert_eq!(
            request.headers,
            vec![
                ("X-A".to_string(), "1".to_string()),
                ("X-B".to_string(), "2".to_string())
            ]
        );
    }
}
