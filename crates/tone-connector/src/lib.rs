//! Transport seam for the Watson-style REST services.
//!
//! A [`ConnectorFactory`] turns credentials plus an endpoint into a
//! [`Connector`]; a connector accepts a [`RestRequest`] and, if it returns
//! `true` from [`Connector::send`], invokes the request's response handler
//! exactly once with a [`RestResponse`]. A rejected request is dropped without
//! its handler running.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tone_core::Credentials;

mod http;
mod mock;

pub use http::{HttpConnector, HttpConnectorFactory};
pub use mock::{Dispatch, MockConnectorFactory, RecordedRequest};

pub type ResponseHandler = Box<dyn FnOnce(RestResponse) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    Get,
    #[default]
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

pub struct RestRequest {
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub parameters: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
    on_response: ResponseHandler,
}

impl RestRequest {
    pub fn new(method: Method, on_response: impl FnOnce(RestResponse) + Send + 'static) -> Self {
        Self {
            method,
            headers: BTreeMap::new(),
            parameters: BTreeMap::new(),
            body: None,
            on_response: Box::new(on_response),
        }
    }

    pub fn post(on_response: impl FnOnce(RestResponse) + Send + 'static) -> Self {
        Self::new(Method::Post, on_response)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Splits the transport fields from the response handler. Connectors call
    /// this once they have accepted the request.
    pub fn into_parts(self) -> (RequestParts, ResponseHandler) {
        let parts = RequestParts {
            method: self.method,
            headers: self.headers,
            parameters: self.parameters,
            body: self.body,
        };
        (parts, self.on_response)
    }
}

impl fmt::Debug for RestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestRequest")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("parameters", &self.parameters)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParts {
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub parameters: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestResponse {
    pub success: bool,
    pub status: Option<u16>,
    pub data: Vec<u8>,
    pub error: Option<String>,
}

impl RestResponse {
    pub fn success(status: u16, data: Vec<u8>) -> Self {
        Self {
            success: true,
            status: Some(status),
            data,
            error: None,
        }
    }

    pub fn failure(status: Option<u16>, data: Vec<u8>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            data,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("invalid endpoint url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported url scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("credentials carry neither an api key nor a username/password pair")]
    MissingAuth,
    #[error("http client build failed: {0}")]
    Client(#[from] reqwest::Error),
    #[error("{0}")]
    Unavailable(String),
}

pub trait Connector: Send + Sync {
    /// Hands `request` off for asynchronous dispatch. Returns `false` when the
    /// request was refused; its handler is then never called.
    fn send(&self, request: RestRequest) -> bool;

    fn url(&self) -> &str;
}

pub trait ConnectorFactory: Send + Sync {
    fn connector(
        &self,
        credentials: &Arc<Credentials>,
        base_url: &str,
        function: &str,
    ) -> Result<Box<dyn Connector>, ConnectorError>;
}

/// Credentials' URL override wins over `base_url`; `function` is appended.
pub fn endpoint_url(credentials: &Credentials, base_url: &str, function: &str) -> String {
    let base = credentials
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or(base_url);
    format!("{}{}", base.trim_end_matches('/'), function)
}
