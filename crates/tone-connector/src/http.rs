use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::runtime::Handle;
use tone_core::Credentials;

use crate::{
    Connector, ConnectorError, ConnectorFactory, Method, RequestParts, ResponseHandler,
    RestRequest, RestResponse, endpoint_url,
};

#[derive(Debug, Clone)]
pub struct HttpConnectorFactory {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpConnectorFactory {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(runtime: Handle, timeout: Option<Duration>) -> Result<Self, ConnectorError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            runtime,
        })
    }
}

impl ConnectorFactory for HttpConnectorFactory {
    fn connector(
        &self,
        credentials: &Arc<Credentials>,
        base_url: &str,
        function: &str,
    ) -> Result<Box<dyn Connector>, ConnectorError> {
        let raw_url = endpoint_url(credentials, base_url, function);
        let url = Url::parse(&raw_url).map_err(|err| ConnectorError::InvalidUrl {
            url: raw_url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConnectorError::UnsupportedScheme(url.scheme().to_owned()));
        }
        if !credentials.has_auth() {
            return Err(ConnectorError::MissingAuth);
        }

        Ok(Box::new(HttpConnector {
            client: self.client.clone(),
            runtime: self.runtime.clone(),
            raw_url,
            url,
            credentials: Arc::clone(credentials),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
    runtime: Handle,
    raw_url: String,
    url: Url,
    credentials: Arc<Credentials>,
}

impl HttpConnector {
    fn build(&self, parts: RequestParts) -> reqwest::RequestBuilder {
        let method = match parts.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, self.url.clone())
            .query(&parts.parameters);
        for (name, value) in &parts.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match (&self.credentials.api_key, &self.credentials.username) {
            (Some(api_key), _) if !api_key.is_blank() => {
                builder.basic_auth("apikey", Some(api_key.expose()))
            }
            (_, Some(username)) => builder.basic_auth(
                username,
                self.credentials.password.as_ref().map(|password| password.expose()),
            ),
            _ => builder,
        };

        match parts.body {
            Some(body) => builder.body(body),
            None => builder,
        }
    }
}

impl Connector for HttpConnector {
    fn send(&self, request: RestRequest) -> bool {
        let (parts, handler) = request.into_parts();
        let builder = self.build(parts);
        let url = self.raw_url.clone();
        let mut completion = Completion::new(handler);

        self.runtime.spawn(async move {
            let response = execute(builder).await;
            if !response.success {
                tracing::warn!(
                    url = %url,
                    status = ?response.status,
                    error = response.error.as_deref().unwrap_or_default(),
                    "rest request failed"
                );
            }
            completion.complete(response);
        });

        true
    }

    fn url(&self) -> &str {
        &self.raw_url
    }
}

async fn execute(builder: reqwest::RequestBuilder) -> RestResponse {
    let response = match builder.send().await {
        Ok(response) => response,
        Err(err) => return RestResponse::failure(None, Vec::new(), err.to_string()),
    };

    let status = response.status();
    match response.bytes().await {
        Ok(body) if status.is_success() => RestResponse::success(status.as_u16(), body.to_vec()),
        Ok(body) => RestResponse::failure(Some(status.as_u16()), body.to_vec(), status.to_string()),
        Err(err) => RestResponse::failure(Some(status.as_u16()), Vec::new(), err.to_string()),
    }
}

/// Fires the response handler once. If the dispatch task is dropped before it
/// completes (runtime shutdown), the handler still runs with a failure.
struct Completion {
    handler: Option<ResponseHandler>,
}

impl Completion {
    fn new(handler: ResponseHandler) -> Self {
        Self {
            handler: Some(handler),
        }
    }

    fn complete(&mut self, response: RestResponse) {
        if let Some(handler) = self.handler.take() {
            handler(response);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.complete(RestResponse::failure(
            None,
            Vec::new(),
            "request dropped before completion",
        ));
    }
}
