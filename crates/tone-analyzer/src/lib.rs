use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;
use tone_config::{DEFAULT_SERVICE_URL, DEFAULT_VERSION_DATE, ToneConfig};
use tone_connector::{ConnectorFactory, RestRequest};
use tone_core::{Credentials, CredentialsSource, ServiceHealth};

mod mapper;
mod probe;
mod request;
mod schema;

pub use mapper::{DecodeError, decode_tone_response, map_tone_response};
pub use probe::{HealthProbe, PROBE_TEXT, ProbeState, ServiceStatusCallback};
pub use request::{TextEncoding, ToneCallback, ToneRequest};
pub use schema::{DocumentTone, SentenceTone, Tone, ToneAnalysis, ToneCategory};

pub const SERVICE_ID: &str = "ToneAnalyzerV3";
pub const FUNCTION_TONE: &str = "/v3/tone";

#[derive(Debug, Error)]
pub enum ToneError {
    #[error("a completion callback is required")]
    MissingCallback,
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("request was not submitted: no connector available for {0}")]
    SubmissionRejected(String),
    #[error("tone request failed or returned an unreadable response")]
    RequestFailed,
}

/// Operations every service wrapper exposes to a status dashboard.
pub trait WatsonService {
    fn service_id(&self) -> &str;

    /// Reports health through `callback` exactly once. Without registered
    /// credentials the report is `false` and is made before this returns.
    fn service_status(&self, callback: ServiceStatusCallback);
}

pub struct ToneAnalyzer {
    credentials: Option<Arc<Credentials>>,
    connectors: Arc<dyn ConnectorFactory>,
    url: String,
    version_date: String,
    text_encoding: TextEncoding,
}

impl ToneAnalyzer {
    pub fn new(
        credentials: Option<Arc<Credentials>>,
        connectors: Arc<dyn ConnectorFactory>,
    ) -> Self {
        Self {
            credentials,
            connectors,
            url: DEFAULT_SERVICE_URL.to_owned(),
            version_date: DEFAULT_VERSION_DATE.to_owned(),
            text_encoding: TextEncoding::default(),
        }
    }

    /// Resolves the credentials registered under [`SERVICE_ID`].
    pub fn from_source(
        source: &dyn CredentialsSource,
        connectors: Arc<dyn ConnectorFactory>,
    ) -> Self {
        Self::new(source.find_credentials(SERVICE_ID), connectors)
    }

    pub fn from_config(
        config: &ToneConfig,
        source: &dyn CredentialsSource,
        connectors: Arc<dyn ConnectorFactory>,
    ) -> Self {
        let text_encoding = if config.service.legacy_quoted_text {
            TextEncoding::LegacyQuoted
        } else {
            TextEncoding::Plain
        };

        Self::from_source(source, connectors)
            .with_url(config.service.url.clone())
            .with_version_date(config.service.version_date.clone())
            .with_text_encoding(text_encoding)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_version_date(mut self, version_date: impl Into<String>) -> Self {
        self.version_date = version_date.into();
        self
    }

    pub fn with_text_encoding(mut self, text_encoding: TextEncoding) -> Self {
        self.text_encoding = text_encoding;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version_date(&self) -> &str {
        &self.version_date
    }

    pub fn credentials(&self) -> Option<&Arc<Credentials>> {
        self.credentials.as_ref()
    }

    /// Submits `text` for tone analysis.
    ///
    /// `Ok(true)` means the request was handed to a connector and `callback`
    /// will fire exactly once with the result (or `None` on failure) and
    /// `context`. `Ok(false)` means no connector could be obtained; the
    /// callback is dropped without being called.
    pub fn get_tone<C, F>(
        &self,
        callback: Option<F>,
        text: &str,
        context: C,
    ) -> Result<bool, ToneError>
    where
        C: Send + 'static,
        F: FnOnce(Option<ToneAnalysis>, C) + Send + 'static,
    {
        let callback = callback.ok_or(ToneError::MissingCallback)?;

        let Some(credentials) = &self.credentials else {
            tracing::debug!(service_id = SERVICE_ID, "no credentials registered");
            return Ok(false);
        };

        let connector = match self.connectors.connector(credentials, &self.url, FUNCTION_TONE) {
            Ok(connector) => connector,
            Err(err) => {
                tracing::warn!(service_id = SERVICE_ID, error = %err, "no connector for tone request");
                return Ok(false);
            }
        };

        let body = request::encode_body(text, self.text_encoding)?;
        let pending = ToneRequest::new(Box::new(callback), context);
        let request = RestRequest::post(move |response| mapper::on_tone_response(pending, response))
            .header("Content-Type", "application/json")
            .parameter("version", self.version_date.as_str())
            .parameter("sentences", "true")
            .body(body);

        tracing::debug!(
            service_id = SERVICE_ID,
            url = connector.url(),
            text_len = text.len(),
            "submitting tone request"
        );
        Ok(connector.send(request))
    }

    /// Awaitable form of [`get_tone`](Self::get_tone).
    pub async fn analyze(&self, text: &str) -> Result<ToneAnalysis, ToneError> {
        let (tx, rx) = oneshot::channel();
        let submitted = self.get_tone(
            Some(move |result: Option<ToneAnalysis>, ()| {
                let _ = tx.send(result);
            }),
            text,
            (),
        )?;
        if !submitted {
            return Err(ToneError::SubmissionRejected(self.url.clone()));
        }

        rx.await
            .ok()
            .flatten()
            .ok_or(ToneError::RequestFailed)
    }

    /// Awaitable form of [`WatsonService::service_status`].
    pub async fn check_health(&self) -> ServiceHealth {
        let (tx, rx) = oneshot::channel();
        self.service_status(Box::new(move |health| {
            let _ = tx.send(health);
        }));

        rx.await
            .unwrap_or_else(|_| ServiceHealth::new(SERVICE_ID, false))
    }
}

impl WatsonService for ToneAnalyzer {
    fn service_id(&self) -> &str {
        SERVICE_ID
    }

    fn service_status(&self, callback: ServiceStatusCallback) {
        if self.credentials.is_none() {
            callback(ServiceHealth::new(SERVICE_ID, false));
            return;
        }

        HealthProbe::start(self, callback);
    }
}
