use serde_json::Value;
use thiserror::Error;
use tone_connector::RestResponse;

use crate::{ToneAnalysis, ToneRequest};

const COMPONENT: &str = "ToneAnalyzer";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response body is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("response body does not match the tone schema: {0}")]
    Schema(#[source] serde_json::Error),
}

/// Parses raw bytes as JSON, then maps the JSON onto [`ToneAnalysis`].
pub fn decode_tone_response(data: &[u8]) -> Result<ToneAnalysis, DecodeError> {
    let value: Value = serde_json::from_slice(data).map_err(DecodeError::Json)?;
    serde_json::from_value(value).map_err(DecodeError::Schema)
}

/// `None` for a transport failure or an undecodable body. Transport failures
/// skip decoding entirely.
pub fn map_tone_response(response: &RestResponse) -> Option<ToneAnalysis> {
    if !response.success {
        tracing::warn!(
            component = COMPONENT,
            status = ?response.status,
            error = response.error.as_deref().unwrap_or_default(),
            "tone request failed"
        );
        return None;
    }

    match decode_tone_response(&response.data) {
        Ok(analysis) => Some(analysis),
        Err(err) => {
            tracing::error!(
                component = COMPONENT,
                error = %err,
                body_len = response.data.len(),
                "failed to decode tone response"
            );
            None
        }
    }
}

pub(crate) fn on_tone_response<C>(request: ToneRequest<C>, response: RestResponse) {
    request.deliver(map_tone_response(&response));
}
