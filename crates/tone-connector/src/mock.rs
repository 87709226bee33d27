use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tone_core::Credentials;

use crate::{
    Connector, ConnectorError, ConnectorFactory, RequestParts, RestRequest, RestResponse,
    endpoint_url,
};

/// Where a mock connector runs the response handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// On a freshly spawned thread, after `send` has returned.
    #[default]
    Thread,
    /// Inside `send`, before it returns.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub parts: RequestParts,
}

/// Scripted stand-in for the HTTP stack. Replies are consumed in order; once
/// the script is exhausted every request receives an empty `200`.
#[derive(Debug, Clone, Default)]
pub struct MockConnectorFactory {
    state: Arc<MockState>,
    unavailable: bool,
    rejecting: bool,
    dispatch: Dispatch,
}

#[derive(Debug, Default)]
struct MockState {
    replies: Mutex<VecDeque<RestResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockConnectorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(self, response: RestResponse) -> Self {
        lock(&self.state.replies).push_back(response);
        self
    }

    pub fn respond_json(self, body: &str) -> Self {
        self.respond_with(RestResponse::success(200, body.as_bytes().to_vec()))
    }

    /// `connector()` fails, as it would for an unusable endpoint.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Connectors refuse every request.
    pub fn rejecting(mut self) -> Self {
        self.rejecting = true;
        self
    }

    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }
}

impl ConnectorFactory for MockConnectorFactory {
    fn connector(
        &self,
        credentials: &Arc<Credentials>,
        base_url: &str,
        function: &str,
    ) -> Result<Box<dyn Connector>, ConnectorError> {
        if self.unavailable {
            return Err(ConnectorError::Unavailable(
                "mock connector unavailable".to_owned(),
            ));
        }

        Ok(Box::new(MockConnector {
            state: Arc::clone(&self.state),
            url: endpoint_url(credentials, base_url, function),
            rejecting: self.rejecting,
            dispatch: self.dispatch,
        }))
    }
}

struct MockConnector {
    state: Arc<MockState>,
    url: String,
    rejecting: bool,
    dispatch: Dispatch,
}

impl Connector for MockConnector {
    fn send(&self, request: RestRequest) -> bool {
        if self.rejecting {
            return false;
        }

        let (parts, handler) = request.into_parts();
        lock(&self.state.requests).push(RecordedRequest {
            url: self.url.clone(),
            parts,
        });
        let response = lock(&self.state.replies)
            .pop_front()
            .unwrap_or_else(|| RestResponse::success(200, Vec::new()));

        match self.dispatch {
            Dispatch::Inline => handler(response),
            Dispatch::Thread => {
                std::thread::spawn(move || handler(response));
            }
        }

        true
    }

    fn url(&self) -> &str {
        &self.url
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn mock_replays_script_in_order_and_records_requests() {
        let factory = MockConnectorFactory::new()
            .respond_json(r#"{"first":true}"#)
            .respond_with(RestResponse::failure(Some(503), Vec::new(), "unavailable"));
        let credentials = Arc::new(Credentials::basic("user", "pass"));
        let connector = factory
            .connector(&credentials, "http://mock/api", "/v3/tone")
            .expect("mock connector");

        let (tx, rx) = mpsc::channel();
        for label in ["a", "b", "c"] {
            let tx = tx.clone();
            let accepted = connector.send(
                RestRequest::post(move |response| {
                    tx.send(response).expect("send response");
                })
                .parameter("label", label),
            );
            assert!(accepted);
        }

        let mut responses = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("response"))
            .collect::<Vec<_>>();
        responses.sort_by_key(|response| (response.success, response.data.len()));

        assert!(!responses[0].success);
        assert_eq!(responses[0].status, Some(503));
        assert!(responses[1].success && responses[1].data.is_empty());
        assert_eq!(responses[2].data, br#"{"first":true}"#);

        let recorded = factory.requests();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0].url, "http://mock/api/v3/tone");
        assert_eq!(recorded[2].parts.parameters["label"], "c");
    }

    #[test]
    fn rejecting_connector_drops_handler_without_calling_it() {
        let factory = MockConnectorFactory::new().rejecting();
        let credentials = Arc::new(Credentials::basic("user", "pass"));
        let connector = factory
            .connector(&credentials, "http://mock/api", "/v3/tone")
            .expect("mock connector");

        let (tx, rx) = mpsc::channel::<RestResponse>();
        let accepted = connector.send(RestRequest::post(move |response| {
            tx.send(response).expect("send response");
        }));

        assert!(!accepted);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(factory.requests().is_empty());
    }
}
