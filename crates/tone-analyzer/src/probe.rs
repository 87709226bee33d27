use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tone_core::ServiceHealth;

use crate::{SERVICE_ID, ToneAnalysis, ToneAnalyzer};

/// Text submitted by the health probe.
pub const PROBE_TEXT: &str = "Test";

pub type ServiceStatusCallback = Box<dyn FnOnce(ServiceHealth) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Started,
    WaitingForResponse,
    Completed,
}

/// One health check: submits [`PROBE_TEXT`] and reports the outcome exactly
/// once, either immediately when submission is refused or when the probe's
/// own tone callback fires.
#[derive(Clone)]
pub struct HealthProbe {
    inner: Arc<Mutex<ProbeInner>>,
}

struct ProbeInner {
    state: ProbeState,
    callback: Option<ServiceStatusCallback>,
}

impl HealthProbe {
    pub fn start(
        analyzer: &ToneAnalyzer,
        callback: impl FnOnce(ServiceHealth) + Send + 'static,
    ) -> Self {
        let probe = Self {
            inner: Arc::new(Mutex::new(ProbeInner {
                state: ProbeState::Started,
                callback: Some(Box::new(callback)),
            })),
        };

        let responder = probe.clone();
        let submitted = analyzer.get_tone(
            Some(move |result: Option<ToneAnalysis>, ()| responder.finish(result.is_some())),
            PROBE_TEXT,
            (),
        );

        match submitted {
            Ok(true) => probe.await_response(),
            Ok(false) => probe.finish(false),
            Err(err) => {
                tracing::error!(service_id = SERVICE_ID, error = %err, "health probe submit failed");
                probe.finish(false);
            }
        }

        probe
    }

    pub fn state(&self) -> ProbeState {
        self.lock().state
    }

    fn await_response(&self) {
        let mut inner = self.lock();
        // An inline connector may already have completed the probe.
        if inner.state == ProbeState::Started {
            inner.state = ProbeState::WaitingForResponse;
        }
    }

    fn finish(&self, healthy: bool) {
        let callback = {
            let mut inner = self.lock();
            if inner.state == ProbeState::Completed {
                return;
            }
            inner.state = ProbeState::Completed;
            inner.callback.take()
        };

        tracing::debug!(service_id = SERVICE_ID, healthy, "health probe completed");
        if let Some(callback) = callback {
            callback(ServiceHealth::new(SERVICE_ID, healthy));
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProbeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use tone_connector::{Dispatch, MockConnectorFactory, RestResponse};
    use tone_core::Credentials;

    use super::*;

    const VALID: &str = r#"{"document_tone":{"tone_categories":[]}}"#;

    fn analyzer(factory: MockConnectorFactory) -> ToneAnalyzer {
        ToneAnalyzer::new(
            Some(Arc::new(Credentials::basic("user", "pass"))),
            Arc::new(factory),
        )
    }

    #[test]
    fn rejected_submission_reports_unhealthy_synchronously() {
        let (tx, rx) = mpsc::channel();
        let probe = HealthProbe::start(
            &analyzer(MockConnectorFactory::new().rejecting()),
            move |health| tx.send(health).expect("send health"),
        );

        assert_eq!(probe.state(), ProbeState::Completed);
        let health = rx.try_recv().expect("reported before start returned");
        assert_eq!(health, ServiceHealth::new(SERVICE_ID, false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn inline_response_completes_before_start_returns() {
        let (tx, rx) = mpsc::channel();
        let factory = MockConnectorFactory::new()
            .dispatch(Dispatch::Inline)
            .respond_json(VALID);
        let probe = HealthProbe::start(&analyzer(factory), move |health| {
            tx.send(health).expect("send health")
        });

        assert_eq!(probe.state(), ProbeState::Completed);
        assert!(rx.try_recv().expect("reported").healthy);
    }

    #[test]
    fn probe_waits_for_response_then_reports_once() {
        let (tx, rx) = mpsc::channel();
        let factory = MockConnectorFactory::new().respond_with(RestResponse::failure(
            Some(401),
            Vec::new(),
            "Unauthorized",
        ));
        let probe = HealthProbe::start(&analyzer(factory.clone()), move |health| {
            tx.send(health).expect("send health")
        });

        let health = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("health reported");
        assert!(!health.healthy);
        assert_eq!(probe.state(), ProbeState::Completed);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        let requests = factory.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].parts.body.as_deref(), Some(&br#"{"text":"Test"}"#[..]));
    }
}
