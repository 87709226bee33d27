use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

mod secret;

pub use secret::Secret;

/// Authentication material and an optional endpoint override for one service.
///
/// Clients hold these behind an `Arc` and only ever read them, so a single
/// bundle can back any number of in-flight requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<Secret>,
    pub api_key: Option<Secret>,
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(Secret::new(password)),
            ..Self::default()
        }
    }

    pub fn api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(Secret::new(api_key)),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn has_auth(&self) -> bool {
        let has_api_key = self.api_key.as_ref().is_some_and(|key| !key.is_blank());
        let has_basic = self
            .username
            .as_deref()
            .is_some_and(|user| !user.trim().is_empty())
            && self.password.as_ref().is_some_and(|pass| !pass.is_blank());
        has_api_key || has_basic
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service_id: String,
    pub healthy: bool,
}

impl ServiceHealth {
    pub fn new(service_id: impl Into<String>, healthy: bool) -> Self {
        Self {
            service_id: service_id.into(),
            healthy,
        }
    }
}

/// Resolves the credentials registered for a service identifier.
pub trait CredentialsSource: Send + Sync {
    fn find_credentials(&self, service_id: &str) -> Option<Arc<Credentials>>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticCredentialsSource {
    by_service: HashMap<String, Arc<Credentials>>,
}

impl StaticCredentialsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service_id: impl Into<String>, credentials: Credentials) -> Self {
        self.by_service
            .insert(service_id.into(), Arc::new(credentials));
        self
    }
}

impl CredentialsSource for StaticCredentialsSource {
    fn find_credentials(&self, service_id: &str) -> Option<Arc<Credentials>> {
        self.by_service.get(service_id).cloned()
    }
}
