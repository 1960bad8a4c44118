//! Backend trait and implementations for talking to the deployment service.
//!
//! This module provides the [`Backend`] trait, the four remote calls the
//! environment lifecycle needs, and two implementations:
//!
//! - [`gateway::GatewayBackend`] speaks JSON over HTTP to a service gateway.
//! - [`MockBackend`] keeps everything in memory and can be scripted.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access. It is cheap to
//! clone and every clone shares the same state, so a test can hand one clone
//! to the code under test and inspect the other:
//!
//! ```
//! use beanstalk::backend::{Backend, MockBackend};
//! use beanstalk::ConfigurationSettings;
//!
//! # tokio_test_block_on(async {
//! let mock = MockBackend::new().with_configuration(ConfigurationSettings::default());
//! let settings = mock.describe_configuration("shop", "shop-prod").await.unwrap();
//! assert!(settings.vars.is_empty());
//! assert_eq!(mock.configuration_calls(), 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod gateway;

use crate::error::{ServiceError, ServiceResult};
use crate::types::{
    ConfigurationSettings, EnvironmentDescription, Event, EventQuery, UpdateRequest,
    UpdateResponse,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Remote operations of the deployment service.
///
/// This abstraction allows different transports and enables testing.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Read the environment's configuration variables and HTTPS port.
    async fn describe_configuration(
        &self,
        application: &str,
        environment: &str,
    ) -> ServiceResult<ConfigurationSettings>;

    /// Read the environment's identity, status and endpoint.
    async fn describe_environment(
        &self,
        application: &str,
        environment: &str,
    ) -> ServiceResult<EnvironmentDescription>;

    /// Apply an update to the environment.
    async fn update_environment(&self, request: &UpdateRequest) -> ServiceResult<UpdateResponse>;

    /// List events for a request, newest first.
    async fn describe_events(&self, query: &EventQuery) -> ServiceResult<Vec<Event>>;
}

#[derive(Debug)]
struct MockState {
    configuration: ServiceResult<ConfigurationSettings>,
    environment: ServiceResult<EnvironmentDescription>,
    update_error: Option<ServiceError>,
    event_pages: VecDeque<ServiceResult<Vec<Event>>>,
    configuration_delay: Duration,
    environment_delay: Duration,
    next_request: u32,
    configuration_calls: usize,
    environment_calls: usize,
    update_requests: Vec<UpdateRequest>,
    event_queries: Vec<EventQuery>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            configuration: Ok(ConfigurationSettings::default()),
            environment: Ok(EnvironmentDescription::default()),
            update_error: None,
            event_pages: VecDeque::new(),
            configuration_delay: Duration::ZERO,
            environment_delay: Duration::ZERO,
            next_request: 1,
            configuration_calls: 0,
            environment_calls: 0,
            update_requests: Vec::new(),
            event_queries: Vec::new(),
        }
    }
}

/// Mock backend for testing without network access.
///
/// Reads return the configured responses (optionally after a delay), updates
/// echo the configured environment with status `Updating` and a fresh
/// request id, and event polls pop scripted pages in order, returning an
/// empty page once the script is exhausted.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new mock backend with empty responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration returned by `describe_configuration`.
    #[must_use]
    pub fn with_configuration(self, settings: ConfigurationSettings) -> Self {
        self.state.lock().unwrap().configuration = Ok(settings);
        self
    }

    /// Make `describe_configuration` fail.
    #[must_use]
    pub fn with_configuration_error(self, error: ServiceError) -> Self {
        self.state.lock().unwrap().configuration = Err(error);
        self
    }

    /// Set the description returned by `describe_environment`.
    #[must_use]
    pub fn with_environment(self, description: EnvironmentDescription) -> Self {
        self.state.lock().unwrap().environment = Ok(description);
        self
    }

    /// Make `describe_environment` fail.
    #[must_use]
    pub fn with_environment_error(self, error: ServiceError) -> Self {
        self.state.lock().unwrap().environment = Err(error);
        self
    }

    /// Make `update_environment` fail.
    #[must_use]
    pub fn with_update_error(self, error: ServiceError) -> Self {
        self.state.lock().unwrap().update_error = Some(error);
        self
    }

    /// Delay the two reads, to control which one completes first.
    #[must_use]
    pub fn with_read_delays(self, configuration: Duration, environment: Duration) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.configuration_delay = configuration;
            state.environment_delay = environment;
        }
        self
    }

    /// Append a page of events to the poll script.
    #[must_use]
    pub fn with_event_page(self, events: Vec<Event>) -> Self {
        self.state.lock().unwrap().event_pages.push_back(Ok(events));
        self
    }

    /// Append a failing poll to the poll script.
    #[must_use]
    pub fn with_event_error(self, error: ServiceError) -> Self {
        self.state.lock().unwrap().event_pages.push_back(Err(error));
        self
    }

    /// Replace the description returned by later `describe_environment` calls.
    pub fn set_environment(&self, description: EnvironmentDescription) {
        self.state.lock().unwrap().environment = Ok(description);
    }

    /// Number of `describe_configuration` calls so far.
    #[must_use]
    pub fn configuration_calls(&self) -> usize {
        self.state.lock().unwrap().configuration_calls
    }

    /// Number of `describe_environment` calls so far.
    #[must_use]
    pub fn environment_calls(&self) -> usize {
        self.state.lock().unwrap().environment_calls
    }

    /// Number of `update_environment` calls so far.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.state.lock().unwrap().update_requests.len()
    }

    /// Number of `describe_events` calls so far.
    #[must_use]
    pub fn event_calls(&self) -> usize {
        self.state.lock().unwrap().event_queries.len()
    }

    /// Total number of remote calls so far.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.configuration_calls
            + state.environment_calls
            + state.update_requests.len()
            + state.event_queries.len()
    }

    /// Update requests received so far.
    #[must_use]
    pub fn update_requests(&self) -> Vec<UpdateRequest> {
        self.state.lock().unwrap().update_requests.clone()
    }

    /// Event queries received so far.
    #[must_use]
    pub fn event_queries(&self) -> Vec<EventQuery> {
        self.state.lock().unwrap().event_queries.clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn describe_configuration(
        &self,
        _application: &str,
        _environment: &str,
    ) -> ServiceResult<ConfigurationSettings> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.configuration_calls += 1;
            state.configuration_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().unwrap().configuration.clone()
    }

    async fn describe_environment(
        &self,
        _application: &str,
        _environment: &str,
    ) -> ServiceResult<EnvironmentDescription> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.environment_calls += 1;
            state.environment_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().unwrap().environment.clone()
    }

    async fn update_environment(&self, request: &UpdateRequest) -> ServiceResult<UpdateResponse> {
        let mut state = self.state.lock().unwrap();
        state.update_requests.push(request.clone());

        if let Some(error) = &state.update_error {
            return Err(error.clone());
        }

        let mut environment = state.environment.clone().unwrap_or_default();
        environment.status = Some("Updating".to_string());
        if request.version_label.is_some() {
            environment.version_label.clone_from(&request.version_label);
        }
        if request.description.is_some() {
            environment.description.clone_from(&request.description);
        }

        let request_id = format!("req-{}", state.next_request);
        state.next_request += 1;

        Ok(UpdateResponse {
            environment,
            request_id,
        })
    }

    async fn describe_events(&self, query: &EventQuery) -> ServiceResult<Vec<Event>> {
        let mut state = self.state.lock().unwrap();
        state.event_queries.push(query.clone());
        state.event_pages.pop_front().unwrap_or(Ok(Vec::new()))
    }
}
