//! # beanstalk
//!
//! Client-side lifecycle of one application environment on an Elastic
//! Beanstalk style deployment service.
//!
//! This crate provides functionality for:
//! - Loading an environment's configuration and description concurrently
//! - Staging variable, version, platform and template changes locally
//! - Dispatching those changes as a single update
//! - Watching the update's event feed until it completes or times out
//!
//! ## Example
//!
//! ```no_run
//! use beanstalk::{Environment, VarValue};
//! use beanstalk::backend::gateway::GatewayBackend;
//! use std::time::Duration;
//!
//! # async fn run() -> beanstalk::Result<()> {
//! let backend = GatewayBackend::new("http://localhost:4566");
//! let mut env = Environment::new(Box::new(backend), "shop", "shop-prod");
//!
//! env.load().await?;
//! println!("{} is {:?}", env.info().name, env.info().status);
//!
//! env.set_var("FEATURE_X", "on");
//! env.remove_var("LEGACY_FLAG");
//! env.set_version("v43");
//! env.update().await?;
//!
//! let outcome = env.wait(Duration::from_secs(600)).await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Variables
//!
//! The variable overlay is tri-state: a key mapped to [`VarValue::Set`] is
//! written, a key mapped to [`VarValue::Remove`] is deleted, and a key that is
//! absent is left alone.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod diff;
pub mod dispatcher;
pub mod error;
pub mod loader;
pub mod snapshot;
pub mod types;
pub mod url;
pub mod watcher;

pub use error::{Error, ErrorCategory, FetchTarget, Result, ServiceError, ServiceResult};
pub use snapshot::{EnvironmentInfo, EnvironmentSnapshot, StagedFields};
pub use types::{
    ConfigurationSettings, EnvironmentDescription, Event, EventQuery, OptionSetting,
    OptionSpecification, UpdateRequest, UpdateResponse, VarValue, WaitOutcome,
};
pub use watcher::WatchOptions;

use backend::Backend;
pub use backend::MockBackend;
use std::time::Duration;

/// High-level handle on one application environment.
///
/// Owns the environment's [`EnvironmentSnapshot`] and the backend used to
/// reach the service. Every operation that talks to the service takes
/// `&mut self`, so at most one is in flight at a time.
///
/// # Example
///
/// ```
/// use beanstalk::{Environment, MockBackend, VarValue};
///
/// let mut env = Environment::new(Box::new(MockBackend::new()), "shop", "shop-prod");
/// env.set_var("DEBUG", "true");
/// assert_eq!(env.info().vars["DEBUG"], VarValue::set("true"));
/// ```
pub struct Environment {
    backend: Box<dyn Backend>,
    snapshot: EnvironmentSnapshot,
    watch: WatchOptions,
}

impl Environment {
    /// Create a handle with an empty snapshot.
    pub fn new(
        backend: Box<dyn Backend>,
        application: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            snapshot: EnvironmentSnapshot::new(application, environment),
            watch: WatchOptions::default(),
        }
    }

    /// Use different watch timing. The timeout passed to [`wait`](Self::wait)
    /// still takes precedence.
    #[must_use]
    pub fn with_watch_options(mut self, options: WatchOptions) -> Self {
        self.watch = options;
        self
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Read the environment from the service.
    ///
    /// Replaces the variable overlay with the remote variables.
    pub async fn load(&mut self) -> Result<&EnvironmentSnapshot> {
        loader::load(self.backend.as_ref(), &mut self.snapshot).await?;
        Ok(&self.snapshot)
    }

    /// Send the staged changes as one update.
    ///
    /// Returns the snapshot refreshed from the service's answer.
    pub async fn update(&mut self) -> Result<&EnvironmentSnapshot> {
        dispatcher::update(self.backend.as_ref(), &mut self.snapshot).await?;
        Ok(&self.snapshot)
    }

    /// Wait for the last update to complete, up to `timeout`.
    pub async fn wait(&mut self, timeout: Duration) -> Result<WaitOutcome> {
        let options = WatchOptions {
            timeout,
            ..self.watch
        };
        watcher::wait(self.backend.as_ref(), &mut self.snapshot, options).await
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Merge variables into the overlay. Later values win per key.
    pub fn set_vars<K, I>(&mut self, vars: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, VarValue)>,
    {
        self.snapshot.set_vars(vars);
    }

    /// Stage a variable value.
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.snapshot.set_vars([(key.into(), VarValue::set(value))]);
    }

    /// Stage a variable removal.
    pub fn remove_var(&mut self, key: impl Into<String>) {
        self.snapshot.set_vars([(key.into(), VarValue::Remove)]);
    }

    /// Stage a new description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.snapshot.stage_description(description);
    }

    /// Stage an application version to deploy.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.snapshot.stage_version(version);
    }

    /// Stage a platform change.
    pub fn set_platform(&mut self, platform: impl Into<String>) {
        self.snapshot.stage_platform(platform);
    }

    /// Stage a configuration template.
    pub fn set_template(&mut self, template: impl Into<String>) {
        self.snapshot.stage_template(template);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Public fields of the snapshot.
    #[must_use]
    pub fn info(&self) -> EnvironmentInfo {
        self.snapshot.info()
    }

    /// The full snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &EnvironmentSnapshot {
        &self.snapshot
    }

    /// The update request [`update`](Self::update) would send now.
    #[must_use]
    pub fn planned_update(&self) -> UpdateRequest {
        dispatcher::build_request(&self.snapshot)
    }
}
