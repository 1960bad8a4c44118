//! The last-known state of one environment.

use crate::types::{ConfigurationSettings, EnvironmentDescription, VarValue};
use crate::url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment fields the caller has set for the next update.
///
/// Kept apart from the loaded values so an update only carries what was
/// asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedFields {
    /// New description.
    pub description: Option<String>,
    /// Application version label to deploy.
    pub version: Option<String>,
    /// Platform / solution stack to switch to.
    pub platform: Option<String>,
    /// Saved configuration template to apply.
    pub template: Option<String>,
}

impl StagedFields {
    /// Whether no field is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.version.is_none()
            && self.platform.is_none()
            && self.template.is_none()
    }
}

/// Last-known, server-confirmed state of one environment plus the caller's
/// pending changes.
///
/// The public fields are what [`EnvironmentSnapshot::info`] projects. The
/// URL, the HTTPS port and the request bookkeeping are internal: the URL is
/// always derived from the host and the HTTPS port, and request ids are only
/// set by a dispatched update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    /// Environment identifier assigned by the service.
    pub id: Option<String>,
    /// Application name.
    pub application: String,
    /// Environment name.
    pub name: String,
    /// Human description.
    pub description: Option<String>,
    /// Platform / solution stack.
    pub platform: Option<String>,
    /// Application version label.
    pub version: Option<String>,
    /// Configuration template to apply on the next update.
    pub template: Option<String>,
    /// Configuration variable overlay.
    pub vars: BTreeMap<String, VarValue>,
    /// Lifecycle status.
    pub status: Option<String>,
    /// Health indicator.
    pub health: Option<String>,
    url: Option<String>,
    https_port: Option<u16>,
    staged: StagedFields,
    request_id: Option<String>,
    last_request_id: Option<String>,
}

impl EnvironmentSnapshot {
    /// Create an empty snapshot for an application environment.
    pub fn new(application: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            id: None,
            application: application.into(),
            name: environment.into(),
            description: None,
            platform: None,
            version: None,
            template: None,
            vars: BTreeMap::new(),
            status: None,
            health: None,
            url: None,
            https_port: None,
            staged: StagedFields::default(),
            request_id: None,
            last_request_id: None,
        }
    }

    /// Public URL, once the host is known.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// HTTPS listener port, `None` when HTTPS is disabled.
    #[must_use]
    pub fn https_port(&self) -> Option<u16> {
        self.https_port
    }

    /// Request id of the dispatched update still waiting for an outcome.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Request id of the most recently dispatched update, kept after its
    /// outcome was reported.
    #[must_use]
    pub fn last_request_id(&self) -> Option<&str> {
        self.last_request_id.as_deref()
    }

    /// Fields staged for the next update.
    #[must_use]
    pub fn staged(&self) -> &StagedFields {
        &self.staged
    }

    /// Stage a new description.
    pub fn stage_description(&mut self, description: impl Into<String>) {
        let description = description.into();
        self.description = Some(description.clone());
        self.staged.description = Some(description);
    }

    /// Stage an application version to deploy.
    pub fn stage_version(&mut self, version: impl Into<String>) {
        let version = version.into();
        self.version = Some(version.clone());
        self.staged.version = Some(version);
    }

    /// Stage a platform change.
    pub fn stage_platform(&mut self, platform: impl Into<String>) {
        let platform = platform.into();
        self.platform = Some(platform.clone());
        self.staged.platform = Some(platform);
    }

    /// Stage a configuration template.
    pub fn stage_template(&mut self, template: impl Into<String>) {
        let template = template.into();
        self.template = Some(template.clone());
        self.staged.template = Some(template);
    }

    /// Drop every staged field, including the pending template.
    pub(crate) fn discard_staged(&mut self) {
        self.staged = StagedFields::default();
        self.template = None;
    }

    /// Merge variables into the overlay. Later values win per key.
    pub fn set_vars<K, I>(&mut self, vars: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, VarValue)>,
    {
        for (key, value) in vars {
            self.vars.insert(key.into(), value);
        }
    }

    /// Replace variables and HTTPS setting with freshly read configuration.
    ///
    /// A known URL keeps its host and gets the new scheme and port.
    pub fn apply_configuration(&mut self, settings: ConfigurationSettings) {
        self.vars = settings
            .vars
            .into_iter()
            .map(|(key, value)| (key, VarValue::Set(value)))
            .collect();
        self.https_port = settings.https_port;

        if let Some(current) = &self.url {
            self.url = Some(url::rewrite(current, self.https_port));
        }
    }

    /// Overwrite identity, status and endpoint from a service description.
    pub fn apply_description(&mut self, description: &EnvironmentDescription) {
        self.id.clone_from(&description.environment_id);
        if !description.application_name.is_empty() {
            self.application.clone_from(&description.application_name);
        }
        if !description.environment_name.is_empty() {
            self.name.clone_from(&description.environment_name);
        }
        self.description.clone_from(&description.description);
        self.platform.clone_from(&description.solution_stack_name);
        self.version.clone_from(&description.version_label);
        self.status.clone_from(&description.status);
        self.health.clone_from(&description.health);
        self.url = description
            .cname
            .as_deref()
            .map(|host| url::compose(host, self.https_port));
    }

    /// Record the request id of a dispatched update.
    pub(crate) fn set_pending_request(&mut self, request_id: impl Into<String>) {
        let request_id = request_id.into();
        self.last_request_id = Some(request_id.clone());
        self.request_id = Some(request_id);
    }

    /// Forget the pending request once its outcome was reported.
    pub(crate) fn clear_pending_request(&mut self) {
        self.request_id = None;
    }

    /// Project the public fields into a plain structure.
    #[must_use]
    pub fn info(&self) -> EnvironmentInfo {
        EnvironmentInfo {
            id: self.id.clone(),
            application: self.application.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
            platform: self.platform.clone(),
            version: self.version.clone(),
            template: self.template.clone(),
            vars: self.vars.clone(),
            status: self.status.clone(),
            health: self.health.clone(),
        }
    }
}

/// Read-only projection of an [`EnvironmentSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    /// Environment identifier.
    pub id: Option<String>,
    /// Application name.
    pub application: String,
    /// Environment name.
    pub name: String,
    /// Public URL.
    pub url: Option<String>,
    /// Human description.
    pub description: Option<String>,
    /// Platform / solution stack.
    pub platform: Option<String>,
    /// Application version label.
    pub version: Option<String>,
    /// Pending configuration template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Configuration variables.
    pub vars: BTreeMap<String, VarValue>,
    /// Lifecycle status.
    pub status: Option<String>,
    /// Health indicator.
    pub health: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description(cname: &str) -> EnvironmentDescription {
        EnvironmentDescription {
            environment_id: Some("e-abc123".to_string()),
            application_name: "shop".to_string(),
            environment_name: "shop-prod".to_string(),
            description: Some("Production".to_string()),
            solution_stack_name: Some("Node.js 20".to_string()),
            version_label: Some("v42".to_string()),
            status: Some("Ready".to_string()),
            health: Some("Green".to_string()),
            cname: Some(cname.to_string()),
            date_updated: None,
        }
    }

    fn settings(vars: &[(&str, &str)], https_port: Option<u16>) -> ConfigurationSettings {
        ConfigurationSettings {
            vars: vars
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            https_port,
        }
    }

    #[test]
    fn test_new_snapshot_is_empty() {
        let snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        assert_eq!(snapshot.application, "shop");
        assert_eq!(snapshot.name, "shop-prod");
        assert!(snapshot.url().is_none());
        assert!(snapshot.vars.is_empty());
        assert!(snapshot.request_id().is_none());
    }

    #[test]
    fn test_apply_description() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.apply_description(&description("shop.example.com"));

        assert_eq!(snapshot.id.as_deref(), Some("e-abc123"));
        assert_eq!(snapshot.version.as_deref(), Some("v42"));
        assert_eq!(snapshot.platform.as_deref(), Some("Node.js 20"));
        assert_eq!(snapshot.status.as_deref(), Some("Ready"));
        assert_eq!(snapshot.health.as_deref(), Some("Green"));
        assert_eq!(snapshot.url(), Some("http://shop.example.com"));
    }

    #[test]
    fn test_apply_description_uses_https_port() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.apply_configuration(settings(&[], Some(8443)));
        snapshot.apply_description(&description("shop.example.com"));

        assert_eq!(snapshot.url(), Some("https://shop.example.com:8443"));
    }

    #[test]
    fn test_apply_description_keeps_names_when_missing() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.apply_description(&EnvironmentDescription::default());

        assert_eq!(snapshot.application, "shop");
        assert_eq!(snapshot.name, "shop-prod");
        assert!(snapshot.url().is_none());
    }

    #[test]
    fn test_apply_configuration_replaces_vars() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.set_vars([("STALE", VarValue::set("1"))]);
        snapshot.apply_configuration(settings(&[("DEBUG", "false")], None));

        assert_eq!(snapshot.vars.len(), 1);
        assert_eq!(snapshot.vars["DEBUG"], VarValue::set("false"));
    }

    #[test]
    fn test_apply_configuration_without_url_leaves_it_unset() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.apply_configuration(settings(&[], Some(443)));

        assert!(snapshot.url().is_none());
        assert_eq!(snapshot.https_port(), Some(443));
    }

    #[test]
    fn test_apply_configuration_rewrites_url_default_port() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.url = Some("http://host:80".to_string());
        snapshot.apply_configuration(settings(&[], Some(443)));

        assert_eq!(snapshot.url(), Some("https://host"));
    }

    #[test]
    fn test_apply_configuration_rewrites_url_custom_port() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.url = Some("http://host:80".to_string());
        snapshot.apply_configuration(settings(&[], Some(8443)));

        assert_eq!(snapshot.url(), Some("https://host:8443"));
    }

    #[test]
    fn test_set_vars_last_write_wins() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.set_vars([("A", VarValue::set("1")), ("B", VarValue::set("2"))]);
        snapshot.set_vars([("A", VarValue::Remove), ("C", VarValue::set("3"))]);

        assert_eq!(snapshot.vars["A"], VarValue::Remove);
        assert_eq!(snapshot.vars["B"], VarValue::set("2"));
        assert_eq!(snapshot.vars["C"], VarValue::set("3"));
    }

    #[test]
    fn test_staging_is_tracked_apart_from_loaded_fields() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.apply_description(&description("shop.example.com"));
        assert!(snapshot.staged().is_empty());

        snapshot.stage_version("v43");
        snapshot.stage_template("hardened");

        assert_eq!(snapshot.version.as_deref(), Some("v43"));
        assert_eq!(snapshot.staged().version.as_deref(), Some("v43"));
        assert_eq!(snapshot.staged().template.as_deref(), Some("hardened"));
        assert!(snapshot.staged().platform.is_none());
        assert!(snapshot.staged().description.is_none());

        snapshot.discard_staged();
        assert!(snapshot.staged().is_empty());
        assert!(snapshot.template.is_none());
        assert_eq!(snapshot.version.as_deref(), Some("v43"));
    }

    #[test]
    fn test_pending_request_bookkeeping() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.set_pending_request("req-1");
        assert_eq!(snapshot.request_id(), Some("req-1"));

        snapshot.clear_pending_request();
        assert!(snapshot.request_id().is_none());
        assert_eq!(snapshot.last_request_id(), Some("req-1"));
    }

    #[test]
    fn test_info_excludes_internal_fields() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.apply_configuration(settings(&[("DEBUG", "false")], Some(443)));
        snapshot.apply_description(&description("shop.example.com"));
        snapshot.set_pending_request("req-1");

        let info = snapshot.info();
        assert_eq!(info.url.as_deref(), Some("https://shop.example.com"));

        let json = serde_json::to_value(&info).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert!(keys.iter().all(|k| !k.contains("request")));
        assert!(keys.iter().all(|k| !k.contains("https")));
        assert!(json.get("template").is_none());
        assert_eq!(json["vars"]["DEBUG"], "false");
        assert_eq!(json["name"], "shop-prod");
    }
}
