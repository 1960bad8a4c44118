//! Core types for environment management.
//!
//! This module contains the data exchanged with the deployment service
//! (option settings, environment descriptions, events, update requests)
//! and the outcome types returned to callers.

use crate::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Option namespace holding the environment's configuration variables.
pub const ENVIRONMENT_NAMESPACE: &str = "aws:elasticbeanstalk:application:environment";

/// Option namespace of the load balancer settings.
pub const LOAD_BALANCER_NAMESPACE: &str = "aws:elb:loadbalancer";

/// Load balancer option carrying the HTTPS listener port.
pub const HTTPS_PORT_OPTION: &str = "LoadBalancerHTTPSPort";

/// Value of [`HTTPS_PORT_OPTION`] when HTTPS is disabled.
pub const HTTPS_DISABLED: &str = "OFF";

/// Event message marking a successful environment update.
pub const UPDATE_SUCCEEDED_MESSAGE: &str = "Environment update completed successfully.";

/// Event message marking a failed environment update.
pub const UPDATE_FAILED_MESSAGE: &str = "Update environment operation is complete, but with errors.";

/// Desired change to one configuration variable.
///
/// A key that is not present in the overlay at all is left untouched on the
/// remote side.
///
/// # Example
///
/// ```
/// use beanstalk::VarValue;
///
/// let value = VarValue::set("postgres://db");
/// assert_eq!(value.as_set(), Some("postgres://db"));
/// assert!(VarValue::Remove.is_remove());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    /// Write this value.
    Set(String),
    /// Delete the variable.
    Remove,
}

impl VarValue {
    /// Create a `Set` value.
    pub fn set(value: impl Into<String>) -> Self {
        Self::Set(value.into())
    }

    /// The value to write, if this is a `Set`.
    #[must_use]
    pub fn as_set(&self) -> Option<&str> {
        match self {
            Self::Set(value) => Some(value),
            Self::Remove => None,
        }
    }

    /// Whether this marks the variable for removal.
    #[must_use]
    pub fn is_remove(&self) -> bool {
        matches!(self, Self::Remove)
    }
}

impl From<Option<String>> for VarValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Remove, Self::Set)
    }
}

/// A single configuration option with its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionSetting {
    /// Option namespace.
    pub namespace: String,
    /// Option name.
    pub option_name: String,
    /// Option value. The service omits it for options without a value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl OptionSetting {
    /// Create an option setting.
    pub fn new(
        namespace: impl Into<String>,
        option_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            option_name: option_name.into(),
            value: Some(value.into()),
        }
    }
}

/// Reference to a configuration option, used to remove it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OptionSpecification {
    /// Option namespace.
    pub namespace: String,
    /// Option name.
    pub option_name: String,
}

impl OptionSpecification {
    /// Create an option specification.
    pub fn new(namespace: impl Into<String>, option_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            option_name: option_name.into(),
        }
    }
}

/// The parts of an environment's configuration this crate cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationSettings {
    /// Configuration variables.
    pub vars: BTreeMap<String, String>,
    /// HTTPS listener port, `None` when HTTPS is disabled.
    pub https_port: Option<u16>,
}

impl ConfigurationSettings {
    /// Extract variables and the HTTPS port from raw option settings.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidResponse` if the HTTPS port option holds
    /// something other than `OFF` or a port number.
    pub fn from_options(options: &[OptionSetting]) -> ServiceResult<Self> {
        let mut settings = Self::default();

        for option in options {
            if option.namespace == ENVIRONMENT_NAMESPACE {
                settings.vars.insert(
                    option.option_name.clone(),
                    option.value.clone().unwrap_or_default(),
                );
            }

            if option.namespace == LOAD_BALANCER_NAMESPACE && option.option_name == HTTPS_PORT_OPTION {
                settings.https_port = match option.value.as_deref().map(str::trim) {
                    None | Some(HTTPS_DISABLED) => None,
                    Some(port) => Some(port.parse().map_err(|_| {
                        ServiceError::InvalidResponse(format!(
                            "invalid {HTTPS_PORT_OPTION} value: {port}"
                        ))
                    })?),
                };
            }
        }

        Ok(settings)
    }
}

/// Description of an environment as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EnvironmentDescription {
    /// Environment identifier.
    pub environment_id: Option<String>,
    /// Application the environment belongs to.
    pub application_name: String,
    /// Environment name.
    pub environment_name: String,
    /// Human description.
    pub description: Option<String>,
    /// Platform / solution stack.
    pub solution_stack_name: Option<String>,
    /// Deployed application version label.
    pub version_label: Option<String>,
    /// Lifecycle status (e.g. `Launching`, `Updating`, `Ready`).
    pub status: Option<String>,
    /// Health indicator (e.g. `Green`, `Yellow`, `Red`, `Grey`).
    pub health: Option<String>,
    /// Public host name.
    #[serde(rename = "CNAME")]
    pub cname: Option<String>,
    /// Last update time.
    pub date_updated: Option<DateTime<Utc>>,
}

/// Parameters of an environment update.
///
/// Optional fields that are `None` are not sent, so the service leaves them
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateRequest {
    /// Application name.
    pub application_name: String,
    /// Environment name.
    pub environment_name: String,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Application version to deploy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,
    /// Saved configuration template to apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    /// Platform / solution stack to switch to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_stack_name: Option<String>,
    /// Options to write.
    #[serde(default)]
    pub option_settings: Vec<OptionSetting>,
    /// Options to delete.
    #[serde(default)]
    pub options_to_remove: Vec<OptionSpecification>,
}

impl UpdateRequest {
    /// Whether any of the optional environment fields is set.
    #[must_use]
    pub fn has_field_changes(&self) -> bool {
        self.description.is_some()
            || self.version_label.is_some()
            || self.template_name.is_some()
            || self.solution_stack_name.is_some()
    }
}

/// Response to an environment update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResponse {
    /// The environment as echoed by the service.
    pub environment: EnvironmentDescription,
    /// Identifier of the update request, used to correlate events.
    pub request_id: String,
}

/// Filter for the event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventQuery {
    /// Application name.
    pub application_name: String,
    /// Environment name.
    pub environment_name: String,
    /// Only events caused by this request.
    pub request_id: String,
}

/// An entry of the event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    /// Event message.
    pub message: String,
    /// When the event happened.
    pub event_date: DateTime<Utc>,
    /// Severity (`INFO`, `WARN`, `ERROR`, ...).
    #[serde(default)]
    pub severity: Option<String>,
}

impl Event {
    /// Create an informational event dated now.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            event_date: Utc::now(),
            severity: Some("INFO".to_string()),
        }
    }

    /// Whether this event marks the successful end of an update.
    #[must_use]
    pub fn is_update_success(&self) -> bool {
        self.message == UPDATE_SUCCEEDED_MESSAGE
    }

    /// Whether this event marks the failed end of an update.
    #[must_use]
    pub fn is_update_failure(&self) -> bool {
        self.message == UPDATE_FAILED_MESSAGE
    }
}

/// Final result of watching an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The update completed and the environment was refreshed.
    Succeeded {
        /// The terminal event.
        event: Event,
    },
    /// The update completed with errors.
    Failed {
        /// The terminal event.
        event: Event,
    },
    /// No terminal event was seen before the deadline. The update may still
    /// succeed or fail later.
    TimedOut {
        /// The deadline that elapsed.
        after: Duration,
    },
}

impl WaitOutcome {
    /// Whether the update is known to have succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Whether the deadline elapsed before a terminal event.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// The terminal event, if one was observed.
    #[must_use]
    pub fn event(&self) -> Option<&Event> {
        match self {
            Self::Succeeded { event } | Self::Failed { event } => Some(event),
            Self::TimedOut { .. } => None,
        }
    }

    /// Human readable message for this outcome.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Succeeded { event } | Self::Failed { event } => event.message.clone(),
            Self::TimedOut { after } => {
                format!("no terminal event after {}s", after.as_secs())
            }
        }
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { .. } => write!(f, "succeeded: {}", self.message()),
            Self::Failed { .. } => write!(f, "failed: {}", self.message()),
            Self::TimedOut { .. } => write!(f, "timed out: {}", self.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // VarValue tests
    // =========================================================================

    #[test]
    fn test_var_value_accessors() {
        let value = VarValue::set("1");
        assert_eq!(value.as_set(), Some("1"));
        assert!(!value.is_remove());

        assert_eq!(VarValue::Remove.as_set(), None);
        assert!(VarValue::Remove.is_remove());
    }

    #[test]
    fn test_var_value_from_option() {
        assert_eq!(VarValue::from(Some("x".to_string())), VarValue::set("x"));
        assert_eq!(VarValue::from(None), VarValue::Remove);
    }

    #[test]
    fn test_var_value_serialization() {
        let mut vars = BTreeMap::new();
        vars.insert("A".to_string(), VarValue::set("1"));
        vars.insert("B".to_string(), VarValue::Remove);

        let json = serde_json::to_string(&vars).unwrap();
        assert_eq!(json, r#"{"A":"1","B":null}"#);

        let parsed: BTreeMap<String, VarValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vars);
    }

    // =========================================================================
    // ConfigurationSettings tests
    // =========================================================================

    #[test]
    fn test_configuration_from_options() {
        let options = vec![
            OptionSetting::new(ENVIRONMENT_NAMESPACE, "DATABASE_URL", "postgres://db"),
            OptionSetting::new(ENVIRONMENT_NAMESPACE, "DEBUG", "false"),
            OptionSetting::new("aws:autoscaling:asg", "MinSize", "1"),
            OptionSetting::new(LOAD_BALANCER_NAMESPACE, HTTPS_PORT_OPTION, "443"),
        ];

        let settings = ConfigurationSettings::from_options(&options).unwrap();
        assert_eq!(settings.vars.len(), 2);
        assert_eq!(settings.vars["DATABASE_URL"], "postgres://db");
        assert_eq!(settings.https_port, Some(443));
    }

    #[test]
    fn test_configuration_https_off() {
        let options = vec![OptionSetting::new(
            LOAD_BALANCER_NAMESPACE,
            HTTPS_PORT_OPTION,
            "OFF",
        )];

        let settings = ConfigurationSettings::from_options(&options).unwrap();
        assert_eq!(settings.https_port, None);
        assert!(settings.vars.is_empty());
    }

    #[test]
    fn test_configuration_invalid_port() {
        let options = vec![OptionSetting::new(
            LOAD_BALANCER_NAMESPACE,
            HTTPS_PORT_OPTION,
            "https",
        )];

        let result = ConfigurationSettings::from_options(&options);
        assert!(matches!(result, Err(ServiceError::InvalidResponse(_))));
    }

    #[test]
    fn test_configuration_var_without_value() {
        let options = vec![OptionSetting {
            namespace: ENVIRONMENT_NAMESPACE.to_string(),
            option_name: "EMPTY".to_string(),
            value: None,
        }];

        let settings = ConfigurationSettings::from_options(&options).unwrap();
        assert_eq!(settings.vars["EMPTY"], "");
    }

    // =========================================================================
    // Wire format tests
    // =========================================================================

    #[test]
    fn test_environment_description_deserialize() {
        let json = r#"{
            "EnvironmentId": "e-abc123",
            "ApplicationName": "shop",
            "EnvironmentName": "shop-prod",
            "SolutionStackName": "64bit Amazon Linux 2023 v6.1.0 running Node.js 20",
            "VersionLabel": "v42",
            "Status": "Ready",
            "Health": "Green",
            "CNAME": "shop-prod.example.com",
            "DateUpdated": "2024-01-15T10:00:00Z"
        }"#;

        let desc: EnvironmentDescription = serde_json::from_str(json).unwrap();
        assert_eq!(desc.environment_id.as_deref(), Some("e-abc123"));
        assert_eq!(desc.cname.as_deref(), Some("shop-prod.example.com"));
        assert_eq!(desc.description, None);
        assert!(desc.date_updated.is_some());
    }

    #[test]
    fn test_update_request_skips_unset_fields() {
        let request = UpdateRequest {
            application_name: "shop".to_string(),
            environment_name: "shop-prod".to_string(),
            version_label: Some("v43".to_string()),
            ..UpdateRequest::default()
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["VersionLabel"], "v43");
        assert!(json.get("Description").is_none());
        assert!(json.get("TemplateName").is_none());
        assert_eq!(json["OptionSettings"], serde_json::json!([]));
        assert!(request.has_field_changes());
    }

    #[test]
    fn test_update_request_without_fields() {
        let request = UpdateRequest::default();
        assert!(!request.has_field_changes());
    }

    // =========================================================================
    // Event and WaitOutcome tests
    // =========================================================================

    #[test]
    fn test_event_terminal_messages() {
        assert!(Event::new(UPDATE_SUCCEEDED_MESSAGE).is_update_success());
        assert!(Event::new(UPDATE_FAILED_MESSAGE).is_update_failure());

        let progress = Event::new("Deploying new version to instance(s).");
        assert!(!progress.is_update_success());
        assert!(!progress.is_update_failure());
    }

    #[test]
    fn test_wait_outcome_accessors() {
        let ok = WaitOutcome::Succeeded {
            event: Event::new(UPDATE_SUCCEEDED_MESSAGE),
        };
        assert!(ok.is_success());
        assert_eq!(ok.message(), UPDATE_SUCCEEDED_MESSAGE);
        assert!(ok.event().is_some());

        let failed = WaitOutcome::Failed {
            event: Event::new(UPDATE_FAILED_MESSAGE),
        };
        assert!(!failed.is_success());
        assert!(!failed.is_timeout());
        assert!(format!("{failed}").starts_with("failed"));

        let timed_out = WaitOutcome::TimedOut {
            after: Duration::from_secs(30),
        };
        assert!(!timed_out.is_success());
        assert!(timed_out.is_timeout());
        assert!(timed_out.message().contains("30s"));
        assert!(format!("{timed_out}").starts_with("timed out"));
        assert!(timed_out.event().is_none());
    }
}
