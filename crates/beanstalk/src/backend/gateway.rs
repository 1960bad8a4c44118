//! JSON-over-HTTP gateway backend.
//!
//! Every operation is a `POST {endpoint}/{Action}` with a JSON body using the
//! deployment API parameter names (`ApplicationName`, `EnvironmentName`,
//! `OptionSettings`, ...) and a JSON response in the same casing. Failed
//! calls answer with `{"Error": {"Code": ..., "Message": ...}}`.
//!
//! Requests are blocking and run on tokio's blocking pool.
//!
//! # Authentication
//!
//! Request signing is left to the gateway. An optional bearer token is sent
//! with every request.

use crate::backend::Backend;
use crate::error::{ServiceError, ServiceResult};
use crate::types::{
    ConfigurationSettings, EnvironmentDescription, Event, EventQuery, OptionSetting,
    UpdateRequest, UpdateResponse,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("beanstalk-rs/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway backend.
///
/// # Example
///
/// ```no_run
/// use beanstalk::backend::gateway::GatewayBackend;
///
/// let backend = GatewayBackend::new("http://localhost:4566").with_token("secret");
/// assert_eq!(backend.endpoint(), "http://localhost:4566");
/// ```
#[derive(Clone)]
pub struct GatewayBackend {
    agent: ureq::Agent,
    endpoint: String,
    token: Option<String>,
}

impl GatewayBackend {
    /// Create a backend for a gateway endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            agent: build_agent(DEFAULT_REQUEST_TIMEOUT),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send a bearer token with every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Change the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    /// Get the gateway endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/{action}", self.endpoint)
    }

    /// Run one action on the blocking pool.
    async fn call<B, R>(&self, action: &'static str, body: &B) -> ServiceResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send + 'static,
    {
        let body = serde_json::to_value(body)?;
        let agent = self.agent.clone();
        let url = self.action_url(action);
        let token = self.token.clone();

        log::debug!("POST {url}");

        tokio::task::spawn_blocking(move || post_json(&agent, &url, token.as_deref(), &body))
            .await
            .map_err(|e| ServiceError::http(format!("{action} did not complete: {e}"), None))?
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

fn post_json<R: DeserializeOwned>(
    agent: &ureq::Agent,
    url: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> ServiceResult<R> {
    let mut request = agent
        .post(url)
        .header("Accept", "application/json")
        .header("User-Agent", USER_AGENT);
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let mut response = request.send_json(body)?;
    let status = response.status();
    let text = response.body_mut().read_to_string()?;

    if !status.is_success() {
        return Err(error_from_body(status.as_u16(), &text));
    }

    Ok(serde_json::from_str(&text)?)
}

/// Turn an error response into a service error, falling back to the status.
fn error_from_body(status: u16, body: &str) -> ServiceError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { error }) => ServiceError::api(error.code, error.message),
        Err(_) => ServiceError::http(format!("HTTP {status}"), Some(status)),
    }
}

#[async_trait]
impl Backend for GatewayBackend {
    async fn describe_configuration(
        &self,
        application: &str,
        environment: &str,
    ) -> ServiceResult<ConfigurationSettings> {
        let body = DescribeConfigurationSettings {
            application_name: application,
            environment_name: environment,
        };
        let response: ConfigurationSettingsResponse =
            self.call("DescribeConfigurationSettings", &body).await?;

        let settings = response
            .configuration_settings
            .into_iter()
            .next()
            .ok_or_else(|| {
                ServiceError::InvalidResponse(format!(
                    "no configuration settings returned for {environment}"
                ))
            })?;

        ConfigurationSettings::from_options(&settings.option_settings)
    }

    async fn describe_environment(
        &self,
        application: &str,
        environment: &str,
    ) -> ServiceResult<EnvironmentDescription> {
        let body = DescribeEnvironments {
            application_name: application,
            environment_names: vec![environment],
        };
        let response: EnvironmentsResponse = self.call("DescribeEnvironments", &body).await?;

        response.environments.into_iter().next().ok_or_else(|| {
            ServiceError::api(
                "EnvironmentNotFound",
                format!("No Environment found for EnvironmentName = '{environment}'"),
            )
        })
    }

    async fn update_environment(&self, request: &UpdateRequest) -> ServiceResult<UpdateResponse> {
        let response: UpdateEnvironmentResponse = self.call("UpdateEnvironment", request).await?;
        Ok(response.into())
    }

    async fn describe_events(&self, query: &EventQuery) -> ServiceResult<Vec<Event>> {
        let response: EventsResponse = self.call("DescribeEvents", query).await?;
        Ok(response.events)
    }
}

// =============================================================================
// Gateway request and response types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeConfigurationSettings<'a> {
    application_name: &'a str,
    environment_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeEnvironments<'a> {
    application_name: &'a str,
    environment_names: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConfigurationSettingsResponse {
    #[serde(default)]
    configuration_settings: Vec<ConfigurationSettingsDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConfigurationSettingsDescription {
    #[serde(default)]
    option_settings: Vec<OptionSetting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnvironmentsResponse {
    #[serde(default)]
    environments: Vec<EnvironmentDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateEnvironmentResponse {
    #[serde(flatten)]
    environment: EnvironmentDescription,
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseMetadata {
    request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EventsResponse {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

impl From<UpdateEnvironmentResponse> for UpdateResponse {
    fn from(r: UpdateEnvironmentResponse) -> Self {
        Self {
            environment: r.environment,
            request_id: r.response_metadata.request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ENVIRONMENT_NAMESPACE, UPDATE_SUCCEEDED_MESSAGE};

    #[test]
    fn test_action_url() {
        let backend = GatewayBackend::new("http://localhost:4566");
        assert_eq!(
            backend.action_url("DescribeEvents"),
            "http://localhost:4566/DescribeEvents"
        );
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let backend = GatewayBackend::new("https://gateway.example.com/eb/");
        assert_eq!(backend.endpoint(), "https://gateway.example.com/eb");
        assert_eq!(
            backend.action_url("UpdateEnvironment"),
            "https://gateway.example.com/eb/UpdateEnvironment"
        );
    }

    #[test]
    fn test_with_token() {
        let backend = GatewayBackend::new("http://localhost:4566").with_token("secret");
        assert_eq!(backend.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_error_from_body_api_error() {
        let body = r#"{"Error": {"Code": "InvalidParameterValue", "Message": "No Application named 'shop' found."}}"#;
        let err = error_from_body(400, body);
        assert_eq!(
            err,
            ServiceError::api("InvalidParameterValue", "No Application named 'shop' found.")
        );
    }

    #[test]
    fn test_error_from_body_fallback() {
        let err = error_from_body(502, "<html>Bad Gateway</html>");
        assert_eq!(err, ServiceError::http("HTTP 502", Some(502)));
    }

    #[test]
    fn test_describe_environments_body() {
        let body = DescribeEnvironments {
            application_name: "shop",
            environment_names: vec!["shop-prod"],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ApplicationName"], "shop");
        assert_eq!(json["EnvironmentNames"], serde_json::json!(["shop-prod"]));
    }

    #[test]
    fn test_event_query_body() {
        let query = EventQuery {
            application_name: "shop".to_string(),
            environment_name: "shop-prod".to_string(),
            request_id: "5f8e1c2a".to_string(),
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["RequestId"], "5f8e1c2a");
        assert_eq!(json["EnvironmentName"], "shop-prod");
    }

    #[test]
    fn test_configuration_settings_response() {
        let json = format!(
            r#"{{"ConfigurationSettings": [{{"OptionSettings": [
                {{"Namespace": "{ENVIRONMENT_NAMESPACE}", "OptionName": "DEBUG", "Value": "false"}},
                {{"Namespace": "aws:elb:loadbalancer", "OptionName": "LoadBalancerHTTPSPort", "Value": "OFF"}}
            ]}}]}}"#
        );

        let response: ConfigurationSettingsResponse = serde_json::from_str(&json).unwrap();
        let options = &response.configuration_settings[0].option_settings;
        let settings = ConfigurationSettings::from_options(options).unwrap();
        assert_eq!(settings.vars["DEBUG"], "false");
        assert_eq!(settings.https_port, None);
    }

    #[test]
    fn test_update_environment_response() {
        let json = r#"{
            "EnvironmentId": "e-abc123",
            "ApplicationName": "shop",
            "EnvironmentName": "shop-prod",
            "VersionLabel": "v43",
            "Status": "Updating",
            "CNAME": "shop-prod.example.com",
            "ResponseMetadata": {"RequestId": "5f8e1c2a"}
        }"#;

        let response: UpdateResponse = serde_json::from_str::<UpdateEnvironmentResponse>(json)
            .unwrap()
            .into();
        assert_eq!(response.request_id, "5f8e1c2a");
        assert_eq!(response.environment.status.as_deref(), Some("Updating"));
        assert_eq!(response.environment.version_label.as_deref(), Some("v43"));
    }

    #[test]
    fn test_events_response() {
        let json = format!(
            r#"{{"Events": [
                {{"Message": "{UPDATE_SUCCEEDED_MESSAGE}", "EventDate": "2024-01-15T10:05:00Z", "Severity": "INFO"}},
                {{"Message": "Deploying new version to instance(s).", "EventDate": "2024-01-15T10:03:00Z"}}
            ]}}"#
        );

        let response: EventsResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response.events.len(), 2);
        assert!(response.events[0].is_update_success());
        assert_eq!(response.events[1].severity, None);
    }

    #[test]
    fn test_empty_events_response() {
        let response: EventsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.events.is_empty());
    }
}
