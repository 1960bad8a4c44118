//! Dispatching environment updates.

use crate::backend::Backend;
use crate::diff::diff_vars;
use crate::error::{Error, Result};
use crate::snapshot::EnvironmentSnapshot;
use crate::types::UpdateRequest;

/// Build the update request for a snapshot's pending changes.
///
/// Only the fields staged by the caller are included, never values that
/// were merely loaded, together with the full variable diff.
#[must_use]
pub fn build_request(snapshot: &EnvironmentSnapshot) -> UpdateRequest {
    let diff = diff_vars(&snapshot.vars);
    let staged = snapshot.staged();

    UpdateRequest {
        application_name: snapshot.application.clone(),
        environment_name: snapshot.name.clone(),
        description: staged.description.clone(),
        version_label: staged.version.clone(),
        template_name: staged.template.clone(),
        solution_stack_name: staged.platform.clone(),
        option_settings: diff.to_set,
        options_to_remove: diff.to_remove,
    }
}

/// Send the snapshot's pending changes to the service.
///
/// On success the echoed environment is merged into the snapshot, the staged
/// fields are cleared and the returned request id becomes the pending request that
/// [`wait`](crate::watcher::wait) watches.
///
/// # Errors
///
/// - `Error::NothingToUpdate` if no field is staged and the overlay is empty.
///   No remote call is made.
/// - `Error::Mutate` if the service rejects the update. The snapshot is left
///   unchanged.
pub async fn update(backend: &dyn Backend, snapshot: &mut EnvironmentSnapshot) -> Result<()> {
    let request = build_request(snapshot);

    if !request.has_field_changes()
        && request.option_settings.is_empty()
        && request.options_to_remove.is_empty()
    {
        return Err(Error::NothingToUpdate {
            environment: snapshot.name.clone(),
        });
    }

    log::info!(
        "Updating {}/{} ({} to set, {} to remove)",
        request.application_name,
        request.environment_name,
        request.option_settings.len(),
        request.options_to_remove.len()
    );

    let response = backend
        .update_environment(&request)
        .await
        .map_err(|source| Error::Mutate {
            environment: snapshot.name.clone(),
            source,
        })?;

    snapshot.apply_description(&response.environment);
    snapshot.discard_staged();
    log::debug!("Update accepted, request id {}", response.request_id);
    snapshot.set_pending_request(response.request_id);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::error::ServiceError;
    use crate::types::{ENVIRONMENT_NAMESPACE, EnvironmentDescription, VarValue};

    fn description() -> EnvironmentDescription {
        EnvironmentDescription {
            environment_id: Some("e-abc123".to_string()),
            application_name: "shop".to_string(),
            environment_name: "shop-prod".to_string(),
            status: Some("Ready".to_string()),
            cname: Some("shop-prod.example.com".to_string()),
            ..EnvironmentDescription::default()
        }
    }

    #[tokio::test]
    async fn test_update_nothing_to_update() {
        let backend = MockBackend::new();
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");

        let err = update(&backend, &mut snapshot).await.unwrap_err();

        assert!(matches!(err, Error::NothingToUpdate { ref environment } if environment == "shop-prod"));
        assert_eq!(backend.total_calls(), 0);
        assert!(snapshot.request_id().is_none());
    }

    #[tokio::test]
    async fn test_update_version_only() {
        let backend = MockBackend::new().with_environment(description());
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.stage_version("v43");

        update(&backend, &mut snapshot).await.unwrap();

        let requests = backend.update_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].version_label.as_deref(), Some("v43"));
        assert!(requests[0].description.is_none());
        assert!(requests[0].template_name.is_none());
        assert!(requests[0].option_settings.is_empty());

        assert_eq!(snapshot.request_id(), Some("req-1"));
        assert_eq!(snapshot.status.as_deref(), Some("Updating"));
        assert_eq!(snapshot.version.as_deref(), Some("v43"));
    }

    #[tokio::test]
    async fn test_update_sends_var_diff() {
        let backend = MockBackend::new().with_environment(description());
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.set_vars([
            ("DATABASE_URL", VarValue::set("postgres://db")),
            ("LEGACY_FLAG", VarValue::Remove),
        ]);

        update(&backend, &mut snapshot).await.unwrap();

        let request = &backend.update_requests()[0];
        assert_eq!(request.application_name, "shop");
        assert_eq!(request.environment_name, "shop-prod");
        assert_eq!(request.option_settings.len(), 1);
        assert_eq!(request.option_settings[0].namespace, ENVIRONMENT_NAMESPACE);
        assert_eq!(request.option_settings[0].option_name, "DATABASE_URL");
        assert_eq!(request.options_to_remove.len(), 1);
        assert_eq!(request.options_to_remove[0].option_name, "LEGACY_FLAG");
    }

    #[tokio::test]
    async fn test_update_template_only() {
        let backend = MockBackend::new().with_environment(description());
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.stage_template("hardened");

        update(&backend, &mut snapshot).await.unwrap();

        assert_eq!(
            backend.update_requests()[0].template_name.as_deref(),
            Some("hardened")
        );
    }

    #[tokio::test]
    async fn test_update_merges_response_url() {
        let backend = MockBackend::new().with_environment(description());
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.stage_description("Production");

        update(&backend, &mut snapshot).await.unwrap();

        assert_eq!(snapshot.id.as_deref(), Some("e-abc123"));
        assert_eq!(snapshot.url(), Some("http://shop-prod.example.com"));
        assert_eq!(snapshot.description.as_deref(), Some("Production"));
    }

    #[tokio::test]
    async fn test_update_failure_leaves_snapshot_untouched() {
        let backend = MockBackend::new()
            .with_environment(description())
            .with_update_error(ServiceError::api("InvalidParameterValue", "No Application Version named 'v99'"));
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.stage_version("v99");
        let before = snapshot.clone();

        let err = update(&backend, &mut snapshot).await.unwrap_err();

        assert!(matches!(err, Error::Mutate { .. }));
        assert!(err.to_string().contains("v99"));
        assert_eq!(snapshot, before);
        assert!(snapshot.request_id().is_none());
    }

    #[tokio::test]
    async fn test_second_update_replaces_request_id() {
        let backend = MockBackend::new().with_environment(description());
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.stage_version("v43");

        update(&backend, &mut snapshot).await.unwrap();
        snapshot.stage_version("v44");
        update(&backend, &mut snapshot).await.unwrap();

        assert_eq!(backend.update_requests()[1].version_label.as_deref(), Some("v44"));
        assert_eq!(snapshot.request_id(), Some("req-2"));
        assert_eq!(snapshot.last_request_id(), Some("req-2"));
    }

    #[tokio::test]
    async fn test_update_clears_staged_fields() {
        let backend = MockBackend::new().with_environment(description());
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.stage_template("hardened");

        update(&backend, &mut snapshot).await.unwrap();
        assert!(snapshot.staged().is_empty());
        assert!(snapshot.template.is_none());

        let err = update(&backend, &mut snapshot).await.unwrap_err();
        assert!(matches!(err, Error::NothingToUpdate { .. }));
        assert_eq!(backend.update_calls(), 1);
    }

    #[test]
    fn test_build_request_ignores_loaded_fields() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.apply_description(&EnvironmentDescription {
            description: Some("Production".to_string()),
            solution_stack_name: Some("Node.js 20".to_string()),
            version_label: Some("v42".to_string()),
            ..description()
        });

        let request = build_request(&snapshot);
        assert!(!request.has_field_changes());

        snapshot.stage_template("hardened");
        let request = build_request(&snapshot);
        assert_eq!(request.template_name.as_deref(), Some("hardened"));
        assert!(request.solution_stack_name.is_none());
        assert!(request.version_label.is_none());
        assert!(request.description.is_none());
    }

    #[test]
    fn test_build_request_skips_unset_fields() {
        let mut snapshot = EnvironmentSnapshot::new("shop", "shop-prod");
        snapshot.stage_platform("Node.js 20");

        let request = build_request(&snapshot);
        assert_eq!(request.solution_stack_name.as_deref(), Some("Node.js 20"));
        assert!(request.version_label.is_none());
        assert!(request.has_field_changes());
    }
}
