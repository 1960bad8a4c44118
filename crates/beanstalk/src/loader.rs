//! Loading an environment snapshot.
//!
//! Both reads are issued at once and awaited together. Their results are
//! merged only after both have finished, configuration first, so the final
//! URL does not depend on which read the service answered first.

use crate::backend::Backend;
use crate::error::{Error, FetchTarget, Result};
use crate::snapshot::EnvironmentSnapshot;

/// Populate a snapshot from the service.
///
/// A read that succeeds is merged even when the other one fails.
///
/// # Errors
///
/// Returns `Error::Fetch` for the first failed read, checking the
/// configuration read before the environment read.
pub async fn load(backend: &dyn Backend, snapshot: &mut EnvironmentSnapshot) -> Result<()> {
    log::debug!(
        "Describing {}/{} (configuration and environment)",
        snapshot.application,
        snapshot.name
    );

    let (configuration, description) = tokio::join!(
        backend.describe_configuration(&snapshot.application, &snapshot.name),
        backend.describe_environment(&snapshot.application, &snapshot.name),
    );

    let configuration = match configuration {
        Ok(settings) => {
            log::debug!(
                "Merging {} variable(s), HTTPS {}",
                settings.vars.len(),
                settings
                    .https_port
                    .map_or_else(|| "off".to_string(), |port| port.to_string())
            );
            snapshot.apply_configuration(settings);
            Ok(())
        }
        Err(source) => Err(Error::Fetch {
            target: FetchTarget::Configuration,
            source,
        }),
    };

    let description = match description {
        Ok(description) => {
            snapshot.apply_description(&description);
            snapshot.discard_staged();
            log::debug!(
                "Environment {} is {}",
                snapshot.name,
                snapshot.status.as_deref().unwrap_or("unknown")
            );
            Ok(())
        }
        Err(source) => Err(Error::Fetch {
            target: FetchTarget::Environment,
            source,
        }),
    };

    configuration.and(description)
}
