pub mod config;
pub mod info;
pub mod update;
pub mod vars;

use anyhow::Result;
use beanstalk::Environment;
use beanstalk::backend::gateway::GatewayBackend;

use crate::Context;
use crate::cli::TargetArgs;
use crate::config::Target;
use crate::progress;

/// Build an environment handle for the selected target
pub fn open(ctx: &Context, args: &TargetArgs) -> Result<(Target, Environment)> {
    let target = ctx.config.resolve_target(
        args.target.as_deref(),
        args.application.as_deref(),
        args.environment.as_deref(),
    )?;

    let endpoint = ctx.config.endpoint(ctx.endpoint.as_deref())?;
    log::debug!("Using gateway {endpoint} for {target}");

    let mut backend = GatewayBackend::new(endpoint);
    if let Some(token) = ctx.config.token(ctx.token.as_deref()) {
        backend = backend.with_token(token);
    }

    let env = Environment::new(
        Box::new(backend),
        target.application.clone(),
        target.environment.clone(),
    )
    .with_watch_options(ctx.config.watch_options(None));

    Ok((target, env))
}

/// Load an environment behind a spinner
pub async fn load(ctx: &Context, env: &mut Environment, target: &Target) -> Result<()> {
    let pb = progress::spinner(&format!("Loading {target}"), ctx.quiet);

    match env.load().await {
        Ok(_) => {
            progress::finish_clear(&pb);
            Ok(())
        }
        Err(e) => {
            progress::finish_error(&pb, &format!("Could not load {target}"));
            Err(failure(e))
        }
    }
}

/// Attach the category advice to a library error
pub fn failure(err: beanstalk::Error) -> anyhow::Error {
    let category = err.category();
    let retry = if category.is_retryable() {
        " This is usually transient."
    } else {
        ""
    };
    let hint = format!("{}: {}.{retry}", category.description(), category.advice());
    anyhow::Error::new(err).context(hint)
}
