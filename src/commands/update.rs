use anyhow::{Result, bail};
use beanstalk::{Environment, EnvironmentInfo, Event, VarValue, WaitOutcome};
use colored::Colorize;

use crate::Context;
use crate::cli::UpdateArgs;
use crate::config::Target;
use crate::{progress, ui};

pub async fn run(ctx: &Context, args: UpdateArgs) -> Result<()> {
    if !has_changes(&args) {
        bail!(
            "Nothing to change: pass --set, --unset, --version-label, --description, --platform or --template"
        );
    }

    let (target, mut env) = super::open(ctx, &args.target)?;
    super::load(ctx, &mut env, &target).await?;

    let before = env.info();
    stage(&mut env, &args);
    let plan = Plan::new(&before, &env.info());

    if plan.is_empty() {
        ui::success(&format!("{target} already matches, no update needed"));
        return Ok(());
    }

    display_plan(&target, &plan);
    for change in &plan.vars {
        if let Change::Remove { key, from: None } = change {
            ui::warn(&format!("{key} is not set on {target}, removing it has no effect"));
        }
    }

    if args.dry_run {
        println!();
        ui::info("Dry run: no update sent");
        return Ok(());
    }

    let pb = progress::spinner(&format!("Updating {target}"), ctx.quiet);
    if let Err(e) = env.update().await {
        progress::finish_error(&pb, &format!("Update of {target} was not accepted"));
        return Err(super::failure(e));
    }
    let request_id = env.snapshot().request_id().unwrap_or("-").to_string();
    progress::finish_success(&pb, &format!("Update requested (request {request_id})"));

    if !args.wait && args.timeout.is_none() {
        if !ctx.quiet {
            ui::dim("Use --wait to follow the update until it completes");
        }
        return Ok(());
    }

    watch(ctx, &mut env, &target, args.timeout).await
}

async fn watch(
    ctx: &Context,
    env: &mut Environment,
    target: &Target,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let timeout = ctx.config.watch_options(timeout_secs).timeout;
    let pb = progress::spinner(
        &format!("Waiting for {target} (up to {}s)", timeout.as_secs()),
        ctx.quiet,
    );

    let outcome = match env.wait(timeout).await {
        Ok(outcome) => outcome,
        Err(e) => {
            progress::finish_error(&pb, &format!("Lost track of the update on {target}"));
            return Err(super::failure(e));
        }
    };

    match outcome {
        WaitOutcome::Succeeded { event } => {
            progress::finish_success(&pb, &describe_event(&event));
            let info = env.info();
            ui::kv("Status", &ui::or_dash(info.status.as_deref()));
            ui::kv("Health", &ui::or_dash(info.health.as_deref()));
            ui::kv("Version", &ui::or_dash(info.version.as_deref()));
            ui::kv("URL", &ui::or_dash(info.url.as_deref()));
            Ok(())
        }
        WaitOutcome::Failed { event } => {
            progress::finish_error(&pb, &describe_event(&event));
            bail!("Update of {target} completed with errors");
        }
        WaitOutcome::TimedOut { after } => {
            progress::finish_warn(&pb, &format!("No result after {}s", after.as_secs()));
            bail!(
                "Timed out waiting for {target}; the update is still running and may complete later"
            );
        }
    }
}

fn has_changes(args: &UpdateArgs) -> bool {
    args.version_label.is_some()
        || args.description.is_some()
        || args.platform.is_some()
        || args.template.is_some()
        || !args.set.is_empty()
        || !args.unset.is_empty()
}

/// Stage the requested changes. Fields already holding the requested value
/// are left out, and removals are applied after assignments.
fn stage(env: &mut Environment, args: &UpdateArgs) {
    let loaded = env.info();

    if let Some(version) = changed(args.version_label.as_deref(), loaded.version.as_deref()) {
        env.set_version(version);
    }
    if let Some(description) = changed(args.description.as_deref(), loaded.description.as_deref())
    {
        env.set_description(description);
    }
    if let Some(platform) = changed(args.platform.as_deref(), loaded.platform.as_deref()) {
        env.set_platform(platform);
    }
    if let Some(template) = &args.template {
        env.set_template(template.as_str());
    }
    env.set_vars(
        args.set
            .iter()
            .map(|(key, value)| (key.clone(), VarValue::set(value.as_str()))),
    );
    env.set_vars(args.unset.iter().map(|key| (key.clone(), VarValue::Remove)));
}

fn changed<'a>(requested: Option<&'a str>, loaded: Option<&str>) -> Option<&'a str> {
    requested.filter(|value| Some(*value) != loaded)
}

/// Terminal event with its time and severity
fn describe_event(event: &Event) -> String {
    let when = event
        .event_date
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S");
    match &event.severity {
        Some(severity) => format!("{} [{when} {severity}]", event.message),
        None => format!("{} [{when}]", event.message),
    }
}

// ============================================================================
// Plan
// ============================================================================

/// One user-visible difference between the loaded and the staged environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Add { key: String, value: String },
    Modify { key: String, from: String, to: String },
    Remove { key: String, from: Option<String> },
}

/// What an update will change, relative to what was loaded
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub fields: Vec<Change>,
    pub vars: Vec<Change>,
}

impl Plan {
    pub fn new(before: &EnvironmentInfo, after: &EnvironmentInfo) -> Self {
        let mut plan = Self::default();

        let fields = [
            ("version", &before.version, &after.version),
            ("description", &before.description, &after.description),
            ("platform", &before.platform, &after.platform),
            ("template", &before.template, &after.template),
        ];
        for (name, from, to) in fields {
            if let Some(change) = field_change(name, from.as_deref(), to.as_deref()) {
                plan.fields.push(change);
            }
        }

        for (key, value) in &after.vars {
            let from = before.vars.get(key).and_then(VarValue::as_set);
            let change = match (from, value) {
                (None, VarValue::Set(to)) => Change::Add {
                    key: key.clone(),
                    value: to.clone(),
                },
                (Some(from), VarValue::Set(to)) if from != to.as_str() => Change::Modify {
                    key: key.clone(),
                    from: from.to_string(),
                    to: to.clone(),
                },
                (Some(_), VarValue::Set(_)) => continue,
                (from, VarValue::Remove) => Change::Remove {
                    key: key.clone(),
                    from: from.map(str::to_string),
                },
            };
            plan.vars.push(change);
        }

        plan
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn field_change(name: &str, from: Option<&str>, to: Option<&str>) -> Option<Change> {
    match (from, to) {
        (None, Some(to)) => Some(Change::Add {
            key: name.to_string(),
            value: to.to_string(),
        }),
        (Some(from), Some(to)) if from != to => Some(Change::Modify {
            key: name.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }),
        _ => None,
    }
}

fn display_change(change: &Change) {
    match change {
        Change::Add { key, value } => {
            println!("│   {} {:<24} {}", "+".green(), key, value.dimmed());
        }
        Change::Modify { key, from, to } => {
            println!(
                "│   {} {:<24} {}",
                "~".yellow(),
                key,
                format!("{from} → {to}").dimmed()
            );
        }
        Change::Remove { key, from } => {
            let state = if from.is_some() {
                "(will remove)"
            } else {
                "(not set)"
            };
            println!("│   {} {:<24} {}", "-".red(), key, state.dimmed());
        }
    }
}

fn display_plan(target: &Target, plan: &Plan) {
    println!();
    println!("┌─ {} {}", "Planned update:".bold(), target);
    println!("│");

    if !plan.fields.is_empty() {
        println!("│ {}", "Environment".bold());
        plan.fields.iter().for_each(display_change);
        println!("│");
    }

    if !plan.vars.is_empty() {
        println!("│ {}", "Variables".bold());
        plan.vars.iter().for_each(display_change);
        println!("│");
    }

    println!(
        "└─ Summary: {} change(s)",
        plan.len().to_string().bold()
    );
}
