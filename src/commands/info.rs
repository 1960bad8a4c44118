use anyhow::{Context as _, Result};
use beanstalk::{EnvironmentInfo, VarValue};
use colored::Colorize;

use crate::Context;
use crate::cli::InfoArgs;
use crate::ui;

pub async fn run(ctx: &Context, args: InfoArgs) -> Result<()> {
    let (target, mut env) = super::open(ctx, &args.target)?;
    super::load(ctx, &mut env, &target).await?;

    let info = env.info();
    if args.json {
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize environment")?;
        println!("{json}");
    } else {
        show(&info);
    }

    Ok(())
}

/// Print an environment as a key-value table
pub fn show(info: &EnvironmentInfo) {
    ui::header(&format!("{}/{}", info.application, info.name));

    ui::kv("ID", &ui::or_dash(info.id.as_deref()));
    ui::kv(
        "Status",
        &info
            .status
            .as_deref()
            .map_or_else(|| "-".to_string(), |s| ui::status(s).to_string()),
    );
    ui::kv(
        "Health",
        &info
            .health
            .as_deref()
            .map_or_else(|| "-".to_string(), |h| ui::health(h).to_string()),
    );
    ui::kv("URL", &ui::or_dash(info.url.as_deref()));
    ui::kv("Version", &ui::or_dash(info.version.as_deref()));
    ui::kv("Platform", &ui::or_dash(info.platform.as_deref()));
    ui::kv("Description", &ui::or_dash(info.description.as_deref()));
    if let Some(template) = &info.template {
        ui::kv("Template", template);
    }

    ui::section(&format!("Variables ({})", info.vars.len()));
    if info.vars.is_empty() {
        ui::dim("No variables set");
    }
    for (key, value) in &info.vars {
        println!("  {}", format_var(key, value));
    }
    println!();
}

/// Format one variable for display
pub fn format_var(key: &str, value: &VarValue) -> String {
    match value {
        VarValue::Set(value) => format!("{}={}", key.bold(), value),
        VarValue::Remove => format!("{} {}", key.bold(), "(removal pending)".dimmed()),
    }
}
