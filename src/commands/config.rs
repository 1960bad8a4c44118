use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::{paths, ui};

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(),
        ConfigCommand::Init { force } => init(ctx, force),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let location = paths::locate()?;
    let config = &ctx.config;

    ui::header("Configuration");
    ui::kv(
        "File",
        &if location.file.exists() {
            location.file.display().to_string()
        } else {
            format!("{} (not found, using defaults)", location.file.display())
        },
    );
    ui::kv("Located by", &location.source.to_string());

    ui::section("Gateway");
    let endpoint = config.endpoint(ctx.endpoint.as_deref()).ok();
    ui::kv("Endpoint", &ui::or_dash(endpoint.as_deref()));
    let token = config.token(ctx.token.as_deref()).map(|t| ui::mask(&t));
    ui::kv("Token", &ui::or_dash(token.as_deref()));

    ui::section("Watch");
    let watch = config.watch_options(None);
    ui::kv("Timeout", &format!("{}s", watch.timeout.as_secs()));
    ui::kv("Poll interval", &format!("{}s", watch.poll_interval.as_secs()));

    ui::section(&format!("Targets ({})", config.targets.len()));
    if config.targets.is_empty() {
        ui::dim("No targets configured, pass --app and --env instead");
    }
    for (name, target) in &config.targets {
        ui::kv(name, &target.to_string());
    }
    println!();

    Ok(())
}

fn path() -> Result<()> {
    println!("{}", paths::config_file()?.display());
    Ok(())
}

fn init(ctx: &Context, force: bool) -> Result<()> {
    let written = Config::init(&paths::config_file()?, force)?;
    if !ctx.quiet {
        ui::success(&format!("Wrote {}", written.display()));
        ui::dim("Edit gateway.endpoint and add targets before running other commands");
    }
    Ok(())
}
