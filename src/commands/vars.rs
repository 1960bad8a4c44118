use anyhow::Result;

use crate::Context;
use crate::cli::TargetArgs;
use crate::ui;

use super::info::format_var;

pub async fn run(ctx: &Context, args: TargetArgs) -> Result<()> {
    let (target, mut env) = super::open(ctx, &args)?;
    super::load(ctx, &mut env, &target).await?;

    let info = env.info();
    if info.vars.is_empty() {
        if !ctx.quiet {
            ui::info(&format!("{target} has no configuration variables"));
        }
        return Ok(());
    }

    for (key, value) in &info.vars {
        println!("{}", format_var(key, value));
    }

    Ok(())
}
