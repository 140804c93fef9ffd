use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::time::SystemTime;

pub struct TouchCommand;

#[async_trait]
impl Executable for TouchCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        if ctx.args.is_empty() {
            bail!("missing file operand");
        }

        for path_str in &ctx.args {
            let p = ctx.resolve_path(path_str);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&p)
                .with_context(|| format!("cannot touch '{}'", path_str))?;
            file.set_modified(SystemTime::now())
                .with_context(|| format!("setting times of '{}'", path_str))?;
        }
        Ok(CommandOutput::default())
    }
}
