// Cd command

use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Result, bail};
use async_trait::async_trait;

pub struct CdCommand;

#[async_trait]
impl Executable for CdCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        if ctx.args.len() > 1 {
            bail!("too many arguments");
        }
        let target = match ctx.args.first() {
            Some(dir) => dir.clone(),
            None => match ctx.env.get("HOME") {
                Some(home) => home.clone(),
                None => bail!("HOME not set"),
            },
        };

        let path = ctx.resolve_path(&target);
        if !path.is_dir() {
            bail!("{}: No such file or directory", target);
        }
        let dir = path.canonicalize().unwrap_or(path);

        Ok(CommandOutput {
            chdir: Some(dir),
            ..Default::default()
        })
    }
}
