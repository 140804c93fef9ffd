// Mkdir command

use crate::commands::builtins::common::split_flags;
use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::fs;

pub struct MkdirCommand;

#[async_trait]
impl Executable for MkdirCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let (flags, paths) = split_flags(&ctx.args, "p")?;
        let parents = flags.contains(&'p');
        if paths.is_empty() {
            bail!("missing operand");
        }

        for path_str in paths {
            let p = ctx.resolve_path(path_str);
            if parents {
                fs::create_dir_all(&p)
                    .with_context(|| format!("cannot create directory '{}'", path_str))?;
            } else {
                fs::create_dir(&p)
                    .with_context(|| format!("cannot create directory '{}'", path_str))?;
            }
        }
        Ok(CommandOutput::default())
    }
}
