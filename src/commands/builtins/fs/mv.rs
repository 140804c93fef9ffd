// Mv command

use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use std::fs;

pub struct MvCommand;

#[async_trait]
impl Executable for MvCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let Some((dest, sources)) = ctx.args.split_last() else {
            bail!("missing file operand");
        };
        if sources.is_empty() {
            bail!("missing destination file operand after '{}'", dest);
        }

        let dest_path = ctx.resolve_path(dest);
        let dest_is_dir = dest_path.is_dir();
        if sources.len() > 1 && !dest_is_dir {
            bail!("target '{}' is not a directory", dest);
        }

        for src in sources {
            let src_path = ctx.resolve_path(src);
            if !src_path.exists() {
                bail!("cannot stat '{}': No such file or directory", src);
            }

            let target = if dest_is_dir {
                dest_path.join(
                    src_path
                        .file_name()
                        .ok_or_else(|| anyhow!("invalid source name '{}'", src))?,
                )
            } else {
                dest_path.clone()
            };

            fs::rename(&src_path, &target)
                .with_context(|| format!("cannot move '{}' to '{}'", src, target.display()))?;
        }

        Ok(CommandOutput::default())
    }
}
