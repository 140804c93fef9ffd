// Rm command

use crate::commands::builtins::common::split_flags;
use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::fs;

pub struct RmCommand;

#[async_trait]
impl Executable for RmCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let (flags, paths) = split_flags(&ctx.args, "rRf")?;
        let recursive = flags.iter().any(|f| matches!(f, 'r' | 'R'));
        let force = flags.contains(&'f');

        if paths.is_empty() && !force {
            bail!("missing operand");
        }

        for path_str in paths {
            let p = ctx.resolve_path(path_str);
            if fs::symlink_metadata(&p).is_err() {
                if !force {
                    bail!("cannot remove '{}': No such file or directory", path_str);
                }
                continue;
            }

            if p.is_dir() && !p.is_symlink() {
                if !recursive {
                    bail!("cannot remove '{}': Is a directory", path_str);
                }
                fs::remove_dir_all(&p)
                    .with_context(|| format!("cannot remove '{}'", path_str))?;
            } else {
                fs::remove_file(&p).with_context(|| format!("cannot remove '{}'", path_str))?;
            }
        }
        Ok(CommandOutput::default())
    }
}
