// Cp command

use crate::commands::builtins::common::{copy_dir_recursive, split_flags};
use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use std::fs;

pub struct CpCommand;

#[async_trait]
impl Executable for CpCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let (flags, mut paths) = split_flags(&ctx.args, "rR")?;
        let recursive = !flags.is_empty();

        let Some(dest_str) = paths.pop() else {
            bail!("missing file operand");
        };
        if paths.is_empty() {
            bail!("missing destination file operand after '{}'", dest_str);
        }

        let dest_path = ctx.resolve_path(dest_str);
        let dest_is_dir = dest_path.is_dir();
        if paths.len() > 1 && !dest_is_dir {
            bail!("target '{}' is not a directory", dest_str);
        }

        for src_str in paths {
            let src_path = ctx.resolve_path(src_str);
            if !src_path.exists() {
                bail!("cannot stat '{}': No such file or directory", src_str);
            }

            let target = if dest_is_dir {
                dest_path.join(
                    src_path
                        .file_name()
                        .ok_or_else(|| anyhow!("invalid source name '{}'", src_str))?,
                )
            } else {
                dest_path.clone()
            };

            if src_path.is_dir() {
                if !recursive {
                    bail!("-r not specified; omitting directory '{}'", src_str);
                }
                copy_dir_recursive(&src_path, &target)?;
            } else {
                fs::copy(&src_path, &target).with_context(|| {
                    format!("cannot copy '{}' to '{}'", src_str, target.display())
                })?;
            }
        }

        Ok(CommandOutput::default())
    }
}
