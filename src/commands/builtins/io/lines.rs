// head / tail over a file or stdin

use crate::commands::builtins::common::line_count;
use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;

const DEFAULT_LINES: usize = 10;

pub struct HeadCommand;
pub struct TailCommand;

async fn input(ctx: &CommandContext, operands: &[&str]) -> Result<String> {
    match operands {
        [] | ["-"] => Ok(ctx.stdin.clone()),
        [file] => {
            let bytes = tokio::fs::read(ctx.resolve_path(file))
                .await
                .with_context(|| format!("cannot open '{}' for reading", file))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => bail!("only one file is supported"),
    }
}

pub fn head(text: &str, n: usize) -> String {
    text.split_inclusive('\n').take(n).collect()
}

pub fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    lines[lines.len().saturating_sub(n)..].concat()
}

#[async_trait]
impl Executable for HeadCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let (n, operands) = line_count(&ctx.args, DEFAULT_LINES)?;
        let text = input(&ctx, &operands).await?;
        Ok(CommandOutput::success(head(&text, n)))
    }

    fn stdin_lines(&self, args: &[String]) -> Option<usize> {
        let (n, operands) = line_count(args, DEFAULT_LINES).ok()?;
        matches!(operands.as_slice(), [] | ["-"]).then_some(n)
    }
}

#[async_trait]
impl Executable for TailCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let (n, operands) = line_count(&ctx.args, DEFAULT_LINES)?;
        let text = input(&ctx, &operands).await?;
        Ok(CommandOutput::success(tail(&text, n)))
    }
}
