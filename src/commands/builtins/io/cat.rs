// Cat command

use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::Result;
use async_trait::async_trait;

pub struct CatCommand;

#[async_trait]
impl Executable for CatCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        if ctx.args.is_empty() {
            return Ok(CommandOutput::success(ctx.stdin));
        }

        let mut output = CommandOutput::default();
        for filename in &ctx.args {
            if filename == "-" {
                output.stdout.extend_from_slice(ctx.stdin.as_bytes());
                continue;
            }
            match tokio::fs::read(ctx.resolve_path(filename)).await {
                Ok(bytes) => output.stdout.extend_from_slice(&bytes),
                Err(e) => {
                    output
                        .stderr
                        .extend_from_slice(format!("cat: {}: {}\n", filename, e).as_bytes());
                    output.code = 1;
                }
            }
        }
        Ok(output)
    }
}
