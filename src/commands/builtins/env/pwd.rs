use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::Result;
use async_trait::async_trait;

pub struct PwdCommand;

#[async_trait]
impl Executable for PwdCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        Ok(CommandOutput::success(format!("{}\n", ctx.cwd.display())))
    }
}
