use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::Result;
use async_trait::async_trait;

pub struct TrueCommand;
pub struct FalseCommand;

#[async_trait]
impl Executable for TrueCommand {
    async fn execute(&self, _ctx: CommandContext) -> Result<CommandOutput> {
        Ok(CommandOutput::code(0))
    }
}

#[async_trait]
impl Executable for FalseCommand {
    async fn execute(&self, _ctx: CommandContext) -> Result<CommandOutput> {
        Ok(CommandOutput::code(1))
    }
}
