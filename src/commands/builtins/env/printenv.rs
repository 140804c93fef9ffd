// Env command: prints the environment the invocation sees, sorted.

use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Result, bail};
use async_trait::async_trait;

pub struct EnvCommand;

#[async_trait]
impl Executable for EnvCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        if !ctx.args.is_empty() {
            bail!("running a command through env is not supported");
        }
        let mut vars: Vec<_> = ctx.env.iter().collect();
        vars.sort();

        let mut output = String::new();
        for (key, value) in vars {
            output.push_str(&format!("{}={}\n", key, value));
        }
        Ok(CommandOutput::success(output))
    }
}
