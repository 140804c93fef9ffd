// Exit command. Ends the current command with the given code, or the previous
// command's code when none is given; the rest of a sequence still runs the way
// `||` and `;` dictate.

use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::Result;
use async_trait::async_trait;

pub struct ExitCommand;

#[async_trait]
impl Executable for ExitCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let code = match ctx.args.first() {
            None => ctx.status,
            Some(arg) => match arg.parse::<i64>() {
                Ok(n) => n.rem_euclid(256) as i32,
                Err(_) => {
                    return Ok(CommandOutput::error(format!(
                        "exit: {}: numeric argument required\n",
                        arg
                    ))
                    .with_code(2));
                }
            },
        };
        Ok(CommandOutput::code(code))
    }
}
