use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Result, bail};
use async_trait::async_trait;

pub struct WhichCommand;

#[async_trait]
impl Executable for WhichCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        if ctx.args.is_empty() {
            bail!("usage: which name...");
        }

        let mut output = CommandOutput::default();
        for name in &ctx.args {
            match which::which_in(name, ctx.env.get("PATH"), &ctx.cwd) {
                Ok(path) => output
                    .stdout
                    .extend_from_slice(format!("{}\n", path.display()).as_bytes()),
                Err(_) => {
                    output
                        .stderr
                        .extend_from_slice(format!("which: no {} in PATH\n", name).as_bytes());
                    output.code = 1;
                }
            }
        }
        Ok(output)
    }
}
