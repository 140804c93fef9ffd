// Yes command: streams its line until cancelled or nobody reads anymore.

use crate::commands::{CommandContext, Generator, Yielder};
use anyhow::Result;
use async_trait::async_trait;

pub struct YesCommand;

#[async_trait]
impl Generator for YesCommand {
    async fn generate(&self, ctx: CommandContext, out: Yielder) -> Result<i32> {
        let line = if ctx.args.is_empty() {
            "y\n".to_string()
        } else {
            format!("{}\n", ctx.args.join(" "))
        };

        while out.send(line.as_bytes()).await.is_ok() {
            tokio::task::yield_now().await;
        }
        Ok(0)
    }
}
