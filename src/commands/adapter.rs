// Closure adapters for Handler::from_fn / from_async / from_generator
use crate::commands::{CommandContext, CommandOutput, Executable, Generator, Yielder};
use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;

pub struct FnCommand<F>(pub F);

#[async_trait]
impl<F> Executable for FnCommand<F>
where
    F: Fn(CommandContext) -> Result<CommandOutput> + Send + Sync,
{
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        (self.0)(ctx)
    }
}

pub struct AsyncFnCommand<F>(pub F);

#[async_trait]
impl<F, Fut> Executable for AsyncFnCommand<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CommandOutput>> + Send,
{
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        (self.0)(ctx).await
    }
}

pub struct GeneratorFn<F>(pub F);

#[async_trait]
impl<F, Fut> Generator for GeneratorFn<F>
where
    F: Fn(CommandContext, Yielder) -> Fut + Send + Sync,
    Fut: Future<Output = Result<i32>> + Send,
{
    async fn generate(&self, ctx: CommandContext, out: Yielder) -> Result<i32> {
        (self.0)(ctx, out).await
    }
}
