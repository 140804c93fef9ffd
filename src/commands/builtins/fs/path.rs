// basename / dirname: pure string operations, the filesystem is never touched.

use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Result, bail};
use async_trait::async_trait;

pub struct BasenameCommand;
pub struct DirnameCommand;

pub fn basename(path: &str, suffix: Option<&str>) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { String::new() } else { "/".to_string() };
    }
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
    match suffix {
        Some(s) if !s.is_empty() && base != s => base.strip_suffix(s).unwrap_or(base).to_string(),
        _ => base.to_string(),
    }
}

pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.starts_with('/') { "/".to_string() } else { ".".to_string() };
    }
    match trimmed.rfind('/') {
        None => ".".to_string(),
        Some(pos) => {
            let parent = trimmed[..pos].trim_end_matches('/');
            if parent.is_empty() {
                "/".to_string()
            } else {
                parent.to_string()
            }
        }
    }
}

#[async_trait]
impl Executable for BasenameCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let (path, suffix) = match ctx.args.as_slice() {
            [path] => (path, None),
            [path, suffix] => (path, Some(suffix.as_str())),
            [] => bail!("missing operand"),
            _ => bail!("extra operand '{}'", ctx.args[2]),
        };
        Ok(CommandOutput::success(format!("{}\n", basename(path, suffix))))
    }
}

#[async_trait]
impl Executable for DirnameCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        if ctx.args.is_empty() {
            bail!("missing operand");
        }
        let out: String = ctx.args.iter().map(|p| format!("{}\n", dirname(p))).collect();
        Ok(CommandOutput::success(out))
    }
}
