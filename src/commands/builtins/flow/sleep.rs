// Sleep command. Wakes early when the invocation is cancelled.

use crate::commands::{CommandContext, CommandOutput, Executable};
use crate::runner::Signal;
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::time::Duration;

pub struct SleepCommand;

/// `1.5`, `2s`, `3m`, `1h`, `0.1d`.
pub fn parse_duration(arg: &str) -> Option<Duration> {
    let (number, scale) = match arg.chars().last()? {
        's' => (&arg[..arg.len() - 1], 1.0),
        'm' => (&arg[..arg.len() - 1], 60.0),
        'h' => (&arg[..arg.len() - 1], 3600.0),
        'd' => (&arg[..arg.len() - 1], 86400.0),
        _ => (arg, 1.0),
    };
    let secs = number.parse::<f64>().ok()? * scale;
    Duration::try_from_secs_f64(secs).ok()
}

#[async_trait]
impl Executable for SleepCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        if ctx.args.is_empty() {
            bail!("missing operand");
        }
        let mut total = Duration::ZERO;
        for arg in &ctx.args {
            match parse_duration(arg) {
                Some(d) => total += d,
                None => bail!("invalid time interval '{}'", arg),
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(total) => Ok(CommandOutput::code(0)),
            _ = ctx.cancel.cancelled() => Ok(CommandOutput::code(Signal::Term.exit_code())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_duration("0.5s"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("1m"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("-1"), None);
        assert_eq!(parse_duration("abc"), None);
    }
}
