// Seq command: `seq last`, `seq first last`, `seq first incr last`.

use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Result, bail};
use async_trait::async_trait;

pub struct SeqCommand;

#[async_trait]
impl Executable for SeqCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let (first, incr, last) = match ctx.args.as_slice() {
            [last] => ("1", "1", last.as_str()),
            [first, last] => (first.as_str(), "1", last.as_str()),
            [first, incr, last] => (first.as_str(), incr.as_str(), last.as_str()),
            [] => bail!("missing operand"),
            _ => bail!("extra operand '{}'", ctx.args[3]),
        };

        let out = match (first.parse::<i64>(), incr.parse::<i64>(), last.parse::<i64>()) {
            (Ok(first), Ok(incr), Ok(last)) => integers(first, incr, last)?,
            _ => decimals(number(first)?, number(incr)?, number(last)?)?,
        };
        Ok(CommandOutput::success(out))
    }
}

fn number(arg: &str) -> Result<f64> {
    match arg.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => bail!("invalid floating point argument: '{}'", arg),
    }
}

pub fn integers(first: i64, incr: i64, last: i64) -> Result<String> {
    if incr == 0 {
        bail!("invalid Zero increment value: '0'");
    }
    let mut out = String::new();
    let mut n = first;
    while (incr > 0 && n <= last) || (incr < 0 && n >= last) {
        out.push_str(&format!("{}\n", n));
        match n.checked_add(incr) {
            Some(next) => n = next,
            None => break,
        }
    }
    Ok(out)
}

fn decimals(first: f64, incr: f64, last: f64) -> Result<String> {
    if incr == 0.0 {
        bail!("invalid Zero increment value: '0'");
    }
    let mut out = String::new();
    let mut i = 0u64;
    loop {
        let n = first + incr * i as f64;
        if (incr > 0.0 && n > last + f64::EPSILON) || (incr < 0.0 && n < last - f64::EPSILON) {
            break;
        }
        out.push_str(&format!("{}\n", n));
        i += 1;
    }
    Ok(out)
}
