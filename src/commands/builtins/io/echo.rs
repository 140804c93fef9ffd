// Echo command: -n drops the newline, -e interprets backslash escapes, -E
// turns them off again.

use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::Result;
use async_trait::async_trait;

pub struct EchoCommand;

#[async_trait]
impl Executable for EchoCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let mut newline = true;
        let mut escapes = false;
        let mut start = 0;

        for arg in &ctx.args {
            let is_flag = arg.len() > 1
                && arg.starts_with('-')
                && arg[1..].chars().all(|c| matches!(c, 'n' | 'e' | 'E'));
            if !is_flag {
                break;
            }
            for c in arg[1..].chars() {
                match c {
                    'n' => newline = false,
                    'e' => escapes = true,
                    _ => escapes = false,
                }
            }
            start += 1;
        }

        let mut output = ctx.args[start..].join(" ");
        if escapes {
            let (text, stop) = interpret_escapes(&output);
            output = text;
            if stop {
                return Ok(CommandOutput::success(output));
            }
        }
        if newline {
            output.push('\n');
        }
        Ok(CommandOutput::success(output))
    }
}

/// Expands `\n`, `\t` and friends. The flag is set when `\c` asked to stop
/// all further output.
fn interpret_escapes(text: &str) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('e') => out.push('\x1b'),
            Some('\\') => out.push('\\'),
            Some('c') => return (out, true),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    (out, false)
}
