use anyhow::{Context, Result};
use cmdflow::{RunOptions, Shell, StdinOption, load_config};
use colored::*;
use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn handle_repl() -> Result<u8> {
    let current_dir = env::current_dir()?;
    let config = load_config(&current_dir)?;
    let shell = Shell::builder().config(&config).cwd(&current_dir).build();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(flags) = set_flags(line) {
            for (name, value) in flags {
                if !shell.set(&name, value) {
                    eprintln!("{} Unknown option: {}", "⚠️".yellow(), name);
                }
            }
            continue;
        }

        // Commands must not compete with us for the remaining input lines.
        let options = RunOptions::default()
            .mirror(true)
            .reject(false)
            .stdin(StdinOption::Ignore);
        let result = shell.run_with(line, options).await?;
        last = result.code;
        if result.code != 0 {
            eprintln!("{}", format!("[exit {}]", result.code).red());
        }
    }

    Ok((last & 0xff) as u8)
}

/// `set -e`, `set +x`, `set -o pipefail`. Anything else runs as a command.
fn set_flags(line: &str) -> Option<Vec<(String, bool)>> {
    let rest = line.strip_prefix("set ")?;
    let mut words = rest.split_whitespace().peekable();
    let mut flags = Vec::new();

    while let Some(word) = words.next() {
        let (enable, body) = match word.split_at_checked(1)? {
            ("-", body) => (true, body),
            ("+", body) => (false, body),
            _ => return None,
        };
        if body == "o" {
            flags.push((words.next()?.to_string(), enable));
        } else {
            flags.extend(body.chars().map(|c| (c.to_string(), enable)));
        }
    }

    (!flags.is_empty()).then_some(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_flags() {
        assert_eq!(set_flags("set -e"), Some(vec![("e".to_string(), true)]));
        assert_eq!(
            set_flags("set +ex"),
            Some(vec![("e".to_string(), false), ("x".to_string(), false)])
        );
        assert_eq!(
            set_flags("set -o pipefail"),
            Some(vec![("pipefail".to_string(), true)])
        );
        assert_eq!(set_flags("set -o"), None);
        assert_eq!(set_flags("settle -e"), None);
        assert_eq!(set_flags("set value"), None);
    }
}
