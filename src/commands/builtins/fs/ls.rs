// Ls command

use crate::commands::builtins::common::split_flags;
use crate::commands::{CommandContext, CommandOutput, Executable};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::Path;

pub struct LsCommand;

#[async_trait]
impl Executable for LsCommand {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput> {
        let (flags, mut paths) = split_flags(&ctx.args, "al1")?;
        let all = flags.contains(&'a');
        let long = flags.contains(&'l');
        if paths.is_empty() {
            paths.push(".");
        }

        let mut output = CommandOutput::default();
        let mut out = String::new();
        for (i, path_str) in paths.iter().enumerate() {
            let path = ctx.resolve_path(path_str);
            if !path.exists() {
                output.stderr.extend_from_slice(
                    format!("ls: cannot access '{}': No such file or directory\n", path_str)
                        .as_bytes(),
                );
                output.code = 2;
                continue;
            }
            if !path.is_dir() {
                out.push_str(&entry_line(&path, path_str, long));
                continue;
            }

            if paths.len() > 1 {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&format!("{}:\n", path_str));
            }
            let mut names: Vec<String> = fs::read_dir(&path)
                .with_context(|| format!("cannot open directory '{}'", path_str))?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .filter(|name| all || !name.starts_with('.'))
                .collect();
            names.sort();
            for name in names {
                out.push_str(&entry_line(&path.join(&name), &name, long));
            }
        }

        output.stdout.extend_from_slice(out.as_bytes());
        Ok(output)
    }
}

fn entry_line(path: &Path, name: &str, long: bool) -> String {
    if !long {
        return format!("{}\n", name);
    }
    match fs::symlink_metadata(path) {
        Ok(meta) => {
            let kind = if meta.is_dir() {
                'd'
            } else if meta.file_type().is_symlink() {
                'l'
            } else {
                '-'
            };
            format!("{} {:>10} {}\n", kind, meta.len(), name)
        }
        Err(_) => format!("? {:>10} {}\n", "?", name),
    }
}
