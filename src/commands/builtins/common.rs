use anyhow::{Result, bail};
use std::fs;
use std::path::Path;

pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)?;
    }

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Splits leading `-xyz` flag clusters from operands. `--` ends flags and a
/// lone `-` is an operand. Unknown letters are an error.
pub fn split_flags<'a>(args: &'a [String], known: &str) -> Result<(Vec<char>, Vec<&'a str>)> {
    let mut flags = Vec::new();
    let mut operands = Vec::new();
    let mut in_flags = true;

    for arg in args {
        if in_flags && arg == "--" {
            in_flags = false;
            continue;
        }
        if in_flags && arg.len() > 1 && arg.starts_with('-') {
            for c in arg[1..].chars() {
                if !known.contains(c) {
                    bail!("invalid option -- '{}'", c);
                }
                flags.push(c);
            }
            continue;
        }
        in_flags = false;
        operands.push(arg.as_str());
    }
    Ok((flags, operands))
}

/// `-n N`, `-nN` or `-N` line counts for head/tail.
pub fn line_count(args: &[String], default: usize) -> Result<(usize, Vec<&str>)> {
    let mut count = default;
    let mut operands = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let value = if arg == "-n" {
            match iter.next() {
                Some(v) => v.as_str(),
                None => bail!("option requires an argument -- 'n'"),
            }
        } else if let Some(v) = arg.strip_prefix("-n") {
            v
        } else if arg.len() > 1 && arg.starts_with('-') && arg[1..].bytes().all(|b| b.is_ascii_digit()) {
            &arg[1..]
        } else {
            operands.push(arg.as_str());
            continue;
        };
        count = match value.parse() {
            Ok(n) => n,
            Err(_) => bail!("invalid number of lines: '{}'", value),
        };
    }
    Ok((count, operands))
}
