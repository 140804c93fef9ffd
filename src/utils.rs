use std::fmt;
use std::path::{Path, PathBuf};

const FALLBACK_SHELLS: [&str; 3] = ["/bin/sh", "/usr/bin/sh", "/bin/bash"];

/// The real shell used for commands the parser hands off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellProgram {
    pub path: PathBuf,
    pub args: Vec<String>,
}

impl ShellProgram {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        // cmd.exe is the odd one out
        let flag = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if stem.eq_ignore_ascii_case("cmd") => "/C",
            _ => "-c",
        };
        Self {
            path,
            args: vec![flag.to_string()],
        }
    }
}

impl fmt::Display for ShellProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Configured shell first, then the usual POSIX locations, then `sh` on PATH.
pub fn detect_shell(config_shell: Option<&str>) -> ShellProgram {
    if let Some(shell) = config_shell.filter(|s| !s.trim().is_empty()) {
        return ShellProgram::new(shell.trim());
    }

    if cfg!(windows) {
        return which::which("sh")
            .map(ShellProgram::new)
            .unwrap_or_else(|_| ShellProgram::new("cmd.exe"));
    }

    FALLBACK_SHELLS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(ShellProgram::new)
        .or_else(|| which::which("sh").ok().map(ShellProgram::new))
        .unwrap_or_else(|| ShellProgram::new("sh"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_shell_wins() {
        let shell = detect_shell(Some("/usr/local/bin/zsh"));
        assert_eq!(shell.path, PathBuf::from("/usr/local/bin/zsh"));
        assert_eq!(shell.args, vec!["-c"]);
    }

    #[test]
    fn test_blank_config_falls_back() {
        let shell = detect_shell(Some("  "));
        assert_ne!(shell.path, PathBuf::from(""));
    }

    #[test]
    fn test_cmd_uses_slash_c() {
        assert_eq!(ShellProgram::new("cmd.exe").args, vec!["/C"]);
        assert_eq!(ShellProgram::new("/bin/bash").args, vec!["-c"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_detects_posix_shell() {
        let shell = detect_shell(None);
        assert!(shell.path.to_string_lossy().ends_with("sh"));
    }
}
