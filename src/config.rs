use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "cmdflow.toml";
pub const ENV_SELECTOR: &str = "CMDFLOW_ENV";

/// `set -e`, `set -x` and friends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    pub errexit: bool,
    pub verbose: bool,
    pub xtrace: bool,
    pub nounset: bool,
    pub pipefail: bool,
}

impl ShellSettings {
    /// Accepts the short flag or the long option name. Returns false for
    /// names it doesn't know.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        let slot = match name.trim_start_matches('-') {
            "e" | "errexit" => &mut self.errexit,
            "v" | "verbose" => &mut self.verbose,
            "x" | "xtrace" => &mut self.xtrace,
            "u" | "nounset" => &mut self.nounset,
            "pipefail" | "o pipefail" => &mut self.pipefail,
            _ => return false,
        };
        *slot = value;
        true
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mirror: Option<bool>,
    pub capture: Option<bool>,
    pub shell: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub settings: ShellSettings,
    pub run: RunConfig,
    pub env: HashMap<String, String>,
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse cmdflow.toml")
    }
}

/// Reads `cmdflow.toml` from `dir` (missing file means defaults), then layers
/// `.env` or `.env.<CMDFLOW_ENV>` on top of its `[env]` table.
pub fn load_config(dir: &Path) -> Result<Config> {
    let config_path = dir.join(CONFIG_FILE);
    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Config::parse(&content)?
    } else {
        log::debug!("no {} in {}", CONFIG_FILE, dir.display());
        Config::default()
    };

    let env_filename = env::var(ENV_SELECTOR)
        .map(|v| format!(".env.{}", v))
        .unwrap_or_else(|_| ".env".to_string());
    let env_path = dir.join(&env_filename);

    if env_path.exists() {
        log::info!("loading environment from {}", env_filename);
        // Collected into the config rather than set on the process.
        for item in dotenvy::from_path_iter(&env_path)
            .with_context(|| format!("Failed to read {}", env_filename))?
        {
            let (key, val) = item.with_context(|| format!("Invalid line in {}", env_filename))?;
            config.env.insert(key, val);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_accept_short_and_long_names() {
        let mut settings = ShellSettings::default();
        assert!(settings.set("e", true));
        assert!(settings.set("xtrace", true));
        assert!(settings.set("o pipefail", true));
        assert!(settings.set("-u", true));
        assert!(!settings.set("monitor", true));
        assert_eq!(
            settings,
            ShellSettings {
                errexit: true,
                verbose: false,
                xtrace: true,
                nounset: true,
                pipefail: true,
            }
        );
        settings.set("errexit", false);
        assert!(!settings.errexit);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = Config::parse(
            r#"
            [settings]
            errexit = true

            [run]
            mirror = false
            shell = "/bin/bash"

            [env]
            GREETING = "hi"
            "#,
        )
        .unwrap();
        assert!(config.settings.errexit);
        assert!(!config.settings.pipefail);
        assert_eq!(config.run.mirror, Some(false));
        assert_eq!(config.run.capture, None);
        assert_eq!(config.run.shell.as_deref(), Some("/bin/bash"));
        assert_eq!(config.env["GREETING"], "hi");
    }

    #[test]
    fn test_load_config_layers_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[env]\nA = \"toml\"\nB = \"toml\"\n").unwrap();
        fs::write(dir.path().join(".env"), "B=dotenv\nC=dotenv\n").unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.env["A"], "toml");
        assert_eq!(config.env["B"], "dotenv");
        assert_eq!(config.env["C"], "dotenv");
    }

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert!(config.env.is_empty());
        assert_eq!(config.settings, ShellSettings::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::parse("[settings\nerrexit = ").is_err());
    }
}
