use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cmdflow", version, about = "cmdflow: shell command lines with virtual builtins")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read command lines from stdin and run them one by one
    Repl,

    /// Run a command and restart it whenever a watched file changes
    Dev {
        /// Command line to run
        command: String,

        /// File to watch (repeatable)
        #[arg(short = 'w', long = "watch")]
        watch: Vec<PathBuf>,

        /// Polling interval in milliseconds
        #[arg(short = 'i', long = "interval", default_value_t = 500)]
        interval: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dev_arguments() {
        let cli = Cli::try_parse_from([
            "cmdflow", "dev", "cargo run", "--watch", "src/main.rs", "-w", "Cargo.toml",
        ])
        .unwrap();
        match cli.command {
            Commands::Dev {
                command,
                watch,
                interval,
            } => {
                assert_eq!(command, "cargo run");
                assert_eq!(watch, vec![PathBuf::from("src/main.rs"), PathBuf::from("Cargo.toml")]);
                assert_eq!(interval, 500);
            }
            _ => panic!("expected dev"),
        }
    }

    #[test]
    fn test_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["cmdflow", "serve"]).is_err());
        assert!(Cli::try_parse_from(["cmdflow"]).is_err());
    }
}
