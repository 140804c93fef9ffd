use crate::commands::system::ChildSet;
use crate::commands::{CommandRegistry, Handler};
use crate::config::ShellSettings;
use crate::logger::Tracer;
use crate::runner::CancelToken;
use crate::utils::ShellProgram;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// Execution state for one invocation. Subshells and pipeline stages work on
/// clones, so `cd` or `$?` changes inside them stay local.
#[derive(Debug, Clone)]
pub struct ShellContext {
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub exit_code: i32,
    pub settings: ShellSettings,
    pub registry: Arc<RwLock<CommandRegistry>>,
    pub virtual_commands: bool,
    pub program: ShellProgram,
    pub cancel: CancelToken,
    pub children: ChildSet,
    pub tracer: Tracer,
}

impl ShellContext {
    pub fn new(registry: Arc<RwLock<CommandRegistry>>, program: ShellProgram) -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: std::env::vars().collect(),
            exit_code: 0,
            settings: ShellSettings::default(),
            registry,
            virtual_commands: true,
            program,
            cancel: CancelToken::new(),
            children: ChildSet::default(),
            tracer: Tracer::from_env(),
        }
    }

    /// Virtual handler for `name`, unless virtual commands are switched off.
    pub fn lookup(&self, name: &str) -> Option<Handler> {
        if !self.virtual_commands {
            return None;
        }
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
    }

    /// Value of `$name`; `$?` is the last exit code.
    pub fn var(&self, name: &str) -> Option<String> {
        if name == "?" {
            return Some(self.exit_code.to_string());
        }
        self.env.get(name).cloned()
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::new(
            Arc::new(RwLock::new(CommandRegistry::with_builtins())),
            crate::utils::detect_shell(None),
        )
    }
}
