pub mod ast;
pub mod context;
pub mod executor;
pub mod io;
pub mod parser;

#[cfg(test)]
mod tests;

pub use parser::{ParseError, parse_command_line, tokenize};

use crate::commands::{CommandRegistry, Handler, Registration};
use crate::config::{Config, ShellSettings};
use crate::logger::Tracer;
use crate::quote::CommandSpec;
use crate::runner::{ProcessRunner, RunOptions, Supervisor};
use crate::utils::{ShellProgram, detect_shell};
use context::ShellContext;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// True when `text` uses syntax the parser doesn't model (globs, command
/// substitution, here-docs, fd juggling, `~`). Such text goes to the real
/// shell untouched. Quote-aware: nothing inside `'...'` counts, and inside
/// `"..."` only substitutions do.
pub fn needs_real_shell(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut word_start = true;
    let mut skip = false;

    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();

        if skip {
            skip = false;
            continue;
        }
        if escaped {
            escaped = false;
            word_start = false;
            continue;
        }
        if in_single {
            if c == '\'' {
                in_single = false;
            }
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if c == '`' || (c == '$' && matches!(next, Some('(') | Some('{'))) {
            return true;
        }
        if c == '$' && next == Some('?') {
            // `$?` is a variable, not a glob
            skip = true;
            word_start = false;
            continue;
        }
        if in_double {
            if c == '"' {
                in_double = false;
            }
            continue;
        }

        match c {
            '\'' => in_single = true,
            '"' => in_double = true,
            '*' | '?' | '[' => return true,
            '~' if word_start => return true,
            '<' if next == Some('<') => return true,
            '>' | '<' if next == Some('&') => return true,
            '&' if next == Some('>') => return true,
            '0'..='9' if word_start && matches!(next, Some('>') | Some('<')) => return true,
            _ => {}
        }
        word_start = c.is_whitespace() || matches!(c, '|' | '&' | ';' | '(' | ')' | '<' | '>');
    }
    false
}

/// Owns everything runners share: the command registry, the supervisor,
/// settings, working directory and base environment. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

#[derive(Debug)]
struct ShellInner {
    registry: Arc<RwLock<CommandRegistry>>,
    supervisor: Supervisor,
    settings: RwLock<ShellSettings>,
    cwd: RwLock<PathBuf>,
    env: RwLock<HashMap<String, String>>,
    program: ShellProgram,
    virtual_commands: AtomicBool,
    mirror: bool,
    capture: bool,
}

#[derive(Default)]
pub struct ShellBuilder {
    config: Config,
    supervisor: Option<Supervisor>,
    registry: Option<CommandRegistry>,
    cwd: Option<PathBuf>,
}

impl ShellBuilder {
    pub fn config(mut self, config: &Config) -> Self {
        self.config = config.clone();
        self
    }

    pub fn supervisor(mut self, supervisor: Supervisor) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    /// Replaces the built-in command table.
    pub fn registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn build(self) -> Shell {
        let mut env: HashMap<String, String> = std::env::vars().collect();
        env.extend(self.config.env.clone());
        let cwd = self
            .cwd
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Shell {
            inner: Arc::new(ShellInner {
                registry: Arc::new(RwLock::new(
                    self.registry.unwrap_or_else(CommandRegistry::with_builtins),
                )),
                supervisor: self.supervisor.unwrap_or_default(),
                settings: RwLock::new(self.config.settings),
                cwd: RwLock::new(cwd),
                env: RwLock::new(env),
                program: detect_shell(self.config.run.shell.as_deref()),
                virtual_commands: AtomicBool::new(true),
                mirror: self.config.run.mirror.unwrap_or(true),
                capture: self.config.run.capture.unwrap_or(true),
            }),
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ShellBuilder {
        ShellBuilder::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self::builder().config(config).build()
    }

    pub fn with_supervisor(supervisor: Supervisor) -> Self {
        Self::builder().supervisor(supervisor).build()
    }

    /// A pending runner with this shell's default options. Awaiting it (or
    /// calling `start`) executes the command.
    pub fn run(&self, spec: impl Into<CommandSpec>) -> ProcessRunner {
        self.run_with(spec, self.default_options())
    }

    pub fn run_with(&self, spec: impl Into<CommandSpec>, options: RunOptions) -> ProcessRunner {
        ProcessRunner::new(self.clone(), spec.into(), options)
    }

    /// Options-first form: `shell.options(opts).run(cmd!(...))`.
    pub fn options(&self, options: RunOptions) -> Invocation {
        Invocation {
            shell: self.clone(),
            options,
        }
    }

    /// `RunOptions::default()` with the configured mirror/capture defaults.
    pub fn default_options(&self) -> RunOptions {
        RunOptions {
            mirror: self.inner.mirror,
            capture: self.inner.capture,
            ..RunOptions::default()
        }
    }

    pub fn register(&self, name: &str, handler: Handler) -> Registration {
        self.write_registry().register(name, handler)
    }

    pub fn unregister(&self, registration: Registration) -> bool {
        self.write_registry().unregister(registration)
    }

    pub fn list_commands(&self) -> Vec<String> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list_commands()
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    fn write_registry(&self) -> std::sync::RwLockWriteGuard<'_, CommandRegistry> {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Switches virtual commands on or off; when off every name goes to PATH.
    pub fn set_virtual_commands(&self, enabled: bool) {
        self.inner.virtual_commands.store(enabled, Ordering::SeqCst);
    }

    pub fn virtual_commands(&self) -> bool {
        self.inner.virtual_commands.load(Ordering::SeqCst)
    }

    /// `set -e` / `set +e` and friends by short or long name.
    pub fn set(&self, name: &str, value: bool) -> bool {
        let known = self
            .inner
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(name, value);
        if !known {
            Tracer::from_env().trace("settings", || format!("unknown option '{}' ignored", name));
        }
        known
    }

    pub fn settings(&self) -> ShellSettings {
        *self
            .inner
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cwd(&self) -> PathBuf {
        self.inner
            .cwd
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_cwd(&self, cwd: impl AsRef<Path>) {
        let cwd = self.resolve(cwd.as_ref());
        log::debug!("shell cwd -> {}", cwd.display());
        *self
            .inner
            .cwd
            .write()
            .unwrap_or_else(PoisonError::into_inner) = cwd;
    }

    /// Resolves `path` against the shell's working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd().join(path)
        }
    }

    pub fn set_env(&self, key: &str, value: &str) {
        self.inner
            .env
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    pub fn env(&self) -> HashMap<String, String> {
        self.inner
            .env
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.inner.supervisor
    }

    pub fn program(&self) -> &ShellProgram {
        &self.inner.program
    }

    /// Fresh execution context snapshotting the shell's current state.
    pub(crate) fn context(&self) -> ShellContext {
        let mut ctx = ShellContext::new(self.inner.registry.clone(), self.inner.program.clone());
        ctx.cwd = self.cwd();
        ctx.env = self.env();
        ctx.settings = self.settings();
        ctx.virtual_commands = self.virtual_commands();
        ctx
    }
}

/// Options bound ahead of the command text.
pub struct Invocation {
    shell: Shell,
    options: RunOptions,
}

impl Invocation {
    pub fn run(self, spec: impl Into<CommandSpec>) -> ProcessRunner {
        self.shell.run_with(spec, self.options)
    }
}
