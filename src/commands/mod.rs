pub mod adapter;
pub mod builtins;
pub mod system;

use crate::runner::CancelToken;
use crate::shell::io::Sink;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use adapter::{AsyncFnCommand, FnCommand, GeneratorFn};

/// Everything a virtual command gets to see.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub name: String,
    /// Arguments after the command name, already expanded.
    pub args: Vec<String>,
    /// Whole stdin, buffered before the handler runs.
    pub stdin: String,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub cancel: CancelToken,
    /// Exit code of the previous command, what `$?` would expand to.
    pub status: i32,
}

impl CommandContext {
    pub fn new<I, S>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: String::new(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
            env: std::env::vars().collect(),
            cancel: CancelToken::new(),
            status: 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.join(p)
        }
    }
}

/// What a call-style handler hands back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub code: i32,
    /// New working directory for the rest of the invocation (`cd`).
    pub chdir: Option<PathBuf>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    pub fn code(code: i32) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }

    pub fn error(stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stderr: stderr.into(),
            code: 1,
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }
}

/// A command that runs to completion and returns its whole output.
#[async_trait]
pub trait Executable: Send + Sync {
    async fn execute(&self, ctx: CommandContext) -> Result<CommandOutput>;

    /// How many stdin lines the command reads before it stops looking, when
    /// that is known up front from `args`. Lets `yes | head` finish.
    fn stdin_lines(&self, _args: &[String]) -> Option<usize> {
        None
    }
}

/// A command that streams output through a [`Yielder`] and returns its code.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, ctx: CommandContext, out: Yielder) -> Result<i32>;
}

/// The consumer went away or the command was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("output closed")]
pub struct Closed;

/// Output handle for generator commands.
#[derive(Debug, Clone)]
pub struct Yielder {
    stdout: Sink,
    stderr: Sink,
    cancel: CancelToken,
}

impl Yielder {
    pub fn new(stdout: Sink, stderr: Sink, cancel: CancelToken) -> Self {
        Self {
            stdout,
            stderr,
            cancel,
        }
    }

    /// Emits a stdout chunk. Fails once cancelled or when nobody reads anymore;
    /// generators should stop at the first error.
    pub async fn send(&self, data: impl Into<Vec<u8>>) -> std::result::Result<(), Closed> {
        self.emit(&self.stdout, data.into()).await
    }

    pub async fn send_stderr(&self, data: impl Into<Vec<u8>>) -> std::result::Result<(), Closed> {
        self.emit(&self.stderr, data.into()).await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn emit(&self, sink: &Sink, data: Vec<u8>) -> std::result::Result<(), Closed> {
        if self.cancel.is_cancelled() {
            return Err(Closed);
        }
        tokio::select! {
            ok = sink.write(data) => {
                if ok { Ok(()) } else { Err(Closed) }
            }
            _ = self.cancel.cancelled() => Err(Closed),
        }
    }
}

#[derive(Clone)]
pub enum Handler {
    Call(Arc<dyn Executable>),
    Generate(Arc<dyn Generator>),
}

impl Handler {
    pub fn call(command: impl Executable + 'static) -> Self {
        Handler::Call(Arc::new(command))
    }

    pub fn generator(command: impl Generator + 'static) -> Self {
        Handler::Generate(Arc::new(command))
    }

    /// Wraps a synchronous closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(CommandContext) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Handler::call(FnCommand(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CommandOutput>> + Send + 'static,
    {
        Handler::call(AsyncFnCommand(f))
    }

    pub fn from_generator<F, Fut>(f: F) -> Self
    where
        F: Fn(CommandContext, Yielder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<i32>> + Send + 'static,
    {
        Handler::generator(GeneratorFn(f))
    }

    pub fn is_generator(&self) -> bool {
        matches!(self, Handler::Generate(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Call(_) => f.write_str("Handler::Call"),
            Handler::Generate(_) => f.write_str("Handler::Generate"),
        }
    }
}

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Proof of ownership of a registered name. Only the holder of the current
/// registration can remove it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping the registration makes the command permanent"]
pub struct Registration {
    name: String,
    token: u64,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }
}

struct Entry {
    handler: Handler,
    token: u64,
}

/// Name → handler table for virtual commands.
#[derive(Default)]
pub struct CommandRegistry {
    entries: HashMap<String, Entry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register_all(&mut registry);
        registry
    }

    /// Adds or replaces `name`. A replaced entry's registration stops working.
    pub fn register(&mut self, name: &str, handler: Handler) -> Registration {
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        if self
            .entries
            .insert(name.to_string(), Entry { handler, token })
            .is_some()
        {
            log::debug!("virtual command '{}' replaced", name);
        }
        Registration {
            name: name.to_string(),
            token,
        }
    }

    pub fn unregister(&mut self, registration: Registration) -> bool {
        match self.entries.get(&registration.name) {
            Some(entry) if entry.token == registration.token => {
                self.entries.remove(&registration.name);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.entries.get(name).map(|e| e.handler.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn list_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.list_commands())
            .finish()
    }
}
