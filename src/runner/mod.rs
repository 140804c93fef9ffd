//! The process runner: one logical command (or pipe of runners), whether it
//! ends up as real child processes or in-process virtual commands.
//!
//! A runner goes `Pending → Running → Finished`, each transition happening
//! once. Finishing is idempotent, so natural completion, a failed spawn and
//! `kill()` can race freely: the first one records the result.

pub mod cancel;
pub mod events;
pub mod pipe;
pub mod stdin;
pub mod supervisor;


pub use cancel::CancelToken;
pub use events::Listeners;
pub use stdin::StdinWriter;
pub use supervisor::{CtrlC, InterruptHandler, InterruptSource, Supervisor};

use crate::config::ShellSettings;
use crate::error::{Error, Result};
use crate::logger::strip_ansi;
use crate::quote::CommandSpec;
use crate::shell::Shell;
use crate::shell::context::ShellContext;
use crate::shell::executor;
use crate::shell::io::{Io, Sink, Source};
use crate::stream::{ChunkKind, ChunkStream, StreamChunk};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::future::IntoFuture;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, watch};

pub(crate) const CHUNK_CAPACITY: usize = 64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    Hup,
    Int,
    Quit,
    Kill,
    #[default]
    Term,
}

impl Signal {
    pub fn number(self) -> i32 {
        match self {
            Signal::Hup => 1,
            Signal::Int => 2,
            Signal::Quit => 3,
            Signal::Kill => 9,
            Signal::Term => 15,
        }
    }

    /// 130 for SIGINT, 137 for SIGKILL, 143 for SIGTERM.
    pub fn exit_code(self) -> i32 {
        128 + self.number()
    }

    #[cfg(unix)]
    fn as_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal as Nix;
        match self {
            Signal::Hup => Nix::SIGHUP,
            Signal::Int => Nix::SIGINT,
            Signal::Quit => Nix::SIGQUIT,
            Signal::Kill => Nix::SIGKILL,
            Signal::Term => Nix::SIGTERM,
        }
    }
}

/// Where a command's stdin comes from.
#[derive(Default)]
pub enum StdinOption {
    /// Real processes read the parent's stdin; virtual commands see none.
    #[default]
    Inherit,
    Ignore,
    Bytes(Vec<u8>),
    Text(String),
    Stream(Box<dyn AsyncRead + Send + Unpin>),
    /// Written while running through [`ProcessRunner::stdin`].
    Pipe,
}

impl fmt::Debug for StdinOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdinOption::Inherit => f.write_str("Inherit"),
            StdinOption::Ignore => f.write_str("Ignore"),
            StdinOption::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            StdinOption::Text(t) => write!(f, "Text({:?})", t),
            StdinOption::Stream(_) => f.write_str("Stream"),
            StdinOption::Pipe => f.write_str("Pipe"),
        }
    }
}

impl From<&str> for StdinOption {
    fn from(text: &str) -> Self {
        StdinOption::Text(text.to_string())
    }
}

impl From<String> for StdinOption {
    fn from(text: String) -> Self {
        StdinOption::Text(text)
    }
}

impl From<Vec<u8>> for StdinOption {
    fn from(bytes: Vec<u8>) -> Self {
        StdinOption::Bytes(bytes)
    }
}

#[derive(Debug)]
pub struct RunOptions {
    /// Copy output to this process's stdout/stderr as it arrives.
    pub mirror: bool,
    /// Keep output for the result and for replay to late streams.
    pub capture: bool,
    pub stdin: StdinOption,
    /// Relative paths resolve against the shell's cwd.
    pub cwd: Option<PathBuf>,
    /// Overrides on top of the shell's environment.
    pub env: HashMap<String, String>,
    /// Cancelling this token kills the runner with SIGTERM.
    pub signal: Option<CancelToken>,
    /// Awaiting a non-zero result yields `Error::CommandFailed`.
    pub reject: bool,
    /// Parse `&&`, `||`, `;`, `|` and redirects here. When off the whole
    /// text goes to the real shell.
    pub shell_operators: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mirror: true,
            capture: true,
            stdin: StdinOption::Inherit,
            cwd: None,
            env: HashMap::new(),
            signal: None,
            reject: true,
            shell_operators: true,
        }
    }
}

impl RunOptions {
    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    pub fn stdin(mut self, stdin: impl Into<StdinOption>) -> Self {
        self.stdin = stdin.into();
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn signal(mut self, token: CancelToken) -> Self {
        self.signal = Some(token);
        self
    }

    pub fn reject(mut self, reject: bool) -> Self {
        self.reject = reject;
        self
    }

    pub fn shell_operators(mut self, enabled: bool) -> Self {
        self.shell_operators = enabled;
        self
    }

    /// Quiet, non-rejecting options for callers that inspect results themselves.
    pub fn quiet() -> Self {
        Self::default().mirror(false).reject(false)
    }
}

/// Immutable captured output, readable as bytes, text or an async reader.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Captured(Arc<Vec<u8>>);

impl Captured {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lossy UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Text with ANSI colour sequences removed.
    pub fn plain(&self) -> String {
        strip_ansi(&self.text())
    }

    /// A fresh reader over the same bytes.
    pub fn reader(&self) -> Cursor<Captured> {
        Cursor::new(self.clone())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Captured {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Captured {
    fn from(bytes: Vec<u8>) -> Self {
        Captured(Arc::new(bytes))
    }
}

impl From<&str> for Captured {
    fn from(text: &str) -> Self {
        Captured(Arc::new(text.as_bytes().to_vec()))
    }
}

impl fmt::Debug for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.text())
    }
}

impl fmt::Display for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub code: i32,
    pub stdout: Captured,
    pub stderr: Captured,
}

impl CommandResult {
    pub fn from_code(code: i32) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Running,
    Finished,
}

enum Work {
    Line(CommandSpec),
    /// `[source, destination]`, see [`ProcessRunner::pipe`].
    Pipe(Vec<ProcessRunner>),
}

enum Launch {
    Line {
        text: String,
        ctx: ShellContext,
        stdin: Source,
        shell_operators: bool,
        propagate_cwd: bool,
    },
    Pipe,
}

pub(crate) struct RunnerInner {
    id: u64,
    work: Work,
    shell: Shell,
    state: Mutex<RunnerState>,
    listeners: Mutex<Listeners>,
    cancel: CancelToken,
    children: crate::commands::system::ChildSet,
    done: watch::Sender<Option<CommandResult>>,
}

struct RunnerState {
    phase: Phase,
    options: RunOptions,
    settings: ShellSettings,
    chunks: Vec<StreamChunk>,
    subscribers: Vec<mpsc::Sender<StreamChunk>>,
    result: Option<CommandResult>,
    stdin: Option<StdinWriter>,
    registered: bool,
}

/// Handle to one execution. Clones refer to the same runner.
#[derive(Clone)]
pub struct ProcessRunner {
    pub(crate) inner: Arc<RunnerInner>,
}

impl ProcessRunner {
    pub(crate) fn new(shell: Shell, spec: CommandSpec, options: RunOptions) -> Self {
        Self::with_work(shell, Work::Line(spec), options)
    }

    fn with_work(shell: Shell, work: Work, options: RunOptions) -> Self {
        let (done, _) = watch::channel(None);
        Self {
            inner: Arc::new(RunnerInner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                work,
                shell,
                state: Mutex::new(RunnerState {
                    phase: Phase::Pending,
                    options,
                    settings: ShellSettings::default(),
                    chunks: Vec::new(),
                    subscribers: Vec::new(),
                    result: None,
                    stdin: None,
                    registered: false,
                }),
                listeners: Mutex::new(Listeners::default()),
                cancel: CancelToken::new(),
                children: Default::default(),
                done,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RunnerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == Phase::Finished
    }

    /// The recorded result, once finished.
    pub fn result(&self) -> Option<CommandResult> {
        self.state().result.clone()
    }

    /// Command text; pipes render as `a | b`.
    pub fn command(&self) -> String {
        match &self.inner.work {
            Work::Line(spec) => spec.text().to_string(),
            Work::Pipe(stages) => stages
                .iter()
                .map(ProcessRunner::command)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    pub fn shell(&self) -> &Shell {
        &self.inner.shell
    }

    /// Adjusts options of a runner that hasn't started yet.
    pub fn configure(&self, f: impl FnOnce(&mut RunOptions)) -> Result<()> {
        let mut state = self.state();
        if state.phase != Phase::Pending {
            return Err(Error::AlreadyStarted);
        }
        f(&mut state.options);
        Ok(())
    }

    /// Live stdin, available while running with `StdinOption::Pipe`.
    pub fn stdin(&self) -> Option<StdinWriter> {
        self.state().stdin.clone()
    }

    fn listen(&self, add: impl FnOnce(&mut Listeners)) -> &Self {
        let state = self.state();
        if state.phase != Phase::Finished {
            add(&mut self.listeners());
        }
        self
    }

    pub fn on_data(&self, f: impl Fn(&StreamChunk) + Send + Sync + 'static) -> &Self {
        self.listen(|l| l.on_data(f))
    }

    pub fn on_stdout(&self, f: impl Fn(&[u8]) + Send + Sync + 'static) -> &Self {
        self.listen(|l| l.on_stdout(f))
    }

    pub fn on_stderr(&self, f: impl Fn(&[u8]) + Send + Sync + 'static) -> &Self {
        self.listen(|l| l.on_stderr(f))
    }

    pub fn on_end(&self, f: impl Fn(&CommandResult) + Send + Sync + 'static) -> &Self {
        self.listen(|l| l.on_end(f))
    }

    pub fn on_exit(&self, f: impl Fn(i32) + Send + Sync + 'static) -> &Self {
        self.listen(|l| l.on_exit(f))
    }

    pub fn on_error(&self, f: impl Fn(&Error) + Send + Sync + 'static) -> &Self {
        self.listen(|l| l.on_error(f))
    }

    pub fn on_close(&self, f: impl Fn(i32) + Send + Sync + 'static) -> &Self {
        self.listen(|l| l.on_close(f))
    }

    /// Number of registered listeners; 0 after finish.
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Starts execution on the current tokio runtime. Calling it again is a
    /// no-op.
    pub fn start(&self) -> Result<()> {
        Handle::try_current()
            .map_err(|_| Error::Internal("starting a command needs a tokio runtime".into()))?;

        let (launch, signal) = {
            let mut state = self.state();
            if state.phase != Phase::Pending {
                return Ok(());
            }
            state.phase = Phase::Running;
            state.settings = self.inner.shell.settings();
            state.registered = self.inner.shell.supervisor().register(self);
            let launch = self.prepare(&mut state);
            (launch, state.options.signal.clone())
        };
        log::debug!("runner {} started: {}", self.id(), self.command());

        let runner = self.clone();
        tokio::spawn(async move { runner.drive(launch).await });

        if let Some(token) = signal {
            let runner = self.clone();
            tokio::spawn(async move {
                let mut done = runner.inner.done.subscribe();
                tokio::select! {
                    _ = token.cancelled() => runner.kill(Signal::Term),
                    _ = done.wait_for(Option::is_some) => {}
                }
            });
        }
        Ok(())
    }

    fn prepare(&self, state: &mut RunnerState) -> Launch {
        let spec = match &self.inner.work {
            Work::Line(spec) => spec,
            Work::Pipe(_) => return Launch::Pipe,
        };
        let shell = &self.inner.shell;
        let options = &mut state.options;

        let mut ctx = shell.context();
        ctx.settings = state.settings;
        ctx.cancel = self.inner.cancel.clone();
        ctx.children = self.inner.children.clone();
        if let Some(cwd) = &options.cwd {
            ctx.cwd = shell.resolve(cwd);
        }
        ctx.env.extend(options.env.clone());

        let stdin = match std::mem::take(&mut options.stdin) {
            StdinOption::Inherit => Source::Inherit,
            StdinOption::Ignore => Source::Empty,
            StdinOption::Bytes(bytes) => Source::Bytes(bytes),
            StdinOption::Text(text) => Source::Bytes(text.into_bytes()),
            StdinOption::Stream(reader) => Source::Pipe(forward_reader(reader)),
            StdinOption::Pipe => {
                let (writer, rx) = StdinWriter::channel();
                state.stdin = Some(writer);
                Source::Pipe(rx)
            }
        };

        Launch::Line {
            text: spec.text().to_string(),
            ctx,
            stdin,
            shell_operators: options.shell_operators,
            propagate_cwd: options.cwd.is_none(),
        }
    }

    async fn drive(self, launch: Launch) {
        match launch {
            Launch::Line {
                text,
                ctx,
                stdin,
                shell_operators,
                propagate_cwd,
            } => {
                self.drive_line(text, ctx, stdin, shell_operators, propagate_cwd)
                    .await
            }
            Launch::Pipe => pipe::drive(self).await,
        }
    }

    async fn drive_line(
        &self,
        text: String,
        mut ctx: ShellContext,
        stdin: Source,
        shell_operators: bool,
        propagate_cwd: bool,
    ) {
        let (tx, mut rx) = mpsc::channel(CHUNK_CAPACITY);
        let io = Io {
            stdin,
            stdout: Sink::Runner {
                tx: tx.clone(),
                kind: ChunkKind::Stdout,
            },
            stderr: Sink::Runner {
                tx,
                kind: ChunkKind::Stderr,
            },
        };
        let start_cwd = ctx.cwd.clone();

        let exec = tokio::spawn(async move {
            let code = executor::run_line(&text, &mut ctx, io, shell_operators).await;
            (code, ctx.cwd)
        });

        loop {
            tokio::select! {
                chunk = rx.recv() => match chunk {
                    Some(chunk) => self.dispatch(chunk).await,
                    None => break,
                },
                // Killed: the result is already recorded. Dropping rx closes
                // the output pipes of whatever is still running.
                _ = self.inner.cancel.cancelled() => return,
            }
        }

        match exec.await {
            Ok((code, cwd)) => {
                if propagate_cwd && cwd != start_cwd {
                    self.inner.shell.set_cwd(&cwd);
                }
                self.finish(code);
            }
            Err(e) => {
                let error = Error::Internal(format!("command task failed: {}", e));
                self.emit_error(&error);
                self.finish(1);
            }
        }
    }

    /// Capture, mirror, listeners, then subscribers. Subscriber channels are
    /// bounded, so a stream that is not being read holds back the command.
    pub(crate) async fn dispatch(&self, chunk: StreamChunk) {
        let (subscribers, mirror) = {
            let mut state = self.state();
            if state.phase == Phase::Finished {
                return;
            }
            if state.options.capture {
                state.chunks.push(chunk.clone());
            }
            (state.subscribers.clone(), state.options.mirror)
        };

        if mirror {
            mirror_chunk(&chunk);
        }

        let listeners = {
            let listeners = self.listeners();
            listeners.has_chunk_listeners().then(|| listeners.clone())
        };
        if let Some(listeners) = listeners {
            listeners.emit_chunk(&chunk);
        }

        let mut closed = false;
        for tx in &subscribers {
            tokio::select! {
                sent = tx.send(chunk.clone()) => closed |= sent.is_err(),
                _ = self.inner.cancel.cancelled() => return,
            }
        }
        if closed {
            self.state().subscribers.retain(|tx| !tx.is_closed());
        }
    }

    pub(crate) fn emit_error(&self, error: &Error) {
        log::warn!("runner {}: {}", self.id(), error);
        let listeners = self.listeners().clone();
        listeners.emit_error(error);
    }

    /// Records the result once. Later calls return the recorded result.
    pub(crate) fn finish(&self, code: i32) -> CommandResult {
        let (result, listeners) = {
            let mut state = self.state();
            if let Some(result) = &state.result {
                return result.clone();
            }

            let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
            for chunk in &state.chunks {
                match chunk.kind {
                    ChunkKind::Stdout => stdout.extend_from_slice(&chunk.data),
                    ChunkKind::Stderr => stderr.extend_from_slice(&chunk.data),
                }
            }
            let result = CommandResult {
                code,
                stdout: stdout.into(),
                stderr: stderr.into(),
            };

            state.result = Some(result.clone());
            state.phase = Phase::Finished;
            state.subscribers.clear();
            if let Some(writer) = state.stdin.take() {
                writer.close();
            }
            if std::mem::take(&mut state.registered) {
                self.inner.shell.supervisor().unregister_id(self.inner.id);
            }
            (result, std::mem::take(&mut *self.listeners()))
        };

        log::debug!("runner {} finished with code {}", self.id(), code);
        listeners.emit_finish(&result);
        self.inner.done.send_replace(Some(result.clone()));
        result
    }

    /// Sends `signal` to the command. The first kill records `128 + signal`
    /// as the exit code; later calls leave the result alone but still reach
    /// children that are alive, which is what SIGTERM→SIGKILL escalation
    /// needs. Never fails.
    pub fn kill(&self, signal: Signal) {
        self.signal_children(signal);
        if let Work::Pipe(stages) = &self.inner.work {
            for stage in stages {
                stage.kill(signal);
            }
        }
        if self.is_finished() {
            return;
        }
        log::debug!("runner {} killed with signal {}", self.id(), signal.number());
        self.inner.cancel.cancel();
        self.finish(signal.exit_code());
    }

    fn signal_children(&self, signal: Signal) {
        #[cfg(unix)]
        for pid in self.inner.children.pids() {
            let pid = nix::unistd::Pid::from_raw(pid as i32);
            if let Err(e) = nix::sys::signal::kill(pid, signal.as_nix()) {
                log::debug!("signal {} to pid {} failed: {}", signal.number(), pid, e);
            }
        }
        #[cfg(not(unix))]
        let _ = signal;
    }

    /// True while a child process started by this runner is still alive.
    pub fn has_live_children(&self) -> bool {
        !self.inner.children.is_empty()
    }

    /// Starts if needed and waits for the result. Never fails: problems end
    /// up as a non-zero code.
    pub async fn wait(&self) -> CommandResult {
        if let Err(e) = self.start() {
            self.emit_error(&e);
            return self.finish(1);
        }
        let mut done = self.inner.done.subscribe();
        let result = done
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|r| (*r).clone());
        result.unwrap_or_else(|| self.finish(1))
    }

    /// Live output as a stream. With capture on, chunks produced earlier are
    /// replayed first.
    pub fn stream(&self) -> ChunkStream {
        let (tx, rx) = mpsc::channel(CHUNK_CAPACITY);
        let replay = {
            let mut state = self.state();
            if state.phase != Phase::Finished {
                state.subscribers.push(tx);
            }
            if state.options.capture {
                state.chunks.clone()
            } else {
                Vec::new()
            }
        };
        if let Err(e) = self.start() {
            self.emit_error(&e);
            self.finish(1);
        }
        ChunkStream::new(replay, rx, self.clone())
    }

    fn rejects(&self) -> bool {
        self.state().options.reject
    }

    /// Blocks the calling thread until the command finishes.
    ///
    /// Outside tokio a private current-thread runtime drives it; on a
    /// multi-thread runtime the worker steps aside with `block_in_place`.
    /// A current-thread runtime can't be blocked and yields
    /// `Error::BlockingInAsync`.
    pub fn run_sync(&self) -> Result<CommandResult> {
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => tokio::task::block_in_place(|| {
                    handle.block_on(self.clone().into_future())
                }),
                _ => Err(Error::BlockingInAsync),
            },
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(self.clone().into_future())
            }
        }
    }
}

impl IntoFuture for ProcessRunner {
    type Output = Result<CommandResult>;
    type IntoFuture = BoxFuture<'static, Result<CommandResult>>;

    fn into_future(self) -> Self::IntoFuture {
        async move {
            let result = self.wait().await;
            if result.code != 0 && self.rejects() {
                return Err(Error::CommandFailed {
                    code: result.code,
                    stdout: result.stdout,
                    stderr: result.stderr,
                });
            }
            Ok(result)
        }
        .boxed()
    }
}

impl IntoFuture for &ProcessRunner {
    type Output = Result<CommandResult>;
    type IntoFuture = BoxFuture<'static, Result<CommandResult>>;

    fn into_future(self) -> Self::IntoFuture {
        self.clone().into_future()
    }
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("id", &self.id())
            .field("command", &self.command())
            .field("phase", &self.phase())
            .finish()
    }
}

fn mirror_chunk(chunk: &StreamChunk) {
    use std::io::Write;
    let written = match chunk.kind {
        ChunkKind::Stdout => {
            let mut out = std::io::stdout().lock();
            out.write_all(&chunk.data).and_then(|_| out.flush())
        }
        ChunkKind::Stderr => {
            let mut err = std::io::stderr().lock();
            err.write_all(&chunk.data).and_then(|_| err.flush())
        }
    };
    if let Err(e) = written {
        log::debug!("mirror write failed: {}", e);
    }
}

/// Pumps a caller-provided reader into a stdin channel.
fn forward_reader(mut reader: Box<dyn AsyncRead + Send + Unpin>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut buf = vec![0u8; 8192];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("stdin stream failed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
