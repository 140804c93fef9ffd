// Real processes: PATH commands and the real-shell fallback
use crate::shell::context::ShellContext;
use crate::shell::io::{Io, Sink, Source};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

/// Code for a command the runner cancelled before it was spawned.
const CANCELLED: i32 = 128 + 15;

/// Pids of the live children started on behalf of one runner.
#[derive(Debug, Clone, Default)]
pub struct ChildSet(Arc<Mutex<HashSet<u32>>>);

impl ChildSet {
    pub fn insert(&self, pid: u32) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).insert(pid);
    }

    pub fn remove(&self, pid: u32) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).remove(&pid);
    }

    pub fn pids(&self) -> Vec<u32> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

/// Runs `name` from PATH (or a path relative to the cwd).
pub async fn run_program(name: &str, args: &[String], ctx: &ShellContext, io: Io) -> i32 {
    let path_var = ctx.env.get("PATH").cloned();
    let resolved = match which::which_in(name, path_var, &ctx.cwd) {
        Ok(path) => path,
        Err(_) => {
            io.stderr
                .write_str(&format!("{}: command not found\n", name))
                .await;
            return 127;
        }
    };

    let mut command = Command::new(resolved);
    command.args(args);
    spawn(name, command, ctx, io).await
}

/// Hands the whole text to the real shell with `-c`.
pub async fn run_in_real_shell(text: &str, ctx: &ShellContext, io: Io) -> i32 {
    ctx.tracer
        .trace("shell", || format!("{} {} {:?}", ctx.program, ctx.program.args.join(" "), text));
    let mut command = Command::new(&ctx.program.path);
    command.args(&ctx.program.args).arg(text);
    spawn(&ctx.program.to_string(), command, ctx, io).await
}

async fn spawn(name: &str, mut command: Command, ctx: &ShellContext, io: Io) -> i32 {
    let Io {
        stdin,
        stdout,
        stderr,
    } = io;

    // The context's environment is the source of truth.
    command
        .current_dir(&ctx.cwd)
        .env_clear()
        .envs(&ctx.env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let feed = match stdin {
        Source::Inherit => {
            command.stdin(Stdio::inherit());
            None
        }
        Source::Empty => {
            command.stdin(Stdio::null());
            None
        }
        other => {
            command.stdin(Stdio::piped());
            Some(other)
        }
    };

    // A kill that already happened never saw this pid.
    if ctx.cancel.is_cancelled() {
        return CANCELLED;
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::NotFound => 127,
                _ => 126,
            };
            stderr.write_str(&format!("{}: {}\n", name, e)).await;
            return code;
        }
    };

    let pid = child.id();
    if let Some(pid) = pid {
        ctx.children.insert(pid);
    }
    ctx.tracer.trace("spawn", || format!("{} pid={:?}", name, pid));

    if let (Some(source), Some(mut child_in)) = (feed, child.stdin.take()) {
        tokio::spawn(async move {
            match source {
                Source::Bytes(bytes) => {
                    let _ = child_in.write_all(&bytes).await;
                }
                Source::Pipe(mut rx) => {
                    while let Some(chunk) = rx.recv().await {
                        if child_in.write_all(&chunk).await.is_err() {
                            break;
                        }
                    }
                }
                Source::Empty | Source::Inherit => {}
            }
            // child_in drops here and the child sees EOF
        });
    }

    let (out, err) = (child.stdout.take(), child.stderr.take());
    let cancelled = tokio::select! {
        _ = async { tokio::join!(pump(out, &stdout), pump(err, &stderr)) } => false,
        _ = ctx.cancel.cancelled() => true,
    };
    let waited = tokio::select! {
        status = child.wait(), if !cancelled => Some(status),
        _ = ctx.cancel.cancelled() => None,
    };
    let status = match waited {
        Some(status) => status,
        None => {
            terminate(&mut child);
            child.wait().await
        }
    };
    if let Some(pid) = pid {
        ctx.children.remove(pid);
    }

    match status {
        Ok(status) => exit_code(status),
        Err(e) => {
            stderr.write_str(&format!("{}: {}\n", name, e)).await;
            1
        }
    }
}

/// SIGTERM for a child the runner's own signal may have raced past.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            let pid = nix::unistd::Pid::from_raw(pid as i32);
            if let Err(e) = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM) {
                log::debug!("terminating pid {} failed: {}", pid, e);
            }
            return;
        }
    }
    if let Err(e) = child.start_kill() {
        log::debug!("killing child failed: {}", e);
    }
}

async fn pump<R: AsyncRead + Unpin>(reader: Option<R>, sink: &Sink) {
    let Some(mut reader) = reader else {
        return;
    };
    let mut buf = vec![0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                // Reader gone: dropping our end lets the child see EPIPE.
                if !sink.write(buf[..n].to_vec()).await {
                    break;
                }
            }
        }
    }
}

/// Exit code, with death by signal reported as 128 + signal number.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
