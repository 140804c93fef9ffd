use crate::commands::{CommandContext, Handler, Yielder, system};
use crate::quote::quote;
use crate::shell::ast::{Operator, ParsedCommand, Redirect, RedirectMode, Word, WordPart};
use crate::shell::context::ShellContext;
use crate::shell::io::{Io, Sink, Source};
use crate::shell::parser::{ParseError, parse_command_line};
use crate::shell::needs_real_shell;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tokio::sync::mpsc;

const PIPE_CAPACITY: usize = 16;

/// Runs one command line: parsed and executed here when possible, otherwise
/// handed verbatim to the real shell.
pub async fn run_line(text: &str, ctx: &mut ShellContext, io: Io, shell_operators: bool) -> i32 {
    if ctx.settings.verbose {
        io.stderr.write_str(&format!("{}\n", text)).await;
    }

    if !shell_operators || needs_real_shell(text) {
        return run_real(text, ctx, io).await;
    }

    match parse_command_line(text) {
        Ok(tree) => {
            ctx.tracer.trace("parse", || format!("{:?}", tree));
            execute(&tree, ctx, io).await
        }
        Err(ParseError::Empty) => 0,
        Err(e) => {
            ctx.tracer.trace("parse", || format!("deferring to real shell: {}", e));
            run_real(text, ctx, io).await
        }
    }
}

async fn run_real(text: &str, ctx: &mut ShellContext, io: Io) -> i32 {
    let code = system::run_in_real_shell(text, ctx, io).await;
    ctx.exit_code = code;
    code
}

pub fn execute<'a>(command: &'a ParsedCommand, ctx: &'a mut ShellContext, io: Io) -> BoxFuture<'a, i32> {
    async move {
        if ctx.cancel.is_cancelled() {
            return ctx.exit_code;
        }
        match command {
            ParsedCommand::Simple {
                cmd,
                args,
                redirects,
            } => execute_simple(cmd, args, redirects, ctx, io).await,
            ParsedCommand::Pipeline { commands } => execute_pipeline(commands, ctx, io).await,
            ParsedCommand::Sequence {
                commands,
                operators,
            } => execute_sequence(commands, operators, ctx, io).await,
            ParsedCommand::Subshell { command } => {
                let mut sub_ctx = ctx.clone();
                let code = execute(command, &mut sub_ctx, io).await;
                ctx.exit_code = code;
                code
            }
        }
    }
    .boxed()
}

async fn execute_sequence(
    commands: &[ParsedCommand],
    operators: &[Operator],
    ctx: &mut ShellContext,
    io: Io,
) -> i32 {
    let Io {
        stdin,
        stdout,
        stderr,
    } = io;
    // Only the first command gets the invocation's stdin.
    let mut stdin = Some(stdin);
    let mut code = 0;

    for (i, command) in commands.iter().enumerate() {
        if i > 0 {
            let proceed = match operators[i - 1] {
                Operator::And => code == 0,
                Operator::Or => code != 0,
                Operator::Seq => true,
            };
            if !proceed {
                continue;
            }
        }
        if ctx.cancel.is_cancelled() {
            break;
        }

        let io = Io {
            stdin: stdin.take().unwrap_or_default(),
            stdout: stdout.clone(),
            stderr: stderr.clone(),
        };
        code = execute(command, ctx, io).await;
        ctx.exit_code = code;

        // A failing && / || condition doesn't trip errexit.
        if code != 0
            && ctx.settings.errexit
            && !matches!(operators.get(i), Some(Operator::And | Operator::Or))
        {
            ctx.tracer.trace("errexit", || format!("stopping after exit code {}", code));
            break;
        }
    }
    code
}

async fn execute_pipeline(commands: &[ParsedCommand], ctx: &mut ShellContext, io: Io) -> i32 {
    let Io {
        stdin,
        stdout,
        stderr,
    } = io;
    let last = commands.len().saturating_sub(1);
    let mut next_input = Some(stdin);
    let mut stages = Vec::with_capacity(commands.len());

    for (i, command) in commands.iter().enumerate() {
        let input = next_input.take().unwrap_or_default();
        let output = if i == last {
            stdout.clone()
        } else {
            let (tx, rx) = mpsc::channel(PIPE_CAPACITY);
            next_input = Some(Source::Pipe(rx));
            Sink::Pipe(tx)
        };
        let io = Io {
            stdin: input,
            stdout: output,
            stderr: stderr.clone(),
        };
        let mut stage_ctx = ctx.clone();
        stages.push(async move { execute(command, &mut stage_ctx, io).await });
    }
    drop(stdout);
    drop(stderr);

    // Stages run concurrently; each drops its pipe ends when it finishes.
    let codes = join_all(stages).await;
    let code = if ctx.settings.pipefail {
        codes.iter().rev().copied().find(|c| *c != 0).unwrap_or(0)
    } else {
        codes.last().copied().unwrap_or(0)
    };
    ctx.exit_code = code;
    code
}

async fn execute_simple(
    cmd: &Word,
    args: &[Word],
    redirects: &[Redirect],
    ctx: &mut ShellContext,
    io: Io,
) -> i32 {
    let Io {
        mut stdin,
        mut stdout,
        stderr,
    } = io;

    let mut words = Vec::with_capacity(args.len() + 1);
    for word in std::iter::once(cmd).chain(args) {
        match expand_word(word, ctx) {
            Ok(fields) => words.extend(fields),
            Err(name) => {
                stderr.write_str(&format!("{}: unbound variable\n", name)).await;
                return finish(ctx, 1);
            }
        }
    }

    for redirect in redirects {
        let target = match expand_word(&redirect.target, ctx) {
            Ok(fields) => fields.join(" "),
            Err(name) => {
                stderr.write_str(&format!("{}: unbound variable\n", name)).await;
                return finish(ctx, 1);
            }
        };
        let path = resolve(ctx, &target);
        match redirect.mode {
            RedirectMode::Input => match tokio::fs::read(&path).await {
                Ok(bytes) => stdin = Source::Bytes(bytes),
                Err(e) => {
                    stderr.write_str(&format!("{}: {}\n", target, e)).await;
                    return finish(ctx, 1);
                }
            },
            RedirectMode::Overwrite | RedirectMode::Append => {
                let mut options = tokio::fs::OpenOptions::new();
                options.write(true).create(true);
                if redirect.mode == RedirectMode::Append {
                    options.append(true);
                } else {
                    options.truncate(true);
                }
                match options.open(&path).await {
                    Ok(file) => stdout = Sink::file(file),
                    Err(e) => {
                        stderr.write_str(&format!("{}: {}\n", target, e)).await;
                        return finish(ctx, 1);
                    }
                }
            }
        }
    }

    if words.is_empty() {
        // Everything expanded to nothing
        return finish(ctx, 0);
    }
    let name = words.remove(0);

    if ctx.settings.xtrace {
        let mut line = String::from("+ ");
        line.push_str(&quote(&name));
        for word in &words {
            line.push(' ');
            line.push_str(&quote(word));
        }
        line.push('\n');
        stderr.write_str(&line).await;
    }

    let io = Io {
        stdin,
        stdout,
        stderr,
    };
    let code = match ctx.lookup(&name) {
        Some(handler) => run_virtual(&name, handler, words, ctx, io).await,
        None => system::run_program(&name, &words, ctx, io).await,
    };
    finish(ctx, code)
}

fn finish(ctx: &mut ShellContext, code: i32) -> i32 {
    ctx.exit_code = code;
    code
}

fn resolve(ctx: &ShellContext, target: &str) -> PathBuf {
    let p = PathBuf::from(target);
    if p.is_absolute() { p } else { ctx.cwd.join(p) }
}

/// Expands `$VAR` references. Unquoted words that contained a variable are
/// split on whitespace and dropped when empty; quoted words stay one field.
/// `Err` carries the name of an unset variable under `nounset`.
pub fn expand_word(word: &Word, ctx: &ShellContext) -> Result<Vec<String>, String> {
    let mut out = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal(s) => out.push_str(s),
            WordPart::Variable(name) => match ctx.var(name) {
                Some(value) => out.push_str(&value),
                None if ctx.settings.nounset => return Err(name.clone()),
                None => {}
            },
        }
    }

    if word.quoted || !word.has_variables() {
        return Ok(vec![out]);
    }
    Ok(out.split_whitespace().map(str::to_string).collect())
}

async fn run_virtual(
    name: &str,
    handler: Handler,
    args: Vec<String>,
    ctx: &mut ShellContext,
    io: Io,
) -> i32 {
    let Io {
        stdin,
        stdout,
        stderr,
    } = io;
    let wanted = match &handler {
        Handler::Call(command) => command.stdin_lines(&args),
        Handler::Generate(_) => None,
    };
    let stdin = match wanted {
        Some(n) => stdin.read_lines(n).await,
        None => stdin.read_all().await,
    };
    let stdin = String::from_utf8_lossy(&stdin).into_owned();
    ctx.tracer.trace("virtual", || format!("{} {:?}", name, args));

    let command_ctx = CommandContext {
        name: name.to_string(),
        args,
        stdin,
        cwd: ctx.cwd.clone(),
        env: ctx.env.clone(),
        cancel: ctx.cancel.clone(),
        status: ctx.exit_code,
    };

    match handler {
        Handler::Call(command) => {
            match AssertUnwindSafe(command.execute(command_ctx)).catch_unwind().await {
                Ok(Ok(output)) => {
                    stdout.write(output.stdout).await;
                    stderr.write(output.stderr).await;
                    if let Some(dir) = output.chdir {
                        ctx.env
                            .insert("PWD".to_string(), dir.to_string_lossy().into_owned());
                        ctx.cwd = dir;
                    }
                    output.code
                }
                Ok(Err(e)) => {
                    stderr.write_str(&format!("{}: {:#}\n", name, e)).await;
                    1
                }
                Err(panic) => {
                    stderr
                        .write_str(&format!("{}: {}\n", name, panic_message(panic.as_ref())))
                        .await;
                    1
                }
            }
        }
        Handler::Generate(generator) => {
            let out = Yielder::new(stdout, stderr.clone(), ctx.cancel.clone());
            match AssertUnwindSafe(generator.generate(command_ctx, out))
                .catch_unwind()
                .await
            {
                Ok(Ok(code)) => code,
                Ok(Err(e)) => {
                    stderr.write_str(&format!("{}: {:#}\n", name, e)).await;
                    1
                }
                Err(panic) => {
                    stderr
                        .write_str(&format!("{}: {}\n", name, panic_message(panic.as_ref())))
                        .await;
                    1
                }
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
