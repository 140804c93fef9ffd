use super::ast::{Operator, ParsedCommand, Redirect, RedirectMode, Word, WordPart};
use super::context::ShellContext;
use super::executor::run_line;
use super::io::{Io, Sink, Source};
use super::{ParseError, needs_real_shell, parse_command_line};
use crate::commands::{CommandOutput, Handler};
use tokio::sync::mpsc;

fn simple(cmd: &str, args: &[&str]) -> ParsedCommand {
    ParsedCommand::Simple {
        cmd: Word::literal_word(cmd),
        args: args.iter().map(|a| Word::literal_word(*a)).collect(),
        redirects: Vec::new(),
    }
}

fn quoted(text: &str) -> Word {
    Word {
        parts: vec![WordPart::Literal(text.to_string())],
        quoted: true,
    }
}

#[test]
fn test_parse_simple_with_quotes() {
    let tree = parse_command_line(r#"echo "a b" 'c' d\ e"#).unwrap();
    assert_eq!(
        tree,
        ParsedCommand::Simple {
            cmd: Word::literal_word("echo"),
            args: vec![quoted("a b"), quoted("c"), Word::literal_word("d e")],
            redirects: Vec::new(),
        }
    );
}

#[test]
fn test_parse_operator_precedence() {
    let tree = parse_command_line("a && b | c; d || e").unwrap();
    assert_eq!(
        tree,
        ParsedCommand::Sequence {
            commands: vec![
                simple("a", &[]),
                ParsedCommand::Pipeline {
                    commands: vec![simple("b", &[]), simple("c", &[])],
                },
                simple("d", &[]),
                simple("e", &[]),
            ],
            operators: vec![Operator::And, Operator::Seq, Operator::Or],
        }
    );
}

#[test]
fn test_parse_subshell_and_redirects() {
    let tree = parse_command_line("(cd sub && ls) ; cat < in.txt >> out.txt").unwrap();
    let ParsedCommand::Sequence { commands, .. } = tree else {
        panic!("expected a sequence");
    };
    assert_eq!(
        commands[0],
        ParsedCommand::Subshell {
            command: Box::new(ParsedCommand::Sequence {
                commands: vec![simple("cd", &["sub"]), simple("ls", &[])],
                operators: vec![Operator::And],
            }),
        }
    );
    assert_eq!(
        commands[1],
        ParsedCommand::Simple {
            cmd: Word::literal_word("cat"),
            args: Vec::new(),
            redirects: vec![
                Redirect {
                    mode: RedirectMode::Input,
                    target: Word::literal_word("in.txt"),
                },
                Redirect {
                    mode: RedirectMode::Append,
                    target: Word::literal_word("out.txt"),
                },
            ],
        }
    );
}

#[test]
fn test_parse_variables_stay_symbolic() {
    let tree = parse_command_line(r#"echo $HOME/x "$?" '$NOPE'"#).unwrap();
    let ParsedCommand::Simple { args, .. } = tree else {
        panic!("expected a simple command");
    };
    assert_eq!(
        args[0].parts,
        vec![
            WordPart::Variable("HOME".into()),
            WordPart::Literal("/x".into())
        ]
    );
    assert!(args[1].quoted);
    assert_eq!(args[1].parts, vec![WordPart::Variable("?".into())]);
    assert_eq!(args[2], quoted("$NOPE"));
}

#[test]
fn test_parse_newlines_comments_and_trailing_semicolon() {
    assert_eq!(parse_command_line("a;").unwrap(), simple("a", &[]));
    assert_eq!(parse_command_line("echo hi # greet").unwrap(), simple("echo", &["hi"]));
    assert_eq!(
        parse_command_line("a\nb\n").unwrap(),
        ParsedCommand::Sequence {
            commands: vec![simple("a", &[]), simple("b", &[])],
            operators: vec![Operator::Seq],
        }
    );
    assert_eq!(
        parse_command_line("a &&\nb").unwrap(),
        ParsedCommand::Sequence {
            commands: vec![simple("a", &[]), simple("b", &[])],
            operators: vec![Operator::And],
        }
    );
}

#[test]
fn test_parse_errors() {
    assert_eq!(parse_command_line(""), Err(ParseError::Empty));
    assert_eq!(parse_command_line("  \n "), Err(ParseError::Empty));
    assert_eq!(
        parse_command_line("echo 'open"),
        Err(ParseError::UnterminatedQuote('\''))
    );
    assert_eq!(
        parse_command_line("echo \"open"),
        Err(ParseError::UnterminatedQuote('"'))
    );
    assert_eq!(
        parse_command_line("a &&"),
        Err(ParseError::MissingCommand("&&".into()))
    );
    assert_eq!(
        parse_command_line("| b"),
        Err(ParseError::MissingCommand("|".into()))
    );
    assert_eq!(parse_command_line("(a"), Err(ParseError::UnmatchedParen));
    assert_eq!(parse_command_line("a)"), Err(ParseError::UnmatchedParen));
    assert_eq!(
        parse_command_line("echo >"),
        Err(ParseError::MissingRedirectTarget)
    );
    assert!(matches!(
        parse_command_line("sleep 1 &"),
        Err(ParseError::Unsupported(_))
    ));
    assert!(matches!(
        parse_command_line("FOO=1 env"),
        Err(ParseError::Unsupported(_))
    ));
    assert!(matches!(
        parse_command_line("cmd 2> err.log"),
        Err(ParseError::Unsupported(_))
    ));
}

#[test]
fn test_needs_real_shell() {
    assert!(needs_real_shell("ls *.rs"));
    assert!(needs_real_shell("echo \"$(date)\""));
    assert!(needs_real_shell("echo `date`"));
    assert!(needs_real_shell("cd ~/src"));
    assert!(needs_real_shell("cat <<EOF"));
    assert!(needs_real_shell("make 2>&1"));
    assert!(needs_real_shell("make &> log"));

    assert!(!needs_real_shell("echo hello world"));
    assert!(!needs_real_shell("echo '*' \"?\""));
    assert!(!needs_real_shell("echo \\*"));
    assert!(!needs_real_shell("echo a~b"));
    assert!(!needs_real_shell("seq 1 2 > out.txt"));
    assert!(!needs_real_shell("echo 'it''s $(fine)'"));
}

struct Ran {
    code: i32,
    stdout: String,
    stderr: String,
}

async fn run(line: &str, ctx: &mut ShellContext) -> Ran {
    let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(64);
    let (err_tx, mut err_rx) = mpsc::channel::<Vec<u8>>(64);
    let io = Io {
        stdin: Source::Empty,
        stdout: Sink::Pipe(out_tx),
        stderr: Sink::Pipe(err_tx),
    };

    let collect_out = async {
        let mut all = Vec::new();
        while let Some(data) = out_rx.recv().await {
            all.extend(data);
        }
        String::from_utf8_lossy(&all).into_owned()
    };
    let collect_err = async {
        let mut all = Vec::new();
        while let Some(data) = err_rx.recv().await {
            all.extend(data);
        }
        String::from_utf8_lossy(&all).into_owned()
    };

    let (code, stdout, stderr) = tokio::join!(run_line(line, ctx, io, true), collect_out, collect_err);
    Ran {
        code,
        stdout,
        stderr,
    }
}

#[tokio::test]
async fn test_sequence_short_circuit() {
    let mut ctx = ShellContext::for_tests();
    let ran = run(r#"echo "a" && false || echo "b""#, &mut ctx).await;
    assert_eq!(ran.stdout, "a\nb\n");
    assert_eq!(ran.code, 0);

    let ran = run("false && echo no; echo yes", &mut ctx).await;
    assert_eq!(ran.stdout, "yes\n");

    let ran = run("true || echo skipped", &mut ctx).await;
    assert_eq!(ran.stdout, "");
    assert_eq!(ran.code, 0);
}

#[tokio::test]
async fn test_exit_status_variable() {
    let mut ctx = ShellContext::for_tests();
    let ran = run("false; echo $?", &mut ctx).await;
    assert_eq!(ran.stdout, "1\n");
    assert_eq!(ran.code, 0);
}

#[tokio::test]
async fn test_virtual_pipeline() {
    let mut ctx = ShellContext::for_tests();
    assert_eq!(run("echo hello | cat", &mut ctx).await.stdout, "hello\n");
    assert_eq!(run("seq 5 | tail -n 2", &mut ctx).await.stdout, "4\n5\n");
    assert_eq!(run("seq 10 | head -n 3 | tail -n 1", &mut ctx).await.stdout, "3\n");
}

#[tokio::test]
async fn test_pipefail_picks_failing_stage() {
    let mut ctx = ShellContext::for_tests();
    assert_eq!(run("false | true", &mut ctx).await.code, 0);

    ctx.settings.pipefail = true;
    assert_eq!(run("false | true", &mut ctx).await.code, 1);
    assert_eq!(run("exit 3 | exit 4 | true", &mut ctx).await.code, 4);
}

#[tokio::test]
async fn test_head_stops_endless_producer() {
    let mut ctx = ShellContext::for_tests();
    let ran = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        run("yes | head -n 2", &mut ctx),
    )
    .await
    .expect("yes | head never finished");
    assert_eq!(ran.stdout, "y\ny\n");
    assert_eq!(ran.code, 0);

    let ran = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        run("yes ok | head -n 1 | cat", &mut ctx),
    )
    .await
    .expect("yes ok | head | cat never finished");
    assert_eq!(ran.stdout, "ok\n");
}

#[tokio::test]
async fn test_bare_exit_keeps_last_status() {
    let mut ctx = ShellContext::for_tests();
    assert_eq!(run("false; exit", &mut ctx).await.code, 1);
    assert_eq!(run("true; exit", &mut ctx).await.code, 0);
    assert_eq!(run("exit 7 || exit", &mut ctx).await.code, 7);
}

#[tokio::test]
async fn test_errexit_stops_sequence() {
    let mut ctx = ShellContext::for_tests();
    ctx.settings.errexit = true;

    let ran = run("echo one; false; echo two", &mut ctx).await;
    assert_eq!(ran.stdout, "one\n");
    assert_eq!(ran.code, 1);

    // conditions of && / || don't count
    let ran = run("false || echo rescued", &mut ctx).await;
    assert_eq!(ran.stdout, "rescued\n");
    assert_eq!(ran.code, 0);
}

#[tokio::test]
async fn test_variable_expansion_and_nounset() {
    let mut ctx = ShellContext::for_tests();
    ctx.env.insert("NAME".into(), "big world".into());
    ctx.env.remove("CMDFLOW_UNSET_VAR");

    assert_eq!(run(r#"echo "hello $NAME""#, &mut ctx).await.stdout, "hello big world\n");
    assert_eq!(run("echo '$NAME'", &mut ctx).await.stdout, "$NAME\n");
    assert_eq!(run("echo $CMDFLOW_UNSET_VAR end", &mut ctx).await.stdout, "end\n");

    ctx.settings.nounset = true;
    let ran = run("echo $CMDFLOW_UNSET_VAR", &mut ctx).await;
    assert_eq!(ran.code, 1);
    assert!(ran.stderr.contains("CMDFLOW_UNSET_VAR: unbound variable"));
}

#[tokio::test]
async fn test_redirects() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ShellContext::for_tests();
    ctx.cwd = dir.path().to_path_buf();

    let ran = run("echo hi > out.txt; echo more >> out.txt; cat < out.txt", &mut ctx).await;
    assert_eq!(ran.stdout, "hi\nmore\n");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
        "hi\nmore\n"
    );

    let ran = run("cat < missing.txt", &mut ctx).await;
    assert_eq!(ran.code, 1);
    assert!(ran.stderr.starts_with("missing.txt:"));
}

#[tokio::test]
async fn test_cd_scoping() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let root = dir.path().canonicalize().unwrap();
    let mut ctx = ShellContext::for_tests();
    ctx.cwd = root.clone();

    let ran = run("(cd sub); pwd", &mut ctx).await;
    assert_eq!(ran.stdout, format!("{}\n", root.display()));

    let ran = run("cd sub && pwd", &mut ctx).await;
    assert_eq!(ran.stdout, format!("{}\n", root.join("sub").display()));
    assert_eq!(ctx.cwd, root.join("sub"));
    assert_eq!(
        ctx.env.get("PWD").map(String::as_str),
        root.join("sub").to_str()
    );
}

#[tokio::test]
async fn test_xtrace_and_verbose() {
    let mut ctx = ShellContext::for_tests();
    ctx.settings.xtrace = true;
    let ran = run("echo 'a b'", &mut ctx).await;
    assert_eq!(ran.stdout, "a b\n");
    assert_eq!(ran.stderr, "+ echo 'a b'\n");

    ctx.settings.xtrace = false;
    ctx.settings.verbose = true;
    let ran = run("true", &mut ctx).await;
    assert_eq!(ran.stderr, "true\n");
}

#[tokio::test]
async fn test_command_not_found() {
    let mut ctx = ShellContext::for_tests();
    let ran = run("cmdflow-no-such-command --flag", &mut ctx).await;
    assert_eq!(ran.code, 127);
    assert!(ran.stderr.contains("command not found"));
}

#[tokio::test]
async fn test_handler_errors_become_exit_codes() {
    let mut ctx = ShellContext::for_tests();
    {
        let mut registry = ctx.registry.write().unwrap();
        let _boom = registry.register("boom", Handler::from_fn(|_| anyhow::bail!("kaput")));
        let _explode = registry.register(
            "explode",
            Handler::from_fn(|_| -> anyhow::Result<CommandOutput> { panic!("oops") }),
        );
    }

    let ran = run("boom", &mut ctx).await;
    assert_eq!((ran.code, ran.stderr.as_str()), (1, "boom: kaput\n"));

    let ran = run("explode || echo survived", &mut ctx).await;
    assert_eq!(ran.stderr, "explode: oops\n");
    assert_eq!(ran.stdout, "survived\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_processes_and_fallback() {
    let mut ctx = ShellContext::for_tests();
    ctx.virtual_commands = false;
    let ran = run("echo real | tr a-z A-Z", &mut ctx).await;
    assert_eq!(ran.stdout, "REAL\n");

    ctx.virtual_commands = true;
    let ran = run("printf '%s-' a b | cat", &mut ctx).await;
    assert_eq!(ran.stdout, "a-b-");

    // globbing needs the real shell
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x.rs"), "").unwrap();
    ctx.cwd = dir.path().to_path_buf();
    let ran = run("echo *.rs", &mut ctx).await;
    assert_eq!(ran.stdout, "x.rs\n");
}
