use crate::commands::{CommandContext, CommandOutput, CommandRegistry, Handler, Yielder};
use crate::runner::CancelToken;
use crate::shell::io::Sink;
use std::path::Path;
use std::time::Duration;

async fn run(name: &str, args: &[&str], cwd: &Path) -> CommandOutput {
    run_with_stdin(name, args, cwd, "").await
}

async fn run_with_stdin(name: &str, args: &[&str], cwd: &Path, stdin: &str) -> CommandOutput {
    let registry = CommandRegistry::with_builtins();
    let mut ctx = CommandContext::new(name, args.iter().copied());
    ctx.cwd = cwd.to_path_buf();
    ctx.stdin = stdin.to_string();
    match registry.get(name) {
        Some(Handler::Call(command)) => match command.execute(ctx).await {
            Ok(output) => output,
            Err(e) => CommandOutput::error(format!("{}: {:#}\n", name, e)),
        },
        other => panic!("{} is not a call handler: {:?}", name, other),
    }
}

fn stdout(output: &CommandOutput) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[tokio::test]
async fn test_echo_flags() {
    let dir = std::env::temp_dir();
    assert_eq!(stdout(&run("echo", &["a", "b"], &dir).await), "a b\n");
    assert_eq!(stdout(&run("echo", &["-n", "a"], &dir).await), "a");
    assert_eq!(stdout(&run("echo", &["-e", "a\\tb"], &dir).await), "a\tb\n");
    assert_eq!(stdout(&run("echo", &["-x"], &dir).await), "-x\n");
}

#[tokio::test]
async fn test_cd_reports_new_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    let output = run("cd", &["sub"], dir.path()).await;
    assert_eq!(output.code, 0);
    assert_eq!(
        output.chdir.unwrap(),
        dir.path().join("sub").canonicalize().unwrap()
    );

    let missing = run("cd", &["nope"], dir.path()).await;
    assert_eq!(missing.code, 1);
    assert!(String::from_utf8_lossy(&missing.stderr).contains("nope"));
}

#[tokio::test]
async fn test_file_utilities() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = dir.path();

    assert_eq!(run("mkdir", &["-p", "a/b"], cwd).await.code, 0);
    assert_eq!(run("touch", &["a/b/one.txt", "two.txt"], cwd).await.code, 0);
    assert!(cwd.join("a/b/one.txt").is_file());

    assert_eq!(run("cp", &["two.txt", "three.txt"], cwd).await.code, 0);
    assert_eq!(run("mv", &["three.txt", "a"], cwd).await.code, 0);
    assert!(cwd.join("a/three.txt").is_file());
    assert!(!cwd.join("three.txt").exists());

    assert_eq!(run("cp", &["a", "copy"], cwd).await.code, 1);
    assert_eq!(run("cp", &["-r", "a", "copy"], cwd).await.code, 0);
    assert!(cwd.join("copy/b/one.txt").is_file());

    let listing = run("ls", &[], cwd).await;
    assert_eq!(stdout(&listing), "a\ncopy\ntwo.txt\n");

    assert_eq!(run("rm", &["a"], cwd).await.code, 1);
    assert_eq!(run("rm", &["-rf", "a", "missing"], cwd).await.code, 0);
    assert!(!cwd.join("a").exists());
    assert_eq!(run("rm", &["missing"], cwd).await.code, 1);
}

#[tokio::test]
async fn test_cat_and_head_read_stdin() {
    let dir = std::env::temp_dir();
    let cat = run_with_stdin("cat", &[], &dir, "piped\n").await;
    assert_eq!(stdout(&cat), "piped\n");

    let head = run_with_stdin("head", &["-n", "2"], &dir, "1\n2\n3\n").await;
    assert_eq!(stdout(&head), "1\n2\n");

    let tail = run_with_stdin("tail", &["-n", "1"], &dir, "1\n2\n3\n").await;
    assert_eq!(stdout(&tail), "3\n");

    let missing = run("cat", &["/definitely/not/here"], &dir).await;
    assert_eq!(missing.code, 1);
}

#[tokio::test]
async fn test_seq_exit_and_test() {
    let dir = std::env::temp_dir();
    assert_eq!(stdout(&run("seq", &["3"], &dir).await), "1\n2\n3\n");
    assert_eq!(stdout(&run("seq", &["2", "2", "6"], &dir).await), "2\n4\n6\n");
    assert_eq!(run("seq", &[], &dir).await.code, 1);

    assert_eq!(run("exit", &["3"], &dir).await.code, 3);
    assert_eq!(run("exit", &["abc"], &dir).await.code, 2);
    assert_eq!(run("exit", &[], &dir).await.code, 0);

    assert_eq!(run("[", &["1", "-eq", "1", "]"], &dir).await.code, 0);
    assert_eq!(run("[", &["1", "-eq", "1"], &dir).await.code, 2);
    assert_eq!(run("test", &["-z", "x"], &dir).await.code, 1);
}

#[tokio::test]
async fn test_sleep_wakes_on_cancel() {
    let registry = CommandRegistry::with_builtins();
    let Some(Handler::Call(sleep)) = registry.get("sleep") else {
        panic!("sleep missing");
    };
    let ctx = CommandContext::new("sleep", ["30"]);
    let cancel = ctx.cancel.clone();
    let task = tokio::spawn(async move { sleep.execute(ctx).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();
    let output = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("sleep ignored cancellation")
        .unwrap()
        .unwrap();
    assert_eq!(output.code, 143);
}

#[tokio::test]
async fn test_yes_stops_when_reader_leaves() {
    let registry = CommandRegistry::with_builtins();
    let Some(Handler::Generate(yes)) = registry.get("yes") else {
        panic!("yes is not a generator");
    };

    let (tx, mut rx) = tokio::sync::mpsc::channel(4);
    let out = Yielder::new(Sink::Pipe(tx), Sink::Null, CancelToken::new());
    let task = tokio::spawn(async move { yes.generate(CommandContext::new("yes", ["ok"]), out).await });

    for _ in 0..3 {
        assert_eq!(rx.recv().await.unwrap(), b"ok\n");
    }
    drop(rx);
    let code = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("yes kept running")
        .unwrap()
        .unwrap();
    assert_eq!(code, 0);
}
