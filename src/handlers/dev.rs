use anyhow::{Result, bail};
use blake3::Hasher;
use cmdflow::{ProcessRunner, RunOptions, Shell, Signal, StdinOption, load_config};
use colored::*;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const GRACE_PERIOD: Duration = Duration::from_secs(2);

pub async fn handle_dev(command: String, watch: Vec<PathBuf>, interval: u64) -> Result<u8> {
    if command.trim().is_empty() {
        bail!("No command given");
    }

    let current_dir = env::current_dir()?;
    let config = load_config(&current_dir)?;
    let shell = Shell::builder().config(&config).cwd(&current_dir).build();
    let watch: Vec<PathBuf> = watch.iter().map(|p| current_dir.join(p)).collect();
    let interval = Duration::from_millis(interval.max(50));

    if watch.is_empty() {
        eprintln!("{} Nothing to watch, running once", "⚠️".yellow());
        let result = start(&shell, &command).await?;
        return Ok((result.code & 0xff) as u8);
    }

    let mut snapshot = fingerprint(&watch);
    let mut runner = spawn(&shell, &command)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                stop(&runner).await;
                return Ok(130);
            }
            _ = tokio::time::sleep(interval) => {}
        }

        let current = fingerprint(&watch);
        if current == snapshot {
            continue;
        }
        snapshot = current;

        eprintln!("{} Change detected, restarting: {}", "🔄".cyan(), command);
        stop(&runner).await;
        runner = spawn(&shell, &command)?;
    }
}

fn options() -> RunOptions {
    RunOptions::default()
        .mirror(true)
        .capture(false)
        .reject(false)
        .stdin(StdinOption::Ignore)
}

async fn start(shell: &Shell, command: &str) -> Result<cmdflow::CommandResult> {
    Ok(shell.run_with(command, options()).await?)
}

fn spawn(shell: &Shell, command: &str) -> Result<ProcessRunner> {
    let runner = shell.run_with(command, options());
    runner.start()?;
    eprintln!("{} Running: {}", "🚀".green(), command);

    let watched = runner.clone();
    tokio::spawn(async move {
        let result = watched.wait().await;
        if result.code != 0 && result.code < 128 {
            eprintln!("{}", format!("[exit {}]", result.code).red());
        }
    });
    Ok(runner)
}

/// SIGTERM, then SIGKILL if anything is still alive after the grace period.
async fn stop(runner: &ProcessRunner) {
    runner.kill(Signal::Term);

    let drained = tokio::time::timeout(GRACE_PERIOD, async {
        while runner.has_live_children() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    if drained.is_err() {
        eprintln!("{} Still running after {:?}, sending SIGKILL", "⚠️".yellow(), GRACE_PERIOD);
        runner.kill(Signal::Kill);
    }
}

/// One hash per watched path; a missing file hashes as `None`.
fn fingerprint(paths: &[PathBuf]) -> Vec<Option<blake3::Hash>> {
    paths.iter().map(|p| hash_file(p)).collect()
}

fn hash_file(path: &Path) -> Option<blake3::Hash> {
    let content = fs::read(path).ok()?;
    let mut hasher = Hasher::new();
    hasher.update(&content);
    Some(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("watched.txt");
        let missing = dir.path().join("missing.txt");

        fs::write(&file, "one").unwrap();
        let first = fingerprint(&[file.clone(), missing.clone()]);
        assert!(first[0].is_some());
        assert!(first[1].is_none());

        assert_eq!(first, fingerprint(&[file.clone(), missing.clone()]));

        fs::write(&file, "two").unwrap();
        assert_ne!(first, fingerprint(&[file, missing]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_finishes_runner() {
        let shell = Shell::new();
        let runner = shell.run_with("sleep 30", RunOptions::quiet());
        runner.start().unwrap();
        stop(&runner).await;
        assert!(runner.is_finished());
        assert_eq!(runner.wait().await.code, 143);
    }
}
