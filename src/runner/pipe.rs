// Runner-to-runner pipes: `a.pipe(&b)` feeds a's stdout into b's stdin.
use super::{ProcessRunner, RunOptions, StdinOption, Work};
use crate::error::{Error, Result};
use crate::stream::ChunkKind;
use futures_util::StreamExt;

impl ProcessRunner {
    /// Connects this runner's stdout to `dest`'s stdin and returns a runner
    /// for the pair. Stderr of both sides, and dest's stdout, become the
    /// output of the returned runner; its code is dest's code (with
    /// `pipefail`, the source's non-zero code when dest succeeded).
    ///
    /// `dest` must not have started. Neither side mirrors on its own; the
    /// returned runner inherits dest's mirror, capture and reject options.
    pub fn pipe(&self, dest: &ProcessRunner) -> Result<ProcessRunner> {
        if self.id() == dest.id() {
            return Err(Error::SelfPipe);
        }

        let mut options = RunOptions::default();
        dest.configure(|o| {
            o.stdin = StdinOption::Pipe;
            options.mirror = std::mem::replace(&mut o.mirror, false);
            options.capture = o.capture;
            options.reject = o.reject;
        })?;
        match self.configure(|o| o.mirror = false) {
            // A source that is already running keeps whatever it mirrored so far.
            Ok(()) | Err(Error::AlreadyStarted) => {}
            Err(e) => return Err(e),
        }

        Ok(ProcessRunner::with_work(
            self.shell().clone(),
            Work::Pipe(vec![self.clone(), dest.clone()]),
            options,
        ))
    }
}

pub(crate) async fn drive(runner: ProcessRunner) {
    let (source, dest) = match &runner.inner.work {
        Work::Pipe(stages) if stages.len() == 2 => (stages[0].clone(), stages[1].clone()),
        _ => {
            runner.emit_error(&Error::Internal("malformed pipe".into()));
            runner.finish(1);
            return;
        }
    };

    let mut dest_out = dest.stream();
    let writer = dest.stdin();
    let mut source_out = source.stream();

    let forward = async {
        while let Some(chunk) = source_out.next().await {
            match chunk.kind {
                ChunkKind::Stderr => runner.dispatch(chunk).await,
                ChunkKind::Stdout => {
                    let Some(writer) = &writer else { continue };
                    if writer.write(chunk.data).await.is_err() {
                        // dest stopped reading; dropping the stream stops the source
                        log::debug!("pipe {}: reader closed", runner.id());
                        break;
                    }
                }
            }
        }
        if let Some(writer) = &writer {
            writer.close();
        }
        drop(source_out);
    };
    let collect = async {
        while let Some(chunk) = dest_out.next().await {
            runner.dispatch(chunk).await;
        }
    };

    tokio::select! {
        _ = async { tokio::join!(forward, collect) } => {}
        _ = runner.inner.cancel.cancelled() => return,
    }

    let source_result = source.wait().await;
    let dest_result = dest.wait().await;
    let pipefail = runner.state().settings.pipefail;

    let code = if pipefail && dest_result.code == 0 {
        source_result.code
    } else {
        dest_result.code
    };
    runner.finish(code);
}
