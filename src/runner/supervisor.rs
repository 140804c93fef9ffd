//! Bookkeeping of every running runner plus the one interrupt subscription
//! they share.
//!
//! The hook is installed when the first runner registers and dropped when the
//! last one leaves, so CTRL-C reaches every in-flight command without one OS
//! handler per command.

use crate::runner::{ProcessRunner, RunnerInner, Signal};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::task::JoinHandle;

pub type InterruptHandler = Arc<dyn Fn() + Send + Sync>;

/// Whatever delivers interrupts. Dropping the returned guard uninstalls the
/// hook.
pub trait InterruptSource: Send + Sync {
    fn install(&self, handler: InterruptHandler) -> Box<dyn Send>;
}

/// SIGINT / CTRL-C through `tokio::signal`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CtrlC;

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl InterruptSource for CtrlC {
    fn install(&self, handler: InterruptHandler) -> Box<dyn Send> {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(async move {
                    while tokio::signal::ctrl_c().await.is_ok() {
                        handler();
                    }
                });
                Box::new(AbortOnDrop(task))
            }
            Err(_) => {
                log::warn!("no tokio runtime, CTRL-C will not be forwarded to commands");
                Box::new(())
            }
        }
    }
}

#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    source: Box<dyn InterruptSource>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    active: HashMap<u64, Weak<RunnerInner>>,
    hook: Option<Box<dyn Send>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::with_source(CtrlC)
    }

    pub fn with_source(source: impl InterruptSource + 'static) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                source: Box::new(source),
                state: Mutex::new(State::default()),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a runner. Installs the interrupt hook for the first one.
    /// Returns false if it was already tracked.
    pub fn register(&self, runner: &ProcessRunner) -> bool {
        let mut state = self.state();
        if state.active.contains_key(&runner.id()) {
            return false;
        }
        state.active.insert(runner.id(), Arc::downgrade(&runner.inner));

        if state.hook.is_none() {
            let weak = Arc::downgrade(&self.inner);
            let handler: InterruptHandler = Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Supervisor { inner }.interrupt();
                }
            });
            state.hook = Some(self.inner.source.install(handler));
            log::debug!("interrupt handler installed");
        }
        true
    }

    /// Removes a runner. Uninstalls the hook once nothing is left.
    pub fn unregister(&self, runner: &ProcessRunner) -> bool {
        self.unregister_id(runner.id())
    }

    pub(crate) fn unregister_id(&self, id: u64) -> bool {
        let hook = {
            let mut state = self.state();
            if state.active.remove(&id).is_none() {
                return false;
            }
            if state.active.is_empty() {
                state.hook.take()
            } else {
                None
            }
        };
        if hook.is_some() {
            drop(hook);
            log::debug!("interrupt handler removed");
        }
        true
    }

    pub fn active_count(&self) -> usize {
        self.state().active.len()
    }

    /// 1 while any runner is active, else 0.
    pub fn handler_count(&self) -> usize {
        usize::from(self.state().hook.is_some())
    }

    /// Kills every tracked runner with SIGINT. Returns how many were hit.
    pub fn interrupt(&self) -> usize {
        let runners: Vec<ProcessRunner> = self
            .state()
            .active
            .values()
            .filter_map(Weak::upgrade)
            .map(|inner| ProcessRunner { inner })
            .collect();
        for runner in &runners {
            runner.kill(Signal::Int);
        }
        runners.len()
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("active", &self.active_count())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Interrupt source that counts installs and lets tests fire the handler.
    #[derive(Clone, Default)]
    pub struct FakeInterrupts {
        pub installs: Arc<AtomicUsize>,
        pub live: Arc<AtomicUsize>,
        handler: Arc<Mutex<Option<InterruptHandler>>>,
    }

    struct LiveGuard(Arc<AtomicUsize>);

    impl Drop for LiveGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl FakeInterrupts {
        pub fn fire(&self) {
            let handler = self.handler.lock().unwrap().clone();
            if let Some(handler) = handler {
                handler();
            }
        }

        pub fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }
    }

    impl InterruptSource for FakeInterrupts {
        fn install(&self, handler: InterruptHandler) -> Box<dyn Send> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            self.live.fetch_add(1, Ordering::SeqCst);
            *self.handler.lock().unwrap() = Some(handler);
            Box::new(LiveGuard(self.live.clone()))
        }
    }
}
