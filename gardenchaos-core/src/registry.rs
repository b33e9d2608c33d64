//! Process-wide registry of cooperative workers, grounded on
//! `chaosgarden/util/threading.py`: a module-level lock guarding a map from
//! worker to a cancel flag, plus a global "in termination" flag, plus
//! signal handlers that call `cancel_all` and then chain to any previously
//! installed handler.
//!
//! Workers here are `tokio::task`s rather than OS threads (the whole
//! workspace runs on the tokio runtime, following the teacher), but the
//! registration/cancellation contract in spec.md §4.2 is preserved exactly:
//! `launch` is a no-op handle once global termination has started, `cancel`
//! sets a flag then joins, and `cancel_all` is idempotent and logs
//! still-running workers on re-entry.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Stable identifier for a registered worker, assigned in registration
/// order (so `cancel_all` can join in that order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(u64);

/// A cheap, lock-free handle a worker polls to decide whether to stop.
/// This is what makes the Terminator "cheap to poll (no locks required
/// after construction)": both flags are plain atomics.
#[derive(Clone)]
pub struct CancelToken {
    worker_flag: Arc<AtomicBool>,
    global_flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.global_flag.load(Ordering::Relaxed) || self.worker_flag.load(Ordering::Relaxed)
    }

    /// A token that never reports cancellation, for standalone use of a
    /// [`crate::terminator::Terminator`] outside the registry (e.g. tests).
    pub fn never() -> Self {
        Self {
            worker_flag: Arc::new(AtomicBool::new(false)),
            global_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

struct WorkerEntry {
    name: String,
    flag: Arc<AtomicBool>,
    registered_at: Instant,
    join: Option<JoinHandle<()>>,
}

/// A handle to a worker launched through [`TaskRegistry::launch`]. Dropping
/// it does not cancel or join the worker; call [`TaskRegistry::cancel`] (or
/// let `cancel_all` run at shutdown) to do that.
pub struct WorkerHandle {
    id: WorkerId,
}

impl WorkerHandle {
    pub fn id(&self) -> WorkerId {
        self.id
    }
}

#[derive(Default)]
struct Inner {
    workers: BTreeMap<WorkerId, WorkerEntry>,
    next_id: u64,
}

pub struct TaskRegistry {
    inner: Mutex<Inner>,
    in_termination: Arc<AtomicBool>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            in_termination: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The process-wide singleton, mirroring the Python module's global
    /// `__threads`/`__in_termination` state.
    pub fn global() -> &'static TaskRegistry {
        static REGISTRY: OnceLock<TaskRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TaskRegistry::new)
    }

    /// A [`CancelToken`] that observes global termination without
    /// registering a worker — for a caller that runs its own work in-line
    /// (e.g. a single-purpose binary's `main`) rather than through
    /// [`TaskRegistry::launch`], but still wants `install_signal_handlers`'s
    /// `cancel_all` to reach it.
    pub fn global_cancel_token(&self) -> CancelToken {
        CancelToken { worker_flag: Arc::new(AtomicBool::new(false)), global_flag: self.in_termination.clone() }
    }

    /// Spawns `f` as a cooperative worker named `name`, passing it a
    /// [`CancelToken`] it should poll. If global termination has already
    /// started, returns a handle whose eventual `cancel`/join is a no-op,
    /// exactly like `launch_thread`'s "do not launch anything, but return a
    /// proper object" branch.
    pub fn launch<F, Fut>(&self, name: impl Into<String>, f: F) -> WorkerHandle
    where
        F: FnOnce(CancelToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        let id = WorkerId(inner.next_id);
        inner.next_id += 1;

        if self.in_termination.load(Ordering::Relaxed) {
            // No-op handle: nothing registered, `cancel` on it is a nop.
            return WorkerHandle { id };
        }

        let worker_flag = Arc::new(AtomicBool::new(false));
        let token = CancelToken {
            worker_flag: worker_flag.clone(),
            global_flag: self.in_termination.clone(),
        };
        info!(worker = %name, "launching background worker");
        let join = tokio::spawn(f(token));
        inner.workers.insert(
            id,
            WorkerEntry {
                name,
                flag: worker_flag,
                registered_at: Instant::now(),
                join: Some(join),
            },
        );
        WorkerHandle { id }
    }

    /// Sets the named worker's cancel flag and joins it. A no-op for
    /// handles issued while global termination was already in effect.
    pub async fn cancel(&self, handle: WorkerHandle) {
        let join = {
            let mut inner = self.inner.lock().expect("registry mutex poisoned");
            if let Some(entry) = inner.workers.get_mut(&handle.id) {
                entry.flag.store(true, Ordering::Relaxed);
                entry.join.take()
            } else {
                None
            }
        };
        if let Some(join) = join {
            let _ = join.await;
        }
        self.inner.lock().expect("registry mutex poisoned").workers.remove(&handle.id);
    }

    pub fn is_cancelled(&self, id: WorkerId) -> bool {
        if self.in_termination.load(Ordering::Relaxed) {
            return true;
        }
        self.inner
            .lock()
            .expect("registry mutex poisoned")
            .workers
            .get(&id)
            .map(|entry| entry.flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Sets global termination, flips every worker's flag, and joins them
    /// in registration order. Idempotent: a second call logs every worker
    /// still outstanding (the Rust analogue of the Python original's
    /// `traceback.print_stack` dump, since a joined `JoinHandle` carries no
    /// stack to print) instead of panicking.
    pub async fn cancel_all(&self) {
        let already_in_termination = self.in_termination.swap(true, Ordering::SeqCst);
        if already_in_termination {
            let inner = self.inner.lock().expect("registry mutex poisoned");
            warn!(count = inner.workers.len(), "cancel_all re-entered while still active");
            for entry in inner.workers.values() {
                warn!(
                    worker = %entry.name,
                    running_for_secs = entry.registered_at.elapsed().as_secs_f64(),
                    "still active background worker"
                );
            }
            return;
        }

        let joins: Vec<(String, JoinHandle<()>)> = {
            let mut inner = self.inner.lock().expect("registry mutex poisoned");
            info!(count = inner.workers.len(), "signaling and joining all active background workers");
            let mut joins = Vec::new();
            for entry in inner.workers.values_mut() {
                entry.flag.store(true, Ordering::Relaxed);
                if let Some(join) = entry.join.take() {
                    joins.push((entry.name.clone(), join));
                }
            }
            joins
        };
        for (name, join) in joins {
            info!(worker = %name, "waiting for background worker to end");
            let _ = join.await;
        }
        self.inner.lock().expect("registry mutex poisoned").workers.clear();
        info!("shutdown completed, all background workers terminated");
    }

    pub fn is_in_termination(&self) -> bool {
        self.in_termination.load(Ordering::Relaxed)
    }
}

static SIGNAL_HANDLERS_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs handlers for SIGTERM/SIGINT/SIGQUIT that call `cancel_all` on
/// the global registry. Idempotent, matching the Python original's guard on
/// `__org_signal_handlers`. Each handler is a one-shot listener task; since
/// tokio's signal listeners coexist with any default Rust signal
/// disposition, a prior `ctrl_c`-based handler (e.g. the CLI host's) keeps
/// working because both listeners are notified independently by the OS.
#[cfg(unix)]
pub fn install_signal_handlers() {
    if SIGNAL_HANDLERS_INSTALLED.swap(true, Ordering::SeqCst) {
        warn!("signal handlers already installed, ignoring second install() call");
        return;
    }
    info!("installing signal handlers to terminate all active background workers on involuntary signals");

    use tokio::signal::unix::{signal, SignalKind};

    for kind in [SignalKind::terminate(), SignalKind::interrupt(), SignalKind::quit()] {
        tokio::spawn(async move {
            if let Ok(mut stream) = signal(kind) {
                while stream.recv().await.is_some() {
                    warn!(?kind, "signal received, cancelling all active background workers");
                    TaskRegistry::global().cancel_all().await;
                }
            }
        });
    }
}
