//! `Operation`: a cancellable, observable long-running task with a
//! title/subtitle/progress fraction, the building block CLI commands use to
//! report progress for anything that takes more than an eyeblink.

use std::sync::Mutex as StdMutex;

use tokio::sync::watch;
use tracing::instrument;

use crate::errors::Result;
use crate::scheduler::Cancellable;

/// A snapshot of an [`Operation`]'s displayable state.
#[derive(Debug, Clone, Default)]
pub struct OperationState {
    pub title: String,
    pub subtitle: String,
    /// `0.0..=1.0`, or `None` for indeterminate progress.
    pub fraction: Option<f64>,
    pub completed: bool,
}

/// A cancellable unit of progress-reporting work.
///
/// `Operation` pairs a [`Cancellable`] (for the caller to stop the work)
/// with a `watch` channel of [`OperationState`] (for the caller to observe
/// it), matching the original's combination of a cancellable GObject
/// property bag plus a completion future.
pub struct Operation {
    state_tx: watch::Sender<OperationState>,
    cancellable: Cancellable,
    inner: StdMutex<OperationState>,
}

impl Operation {
    pub fn new(title: impl Into<String>) -> Self {
        let initial = OperationState {
            title: title.into(),
            subtitle: String::new(),
            fraction: None,
            completed: false,
        };
        let (state_tx, _) = watch::channel(initial.clone());
        Operation {
            state_tx,
            cancellable: Cancellable::new(),
            inner: StdMutex::new(initial),
        }
    }

    pub fn cancellable(&self) -> Cancellable {
        self.cancellable.clone()
    }

    pub fn cancel(&self) {
        self.cancellable.cancel();
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.state_tx.subscribe()
    }

    #[instrument(skip(self))]
    pub fn set_subtitle(&self, subtitle: impl Into<String>) {
        self.update(|s| s.subtitle = subtitle.into());
    }

    pub fn set_fraction(&self, fraction: f64) {
        self.update(|s| s.fraction = Some(fraction.clamp(0.0, 1.0)));
    }

    pub fn complete(&self) {
        self.update(|s| {
            s.completed = true;
            s.fraction = Some(1.0);
        });
    }

    fn update(&self, f: impl FnOnce(&mut OperationState)) {
        let mut guard = self.inner.lock().expect("operation lock poisoned");
        f(&mut guard);
        let _ = self.state_tx.send(guard.clone());
    }

    pub fn snapshot(&self) -> OperationState {
        self.inner.lock().expect("operation lock poisoned").clone()
    }

    /// Await completion, resolving early with `Err(Cancelled)` if
    /// `cancel()`/the shared `Cancellable` fires first.
    pub async fn await_completion(&self) -> Result<()> {
        let mut rx = self.subscribe();
        loop {
            if rx.borrow().completed {
                return Ok(());
            }
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                res = self.cancellable.clone() => return res,
            }
        }
    }
}
