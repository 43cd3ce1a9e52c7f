//! The `Service` lifecycle contract and the `ExtensionSet` addin mechanism
//! that every service built on top of it uses to host pluggable behavior.

use std::any::Any;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use tracing::instrument;

use crate::context::Context;
use crate::errors::Result;

/// A long-lived subsystem owned by a [`Context`].
///
/// Services are constructed lazily on first use and torn down in the
/// reverse order they were constructed, mirroring the original's
/// `foundry_service_start`/`foundry_service_stop` contract. A `Service`
/// holds only a [`Weak`] back-reference to its owning `Context` so that the
/// `Context -> Service` ownership edge has no cycle.
#[async_trait]
pub trait Service: Any + Send + Sync {
    /// Human-readable name used in logs and `foundry settings`/diagnostic
    /// output.
    fn name(&self) -> &'static str;

    /// Called once, immediately after construction, before the service is
    /// handed to any caller.
    fn start(&self, _context: &Context) -> Result<()> {
        Ok(())
    }

    /// Called once during `Context::shutdown`, in reverse construction
    /// order.
    fn stop(&self) -> Result<()> {
        Ok(())
    }

    /// Resolves once `start` has run successfully.
    ///
    /// `Context::dup_service` runs `start` synchronously before handing back
    /// the constructed `Arc<T>`, so by the time any caller can reach a
    /// service at all, it is already started; the default here simply
    /// resolves immediately. A service whose startup continues
    /// asynchronously in the background (a socket that dials out, an index
    /// that warms up) should override this to track that instead.
    async fn when_ready(&self) -> Result<()> {
        Ok(())
    }
}

/// An addin hosted by a [`Service`] through an [`ExtensionSet`].
///
/// Addins are the plugin-supplied behavior: an `IntentHandler`, a
/// `DiagnosticProvider`, an `SdkProvider`. The only contract every addin
/// shares is a priority used to order the set and a human-readable id used
/// in logs.
pub trait Addin: Any + Send + Sync {
    fn id(&self) -> &str;

    /// Higher values run/are queried first. Defaults to 0, matching
    /// unprioritized plugins sorting after any that declare a priority.
    fn priority(&self) -> i32 {
        0
    }
}

struct Entry<T: ?Sized> {
    module: String,
    addin: Arc<T>,
}

/// An ordered, observable collection of addins of one capability type `T`,
/// kept sorted by `(priority desc, module name asc)` exactly as the
/// original's `FoundryExtensionSet` sorts its `GListModel` contents.
///
/// `ExtensionSet` implements the "list model" contract the original
/// describes (`items_changed`-style notification) with a small broadcast
/// channel rather than a full signal framework, since nothing else in this
/// crate needs general-purpose GObject-style signals.
pub struct ExtensionSet<T: ?Sized> {
    entries: Mutex<Vec<Entry<T>>>,
    changed_tx: tokio::sync::broadcast::Sender<()>,
}

impl<T: ?Sized + Addin> Default for ExtensionSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Addin> ExtensionSet<T> {
    pub fn new() -> Self {
        let (changed_tx, _) = tokio::sync::broadcast::channel(16);
        ExtensionSet {
            entries: Mutex::new(Vec::new()),
            changed_tx,
        }
    }

    /// Subscribe to add/remove notifications. Receivers that lag behind are
    /// simply informed they missed events (`RecvError::Lagged`); nothing in
    /// this crate treats that as fatal.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.changed_tx.subscribe()
    }

    #[instrument(skip(self, addin), fields(module = %module.as_ref()))]
    pub fn insert(&self, module: impl AsRef<str>, addin: Arc<T>) {
        let module = module.as_ref().to_string();
        let mut entries = self.entries.lock().expect("extension set lock poisoned");
        entries.push(Entry { module, addin });
        entries.sort_by(|a, b| {
            b.addin
                .priority()
                .cmp(&a.addin.priority())
                .then_with(|| a.module.cmp(&b.module))
        });
        drop(entries);
        let _ = self.changed_tx.send(());
    }

    pub fn remove_module(&self, module: &str) {
        let mut entries = self.entries.lock().expect("extension set lock poisoned");
        let before = entries.len();
        entries.retain(|e| e.module != module);
        let changed = entries.len() != before;
        drop(entries);
        if changed {
            let _ = self.changed_tx.send(());
        }
    }

    /// Snapshot the current, priority-ordered addins.
    ///
    /// Dispatch loops should call this once before iterating rather than
    /// hold the lock while invoking addin code, so a concurrent
    /// plugin-unload can't deadlock or race with a running dispatch.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries
            .lock()
            .expect("extension set lock poisoned")
            .iter()
            .map(|e| Arc::clone(&e.addin))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("extension set lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Base implementation shared by services that host a single `ExtensionSet`
/// of addins, generalizing the repeated
/// list-model-plus-weak-context-plus-extension-set pattern every concrete
/// service in the original otherwise duplicates by hand.
pub struct ServiceBase<A: Addin + ?Sized> {
    context: Weak<Context>,
    extensions: ExtensionSet<A>,
}

impl<A: Addin + ?Sized> ServiceBase<A> {
    pub fn new(context: &Arc<Context>) -> Self {
        ServiceBase {
            context: Arc::downgrade(context),
            extensions: ExtensionSet::new(),
        }
    }

    pub fn context(&self) -> Option<Arc<Context>> {
        self.context.upgrade()
    }

    pub fn extensions(&self) -> &ExtensionSet<A> {
        &self.extensions
    }
}
