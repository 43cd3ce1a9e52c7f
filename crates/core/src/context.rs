//! The project-aware `Context` every other subsystem hangs off of.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::instrument;

use crate::errors::{FoundryError, Result};
use crate::service::Service;

/// The marker file the original looks for to identify a project root.
const MARKER: &str = ".foundry";

bitflags::bitflags! {
    /// Flags controlling how a [`Context`] is created, mirroring the
    /// original's `FoundryContextFlags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CreateFlags: u32 {
        /// Do not search parent directories for a `.foundry` marker; treat
        /// the given directory as the project root outright.
        const NO_DISCOVERY = 1 << 0;
        /// Create the `.foundry` marker directory if it does not exist.
        const CREATE_MARKER = 1 << 1;
    }
}

type ServiceSlot = Mutex<Option<Arc<dyn Any + Send + Sync>>>;

struct ServiceRegistry {
    slots: Mutex<HashMap<TypeId, Arc<ServiceSlot>>>,
    /// Every constructed service, in construction order, as a trait object
    /// `shutdown` can call `stop` through. Kept separately from `slots`
    /// because `slots` only knows `Any`, with no way back to `&dyn Service`.
    constructed: Mutex<Vec<Arc<dyn Service>>>,
}

impl ServiceRegistry {
    fn new() -> Self {
        ServiceRegistry {
            slots: Mutex::new(HashMap::new()),
            constructed: Mutex::new(Vec::new()),
        }
    }
}

/// A project-aware context: the root object every `Service` and subsystem in
/// this crate is ultimately reached through.
///
/// Built-in services are constructed lazily and cached behind a one-shot
/// slot the first time they're requested via [`Context::dup_service`];
/// `shutdown` tears every constructed service down in the reverse of its
/// construction order, matching the original's stated teardown contract.
pub struct Context {
    project_directory: PathBuf,
    registry: ServiceRegistry,
    shutdown: AtomicBool,
    inhibitors: AtomicU32,
}

impl Context {
    /// Construct a `Context` rooted at `project_directory` directly, with no
    /// parent-directory discovery.
    pub fn new(project_directory: impl Into<PathBuf>, _flags: CreateFlags) -> Arc<Context> {
        Arc::new(Context {
            project_directory: project_directory.into(),
            registry: ServiceRegistry::new(),
            shutdown: AtomicBool::new(false),
            inhibitors: AtomicU32::new(0),
        })
    }

    /// Walk `start` and its ancestors looking for a `.foundry` marker
    /// directory, returning a `Context` rooted at the directory that
    /// contains it. Falls back to treating `start` itself as the project
    /// root if no marker is found anywhere above it, matching the
    /// original's graceful "no marker found" behavior rather than erroring.
    #[instrument]
    pub fn discover(start: &Path, flags: CreateFlags) -> Result<Arc<Context>> {
        if flags.contains(CreateFlags::NO_DISCOVERY) {
            return Ok(Context::new(start, flags));
        }

        let mut cur = Some(start);
        while let Some(dir) = cur {
            if dir.join(MARKER).is_dir() {
                return Ok(Context::new(dir, flags));
            }
            cur = dir.parent();
        }

        if flags.contains(CreateFlags::CREATE_MARKER) {
            std::fs::create_dir_all(start.join(MARKER))?;
        }

        Ok(Context::new(start, flags))
    }

    pub fn project_directory(&self) -> &Path {
        &self.project_directory
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Return the already-constructed service of type `T`, lazily
    /// constructing it via `ctor` on first access. Subsequent calls return
    /// the same `Arc` regardless of `ctor`.
    ///
    /// `start` is called on the newly-constructed service, synchronously,
    /// before it is handed back — matching the original's "start before any
    /// caller can observe the service" ordering — and the service is
    /// recorded so `shutdown` can later call `stop` on it.
    pub fn dup_service<T, F>(self: &Arc<Self>, ctor: F) -> Result<Arc<T>>
    where
        T: Service + 'static,
        F: FnOnce(&Arc<Context>) -> Result<T>,
    {
        if self.is_shutdown() {
            return Err(FoundryError::InShutdown);
        }

        let type_id = TypeId::of::<T>();
        let slot = {
            let mut slots = self.registry.slots.lock().expect("context lock poisoned");
            Arc::clone(
                slots
                    .entry(type_id)
                    .or_insert_with(|| Arc::new(Mutex::new(None))),
            )
        };

        {
            let guard = slot.lock().expect("service slot poisoned");
            if let Some(existing) = guard.as_ref() {
                return existing
                    .clone()
                    .downcast::<T>()
                    .map_err(|_| FoundryError::invalid_data("service type mismatch"));
            }
        }

        let constructed = Arc::new(ctor(self)?);
        constructed.start(self)?;

        let mut guard = slot.lock().expect("service slot poisoned");
        if guard.is_none() {
            *guard = Some(constructed.clone() as Arc<dyn Any + Send + Sync>);
            self.registry
                .constructed
                .lock()
                .expect("context lock poisoned")
                .push(constructed.clone() as Arc<dyn Service>);
        }
        Ok(constructed)
    }

    /// Acquire an inhibitor preventing `shutdown` from proceeding while the
    /// returned guard is alive.
    ///
    /// The original requires callers to release an inhibitor manually on
    /// every exit path; here it's released automatically when
    /// [`InhibitorGuard`] drops, which is the idiomatic Rust replacement for
    /// that manual discipline.
    pub fn inhibit(self: &Arc<Self>) -> InhibitorGuard {
        self.inhibitors.fetch_add(1, Ordering::AcqRel);
        InhibitorGuard {
            context: Arc::clone(self),
        }
    }

    /// Stop every constructed service in the reverse order it was
    /// constructed, then mark the context as shut down so no further
    /// services may be constructed.
    ///
    /// A service that fails to stop is logged, not propagated: one
    /// misbehaving service should not prevent the rest of the context from
    /// tearing down.
    #[instrument(skip(self))]
    pub async fn shutdown(self: &Arc<Self>) -> Result<()> {
        while self.inhibitors.load(Ordering::Acquire) > 0 {
            tokio::task::yield_now().await;
        }

        let services = self
            .registry
            .constructed
            .lock()
            .expect("context lock poisoned")
            .clone();
        for service in services.iter().rev() {
            if let Err(e) = service.stop() {
                tracing::warn!(service = service.name(), error = %e, "service failed to stop");
            }
        }

        self.shutdown.store(true, Ordering::Release);
        Ok(())
    }
}

/// RAII guard returned by [`Context::inhibit`]; releases the inhibitor on
/// drop.
pub struct InhibitorGuard {
    context: Arc<Context>,
}

impl Drop for InhibitorGuard {
    fn drop(&mut self) {
        self.context.inhibitors.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_finds_marker_in_ancestor() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(MARKER)).unwrap();
        let nested = tmp.path().join("src").join("nested");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = Context::discover(&nested, CreateFlags::empty()).unwrap();
        assert_eq!(ctx.project_directory(), tmp.path());
    }

    #[test]
    fn discover_without_marker_falls_back_to_start() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context::discover(tmp.path(), CreateFlags::NO_DISCOVERY).unwrap();
        assert_eq!(ctx.project_directory(), tmp.path());
    }

    struct Counter(u32);

    impl Service for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }
    }

    #[test]
    fn dup_service_constructs_once() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context::new(tmp.path(), CreateFlags::empty());
        let calls = Arc::new(AtomicU32::new(0));

        let calls2 = Arc::clone(&calls);
        let first = ctx
            .dup_service(move |_| {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(Counter(1))
            })
            .unwrap();
        let calls3 = Arc::clone(&calls);
        let second = ctx
            .dup_service(move |_| {
                calls3.fetch_add(1, Ordering::SeqCst);
                Ok(Counter(2))
            })
            .unwrap();

        assert_eq!(first.0, second.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_waits_for_inhibitors() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context::new(tmp.path(), CreateFlags::empty());
        let guard = ctx.inhibit();
        let ctx2 = Arc::clone(&ctx);
        let handle = tokio::spawn(async move { ctx2.shutdown().await });
        tokio::task::yield_now().await;
        assert!(!ctx.is_shutdown());
        drop(guard);
        handle.await.unwrap().unwrap();
        assert!(ctx.is_shutdown());
    }

    struct Tracked {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Service for Tracked {
        fn name(&self) -> &'static str {
            self.name
        }

        fn start(&self, _context: &Context) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    #[tokio::test]
    async fn shutdown_stops_services_in_reverse_construction_order() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context::new(tmp.path(), CreateFlags::empty());
        let log = Arc::new(Mutex::new(Vec::new()));

        let log1 = Arc::clone(&log);
        ctx.dup_service::<Tracked, _>(move |_| {
            Ok(Tracked { name: "first", log: log1 })
        })
        .unwrap();

        // `dup_service` keys by the concrete constructed type, so a second,
        // distinct service type is needed to observe construction order.
        struct OtherTracked(Tracked);
        impl Service for OtherTracked {
            fn name(&self) -> &'static str {
                self.0.name
            }
            fn start(&self, context: &Context) -> Result<()> {
                self.0.start(context)
            }
            fn stop(&self) -> Result<()> {
                self.0.stop()
            }
        }

        let log2 = Arc::clone(&log);
        ctx.dup_service::<OtherTracked, _>(move |_| {
            Ok(OtherTracked(Tracked { name: "second", log: log2 }))
        })
        .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);

        ctx.shutdown().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "second", "first"]);
    }
}
