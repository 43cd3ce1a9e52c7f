//! Plugin discovery and the capability-indexed `ExtensionSet` factory.
//!
//! Generalizes the simple process-wide plugin registry pattern into a
//! capability lookup: rather than a flat list of plugins, a [`PluginEngine`]
//! knows, for each loaded module, which named capabilities ("Intent-Handler",
//! "Sdk-Provider", ...) it declares, and can build a live [`ExtensionSet`] of
//! any one capability on demand.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::instrument;

use crate::errors::{FoundryError, Result};
use crate::service::{Addin, ExtensionSet};

/// A single capability a plugin module declares, e.g. `Intent-Handler=*` in
/// the original's `.plugin` manifest key-value syntax.
#[derive(Debug, Clone)]
pub struct Capability {
    pub interface: String,
    pub criterion: String,
}

/// Factory for instantiating one addin of some capability.
///
/// A factory returns `Arc<dyn Any + Send + Sync>` wrapping an `Arc<T>` for
/// whatever trait object type `T` the capability expects (e.g. `Arc<dyn
/// IntentHandler>`) — wrapping the already-unsized `Arc<T>` itself, rather
/// than the addin directly, is what lets [`PluginEngine::extension_set`]
/// downcast back to an arbitrary unsized `T` (`Any::downcast` requires a
/// `Sized` target, and `Arc<T>` is `Sized` regardless of whether `T` is).
pub type AddinFactory = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Helper for plugin authors: wrap a concrete addin as the `Arc<dyn Any +
/// Send + Sync>` an [`AddinFactory`] must return, coercing it to trait
/// object `T` first.
pub fn addin_factory_result<T: ?Sized + Send + Sync + 'static>(
    addin: Arc<T>,
) -> Arc<dyn Any + Send + Sync> {
    Arc::new(addin)
}

struct PluginModule {
    name: String,
    priority: i32,
    capabilities: Vec<Capability>,
    factories: HashMap<String, AddinFactory>,
}

/// The plugin engine: discovers and holds loaded modules, and builds
/// capability-scoped `ExtensionSet`s on demand.
///
/// A process normally has exactly one `PluginEngine`, held behind the
/// `Context`'s plugin service, but the type itself carries no global state —
/// unlike the original's static registry, every instance is independent,
/// which makes the engine trivially testable.
pub struct PluginEngine {
    modules: RwLock<Vec<PluginModule>>,
    unload_log: Mutex<Vec<String>>,
}

impl Default for PluginEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginEngine {
    pub fn new() -> Self {
        PluginEngine {
            modules: RwLock::new(Vec::new()),
            unload_log: Mutex::new(Vec::new()),
        }
    }

    /// Register a module with its declared capabilities and factories.
    /// Modules are kept in registration order; [`ExtensionSet`]s built from
    /// them are resorted by the addin's own priority regardless of load
    /// order.
    #[instrument(skip(self, factories), fields(module = %name, priority))]
    pub fn load_module(
        &self,
        name: impl Into<String>,
        priority: i32,
        capabilities: Vec<Capability>,
        factories: HashMap<String, AddinFactory>,
    ) {
        let name = name.into();
        tracing::info!(%name, priority, "loading plugin module");
        self.modules.write().expect("plugin lock poisoned").push(PluginModule {
            name,
            priority,
            capabilities,
            factories,
        });
    }

    #[instrument(skip(self))]
    pub fn unload_module(&self, name: &str) {
        let mut modules = self.modules.write().expect("plugin lock poisoned");
        modules.retain(|m| m.name != name);
        self.unload_log
            .lock()
            .expect("plugin lock poisoned")
            .push(name.to_string());
    }

    pub fn loaded_modules(&self) -> Vec<String> {
        self.modules
            .read()
            .expect("plugin lock poisoned")
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    /// Build a live `ExtensionSet<T>` of every addin across every loaded
    /// module whose capability matches `interface` under `criterion`
    /// (a `*` criterion matches every declared criterion for that
    /// interface, matching the original's glob semantics).
    pub fn extension_set<T>(&self, interface: &str, criterion: &str) -> Result<ExtensionSet<T>>
    where
        T: Addin + ?Sized + 'static,
    {
        let set = ExtensionSet::new();
        let modules = self.modules.read().expect("plugin lock poisoned");
        for module in modules.iter() {
            let matches = module.capabilities.iter().any(|c| {
                c.interface == interface && (c.criterion == "*" || c.criterion == criterion)
            });
            if !matches {
                continue;
            }
            if let Some(factory) = module.factories.get(interface) {
                let built = factory();
                let addin: Arc<Arc<T>> = built
                    .downcast::<Arc<T>>()
                    .map_err(|_| FoundryError::invalid_data("addin factory type mismatch"))?;
                set.insert(&module.name, (*addin).clone());
            }
        }
        let _ = criterion;
        Ok(set)
    }
}
